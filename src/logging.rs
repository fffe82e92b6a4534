/// Logging setup for the funcway engine using tracing + tracing-subscriber
///
/// Level selection comes from the `FUNCWAY_LOG` environment variable
/// ("error", "warn", "info", "debug", "trace"), defaulting to `info`.

/// Initialise the global logging subscriber
///
/// Safe to call once at startup; calling it twice panics, so embedding
/// binaries that install their own subscriber should skip it.
pub fn init_logging() {
    let level = std::env::var("FUNCWAY_LOG")
        .ok()
        .and_then(|value| parse_level_str(&value))
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

fn parse_level_str(value: &str) -> Option<tracing::Level> {
    match value.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(parse_level_str("debug"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level_str("WARNING"), Some(tracing::Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }
}
