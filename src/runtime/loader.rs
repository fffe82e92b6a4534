/// Handler module loading
///
/// Resolves a script path to a freshly evaluated Lua module and extracts the
/// named export as the invocable unit. Loading is deliberately cache-free:
/// every load evaluates the file in a brand-new Lua state, so handlers edited
/// on disk are picked up on their next invocation in a long-lived process.

use mlua::{Lua, Table, Value as LuaValue};
use std::path::{Path, PathBuf};

use crate::errors::{InvokeError, InvokeResult};

/// A freshly loaded handler: the Lua state that owns it plus the exported
/// entry function
///
/// The state must outlive the entry function, so the two travel together.
#[derive(Debug)]
pub struct LoadedHandler {
    /// Lua state the module was evaluated in
    pub lua: Lua,
    /// The exported handler function
    pub entry: mlua::Function,
}

/// Pluggable resolution of a module path + symbol into a callable handler
///
/// The shipped implementation is [`ScriptLoader`]; swapping this trait out
/// swaps the module system (embedded sources, alternate extensions, ...).
pub trait HandlerLoader {
    /// Load the module at `path` fresh and extract the export named `symbol`
    fn load(&self, path: &Path, symbol: &str) -> InvokeResult<LoadedHandler>;
}

/// Filesystem-backed loader for Lua script modules
///
/// A handler module is a Lua chunk that returns a table of functions:
///
/// ```lua
/// return {
///   run = function(event, context, callback)
///     callback(nil, { ok = true })
///   end,
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    /// Extension appended to module paths (default: "lua")
    pub extension: String,
}

impl ScriptLoader {
    /// Create a loader for modules with the given extension
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl Default for ScriptLoader {
    /// Default loader with ENV_VAR support for the module extension
    fn default() -> Self {
        Self {
            extension: std::env::var("FUNCWAY_HANDLER_EXT").unwrap_or_else(|_| "lua".to_string()),
        }
    }
}

impl ScriptLoader {
    /// Append the configured extension without touching dots already in the
    /// path (hidden-directory segments, versioned file names)
    fn script_path(&self, path: &Path) -> PathBuf {
        let mut resolved = path.as_os_str().to_os_string();
        resolved.push(".");
        resolved.push(&self.extension);
        PathBuf::from(resolved)
    }
}

impl HandlerLoader for ScriptLoader {
    fn load(&self, path: &Path, symbol: &str) -> InvokeResult<LoadedHandler> {
        let script_path = self.script_path(path);
        let shown_path = script_path.display().to_string();

        tracing::debug!("📦 Loading handler module: {}", shown_path);

        let source =
            std::fs::read_to_string(&script_path).map_err(|e| InvokeError::ModuleLoadFailure {
                path: shown_path.clone(),
                source: mlua::Error::external(e),
            })?;

        // Fresh state per load: nothing survives from a previous invocation,
        // and edits to the file are visible on the next one.
        let lua = Lua::new();
        let exports: Table = lua
            .load(&source)
            .set_name(shown_path.clone())
            .eval()
            .map_err(|e| InvokeError::ModuleLoadFailure {
                path: shown_path.clone(),
                source: e,
            })?;

        let entry: LuaValue = exports
            .get(symbol)
            .map_err(InvokeError::ScriptEngine)?;

        match entry {
            LuaValue::Function(function) => {
                tracing::debug!("🔎 Resolved export '{}' in {}", symbol, shown_path);
                Ok(LoadedHandler {
                    lua,
                    entry: function,
                })
            }
            _ => Err(InvokeError::MissingExport {
                path: shown_path,
                symbol: symbol.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_module(dir: &Path, name: &str, source: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(source.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_extracts_named_export() {
        let dir = tempfile::tempdir().unwrap();
        write_module(
            dir.path(),
            "job.lua",
            "return { run = function(x) return x + 1 end, other = 5 }",
        );

        let loader = ScriptLoader::new("lua");
        let loaded = loader.load(&dir.path().join("job"), "run").unwrap();
        let result: i64 = loaded.entry.call(41).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn test_missing_file_is_module_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ScriptLoader::new("lua");
        let err = loader.load(&dir.path().join("ghost"), "run").unwrap_err();
        assert!(matches!(err, InvokeError::ModuleLoadFailure { .. }));
    }

    #[test]
    fn test_absent_export_is_missing_export() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "job.lua", "return { other = 5 }");

        let loader = ScriptLoader::new("lua");
        let err = loader.load(&dir.path().join("job"), "run").unwrap_err();
        match err {
            InvokeError::MissingExport { symbol, .. } => assert_eq!(symbol, "run"),
            other => panic!("expected MissingExport, got {other:?}"),
        }
    }

    #[test]
    fn test_non_function_export_is_missing_export() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "job.lua", "return { run = 42 }");

        let loader = ScriptLoader::new("lua");
        let err = loader.load(&dir.path().join("job"), "run").unwrap_err();
        assert!(matches!(err, InvokeError::MissingExport { .. }));
    }

    #[test]
    fn test_chunk_that_raises_is_module_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "job.lua", "error('broken at load time')");

        let loader = ScriptLoader::new("lua");
        let err = loader.load(&dir.path().join("job"), "run").unwrap_err();
        assert!(matches!(err, InvokeError::ModuleLoadFailure { .. }));
    }

    #[test]
    fn test_extension_is_appended_not_substituted() {
        let loader = ScriptLoader::new("lua");
        let resolved = loader.script_path(Path::new("dir/file.v2"));
        assert_eq!(resolved, PathBuf::from("dir/file.v2.lua"));
    }
}
