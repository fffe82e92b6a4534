/// Core function descriptor type definitions
///
/// Defines the declarative shape of an invocable function: its name, a
/// composite handler reference pointing into a script module on disk, and the
/// environment overrides applied for the duration of one invocation. These
/// types are serialized/deserialized from JSON by external manifest loaders.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::errors::{InvokeError, InvokeResult};

/// A declarative description of one invocable function
///
/// Descriptors are supplied per batch invocation and never retained by the
/// engine. `handler` is a composite reference like `"jobs/cleanup.run"`:
/// everything up to the final `.` is a script path relative to the base
/// directory, the trailing identifier names the exported function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Function name (e.g., "billing-service-dev-cleanup")
    pub name: String,
    /// Composite handler reference (e.g., "jobs/cleanup.run")
    pub handler: String,
    /// Environment variable overrides active only during this descriptor's
    /// invocation; overrides win over the ambient value on key collision
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl FunctionDescriptor {
    /// Create a descriptor with no environment overrides
    pub fn new(name: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: handler.into(),
            environment: HashMap::new(),
        }
    }

    /// Final `-`-separated segment of the function name, used for concise
    /// success logging (e.g., "billing-service-dev-cleanup" → "cleanup")
    pub fn short_name(&self) -> &str {
        self.name.rsplit('-').next().unwrap_or(&self.name)
    }
}

/// A parsed handler reference: module path plus exported symbol
///
/// Derived from [`FunctionDescriptor::handler`] and only alive while a
/// handler is being constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    /// Script module path relative to the batch base directory, without
    /// extension (e.g., "jobs/cleanup")
    pub module_path: String,
    /// Name of the exported function inside the module (e.g., "run")
    pub symbol: String,
}

fn handler_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Greedy match: everything up to the last '.' that is followed by a word
    // is the path, so hidden-directory segments like "sub.hidden/" stay part
    // of the path.
    PATTERN.get_or_init(|| Regex::new(r"(.*)\.(\w+)").expect("handler pattern is valid"))
}

impl HandlerRef {
    /// Split a composite reference into module path and symbol
    ///
    /// Input: `"some/path/maybe/.hidden/dir/file.someFunction"`
    /// Output: `module_path = "some/path/maybe/.hidden/dir/file"`,
    /// `symbol = "someFunction"`.
    ///
    /// A string with no `.` followed by a valid identifier fails with
    /// [`InvokeError::MalformedHandlerReference`]; the engine reports that
    /// through the descriptor's asynchronous outcome, never as a panic.
    pub fn parse(handler: &str) -> InvokeResult<Self> {
        let captures = handler_pattern().captures(handler).ok_or_else(|| {
            InvokeError::MalformedHandlerReference {
                handler: handler.to_string(),
            }
        })?;

        Ok(Self {
            module_path: captures[1].to_string(),
            symbol: captures[2].to_string(),
        })
    }
}

/// Per-invocation context handed to the handler as its second argument
///
/// Exposed to the Lua handler as a plain table: `id`, `name`, `started_at`,
/// and `env` (the merged environment view for this invocation, so a handler
/// can read its overrides without consulting process globals).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Invocation ID
    pub id: Uuid,
    /// Name of the function being invoked
    pub name: String,
    /// Invocation start timestamp
    pub started_at: DateTime<Utc>,
    /// Merged environment view (ambient snapshot + descriptor overrides)
    pub env: HashMap<String, String>,
}

impl InvocationContext {
    /// Mint a fresh context for one invocation of the named function
    pub fn new(name: &str, env: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            started_at: Utc::now(),
            env,
        }
    }
}
