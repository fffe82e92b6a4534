/// Invocation error taxonomy
///
/// Every failure a descriptor can produce is reported through the asynchronous
/// outcome of that descriptor's invocation. Nothing in this crate throws
/// synchronously into the caller: a malformed reference or a missing module is
/// a rejected outcome for that one descriptor, never a process-fatal panic.

use thiserror::Error;

/// Result type for handler resolution and invocation
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Errors produced while resolving or invoking a handler
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Handler reference string lacks a `<path>.<symbol>` shape
    #[error("expected handler reference to include both a module path and a function name separated by '.', got '{handler}'")]
    MalformedHandlerReference { handler: String },

    /// Handler module could not be read or evaluated
    #[error("cannot load handler module '{path}': {source}")]
    ModuleLoadFailure {
        path: String,
        #[source]
        source: mlua::Error,
    },

    /// Handler module loaded but does not export the named function
    #[error("handler module '{path}' has no exported function '{symbol}'")]
    MissingExport { path: String, symbol: String },

    /// Handler signalled failure: callback invoked with a non-nil error, a
    /// returned coroutine raised, or the handler call itself raised
    #[error("handler failed: {0}")]
    HandlerFailure(serde_json::Value),

    /// Fault inside the script engine itself while wiring up an invocation
    #[error("script engine failure: {0}")]
    ScriptEngine(#[source] mlua::Error),
}
