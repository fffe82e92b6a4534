/// Funcway: Hyperminimalist scheduled-function invocation engine
///
/// This library resolves declarative function descriptors into callable Lua
/// handlers, invokes them against a batch of trigger events, and normalizes
/// callback-style and coroutine-style completion into one awaitable outcome.
/// Descriptor discovery, trigger scheduling, and process startup belong to
/// the embedding application.

// Invocation error taxonomy
pub mod errors;

// Function description layer - descriptors, references, invocation context
pub mod function;

// Logging setup
pub mod logging;

// Runtime execution engine - loading, environment overlay, invocation, batching
pub mod runtime;

// Re-export commonly used types for external consumers
pub use errors::{InvokeError, InvokeResult};
pub use function::{FunctionDescriptor, HandlerRef, InvocationContext};
pub use runtime::{execute_functions, ExecutionEngine, Handler, HandlerLoader, LoadedHandler, ScriptLoader};
