/// Runtime Execution Engine
///
/// This module resolves function descriptors into callable Lua handlers and
/// runs them. It handles:
/// - Fresh, cache-free loading of handler script modules
/// - Per-invocation environment overlays
/// - Adapting callback-style and coroutine-style completion into one
///   awaitable outcome
/// - Concurrent fan-out of a batch with first-failure-wins joining

// JSON ⇄ Lua value bridging
pub mod convert;

// Per-invocation environment overlay
pub mod env;

// Handler module loading
pub mod loader;

// Handler construction and invocation
pub mod executor;

// Batch execution engine
pub mod engine;

// Re-export main types
pub use engine::{execute_functions, ExecutionEngine};
pub use executor::Handler;
pub use loader::{HandlerLoader, LoadedHandler, ScriptLoader};
