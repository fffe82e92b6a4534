/// Batch execution engine
///
/// Fans a batch of trigger events out to every descriptor's handler
/// concurrently and joins the outcomes. All invocations share the current
/// task (single-threaded cooperative interleaving; Lua states are not Send),
/// every descriptor receives the identical full event batch, and the join is
/// first-failure-wins: one rejected invocation fails the whole batch and the
/// sibling outcomes are discarded.

use futures::future::try_join_all;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::errors::InvokeResult;
use crate::function::types::FunctionDescriptor;
use crate::runtime::executor::Handler;
use crate::runtime::loader::{HandlerLoader, ScriptLoader};

/// Execution engine for descriptor batches
///
/// Holds the module loader shared by every handler it constructs. The
/// default engine loads Lua script modules from the filesystem; tests and
/// embedders can swap in their own [`HandlerLoader`].
pub struct ExecutionEngine {
    /// Module loader handed to each constructed handler
    loader: Arc<dyn HandlerLoader>,
}

impl ExecutionEngine {
    /// Create an engine backed by the default filesystem script loader
    pub fn new() -> Self {
        Self::with_loader(Arc::new(ScriptLoader::default()))
    }

    /// Create an engine with a custom module loader
    pub fn with_loader(loader: Arc<dyn HandlerLoader>) -> Self {
        Self { loader }
    }

    /// Invoke every descriptor against the shared event batch
    ///
    /// Returns the per-descriptor results in input order once every
    /// invocation has settled, or the first rejection encountered. An
    /// invocation that never settles stalls the join indefinitely; there is
    /// no timeout.
    pub async fn execute_functions(
        &self,
        events: &[Value],
        base_dir: &Path,
        descriptors: &[FunctionDescriptor],
    ) -> InvokeResult<Vec<Value>> {
        tracing::info!(
            "🚀 Executing {} scheduled functions from {}",
            descriptors.len(),
            base_dir.display()
        );

        let batch = Value::Array(events.to_vec());
        let invocations = descriptors.iter().map(|descriptor| {
            let handler =
                Handler::with_loader(base_dir, descriptor.clone(), Arc::clone(&self.loader));
            let batch = batch.clone();
            async move { handler.invoke(&batch).await }
        });

        let results = try_join_all(invocations).await?;

        tracing::info!("🎉 All {} scheduled functions completed", results.len());
        Ok(results)
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoke every descriptor against the shared event batch with a default
/// engine
///
/// Convenience entry point for callers that do not need loader injection.
pub async fn execute_functions(
    events: &[Value],
    base_dir: &Path,
    descriptors: &[FunctionDescriptor],
) -> InvokeResult<Vec<Value>> {
    ExecutionEngine::new()
        .execute_functions(events, base_dir, descriptors)
        .await
}
