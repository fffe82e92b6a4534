/// Handler construction and invocation
///
/// Turns one function descriptor into a callable unit and adapts the two
/// completion protocols a handler may use into a single awaitable outcome:
/// - Callback protocol: the handler invokes the injected error-first
///   callback `(error, result)`.
/// - Coroutine protocol: the handler returns a coroutine without touching
///   the callback; the engine drives it to completion cooperatively and its
///   return value (or raised error) becomes the outcome.
///
/// Both listeners race into one settlement slot; whichever fires first wins
/// and later signals are ignored. A handler that uses neither protocol never
/// settles, and its invocation pends forever.

use mlua::{Lua, Table, Thread, ThreadStatus, Value as LuaValue};
use serde_json::Value;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use crate::errors::{InvokeError, InvokeResult};
use crate::function::types::{FunctionDescriptor, HandlerRef, InvocationContext};
use crate::runtime::convert::{json_to_lua, lua_to_json};
use crate::runtime::env::{merged_env, EnvOverlay};
use crate::runtime::loader::{HandlerLoader, ScriptLoader};

/// One completed invocation signal
#[derive(Debug)]
enum Settlement {
    /// Handler produced a result value
    Settled(Value),
    /// Handler produced a failure value
    Failed(InvokeError),
}

/// Settlement slot raced between the callback listener and the coroutine
/// listener
///
/// The first signal wins; every later signal is a guarded no-op.
#[derive(Clone, Default)]
struct SettlementCell {
    slot: Rc<RefCell<Option<Settlement>>>,
}

impl SettlementCell {
    fn settle(&self, name: &str, settlement: Settlement) {
        let mut slot = self.slot.borrow_mut();
        if slot.is_some() {
            tracing::warn!(
                "⚠️ Ignoring duplicate completion signal from function: {}",
                name
            );
            return;
        }
        *slot = Some(settlement);
    }

    fn take(&self) -> Option<Settlement> {
        self.slot.borrow_mut().take()
    }
}

/// A callable unit built from one function descriptor
///
/// Construction never fails: malformed references and unloadable modules are
/// reported through the asynchronous outcome of [`Handler::invoke`], so one
/// bad descriptor in a batch surfaces as that descriptor's rejection instead
/// of crashing the caller.
pub struct Handler {
    descriptor: FunctionDescriptor,
    base_dir: PathBuf,
    loader: Arc<dyn HandlerLoader>,
}

impl Handler {
    /// Create a handler backed by the default filesystem script loader
    pub fn new(base_dir: impl Into<PathBuf>, descriptor: FunctionDescriptor) -> Self {
        Self::with_loader(base_dir, descriptor, Arc::new(ScriptLoader::default()))
    }

    /// Create a handler with a custom module loader
    pub fn with_loader(
        base_dir: impl Into<PathBuf>,
        descriptor: FunctionDescriptor,
        loader: Arc<dyn HandlerLoader>,
    ) -> Self {
        Self {
            descriptor,
            base_dir: base_dir.into(),
            loader,
        }
    }

    /// The descriptor this handler was built from
    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Invoke the handler with a freshly minted invocation context
    pub async fn invoke(&self, event: &Value) -> InvokeResult<Value> {
        self.invoke_with(event, None).await
    }

    /// Invoke the handler, optionally supplying the invocation context
    ///
    /// The environment overlay is applied for the duration of the call and
    /// restored after successful asynchronous completion. On failure the
    /// overlay stays in place; concurrent invocations race on the shared
    /// process environment.
    pub async fn invoke_with(
        &self,
        event: &Value,
        context: Option<InvocationContext>,
    ) -> InvokeResult<Value> {
        let mut overlay = Some(EnvOverlay::apply(&self.descriptor.environment));

        let handler_ref = HandlerRef::parse(&self.descriptor.handler)?;
        let context = context.unwrap_or_else(|| {
            InvocationContext::new(
                &self.descriptor.name,
                merged_env(&self.descriptor.environment),
            )
        });

        tracing::debug!(
            "📞 Invoking function '{}' via {}.{}",
            self.descriptor.name,
            handler_ref.module_path,
            handler_ref.symbol
        );

        let module_path = self.base_dir.join(&handler_ref.module_path);
        let loaded = self.loader.load(&module_path, &handler_ref.symbol)?;
        let lua = &loaded.lua;

        let event_value = json_to_lua(lua, event).map_err(InvokeError::ScriptEngine)?;
        let context_value = context_table(lua, &context).map_err(InvokeError::ScriptEngine)?;

        // Callback listener: error-first, routed into the settlement slot.
        let cell = SettlementCell::default();
        let callback_cell = cell.clone();
        let callback_name = self.descriptor.name.clone();
        let callback = lua
            .create_function(move |_, (error, result): (LuaValue, LuaValue)| {
                if error.is_nil() {
                    let value = lua_to_json(&result)?;
                    callback_cell.settle(&callback_name, Settlement::Settled(value));
                } else {
                    let value = lua_to_json(&error)?;
                    callback_cell.settle(
                        &callback_name,
                        Settlement::Failed(InvokeError::HandlerFailure(value)),
                    );
                }
                Ok(())
            })
            .map_err(InvokeError::ScriptEngine)?;

        let returned = match loaded
            .entry
            .call::<LuaValue>((event_value, context_value, callback))
        {
            Ok(value) => value,
            Err(raised) => {
                // A synchronous raise inside the handler is a handler failure,
                // reported like any rejected invocation.
                return Err(InvokeError::HandlerFailure(Value::String(
                    raised.to_string(),
                )));
            }
        };

        // Coroutine listener: a returned thread is the awaitable completion
        // protocol. Its resolution settles success, its raise settles failure
        // through the same slot the callback uses.
        if let LuaValue::Thread(thread) = returned {
            match drive_thread(&thread).await {
                Ok(resolved) => {
                    if let Some(active) = overlay.take() {
                        active.restore();
                    }
                    tracing::info!(
                        "✅ Successfully invoked scheduled function: [{}]",
                        self.descriptor.short_name()
                    );
                    match lua_to_json(&resolved) {
                        Ok(value) => {
                            cell.settle(&self.descriptor.name, Settlement::Settled(value));
                        }
                        Err(convert) => cell.settle(
                            &self.descriptor.name,
                            Settlement::Failed(InvokeError::ScriptEngine(convert)),
                        ),
                    }
                }
                Err(raised) => {
                    cell.settle(
                        &self.descriptor.name,
                        Settlement::Failed(InvokeError::HandlerFailure(Value::String(
                            raised.to_string(),
                        ))),
                    );
                }
            }
        }

        match cell.take() {
            Some(Settlement::Settled(value)) => {
                if let Some(active) = overlay.take() {
                    active.restore();
                }
                Ok(value)
            }
            Some(Settlement::Failed(error)) => Err(error),
            None => {
                // Neither protocol was used: the invocation never settles.
                // There is no timeout; the pending future stalls its batch.
                tracing::warn!(
                    "⏳ Function '{}' neither called back nor returned a coroutine; invocation will never settle",
                    self.descriptor.name
                );
                futures::future::pending().await
            }
        }
    }
}

/// Drive a handler coroutine to completion, yielding to the scheduler
/// between resumptions so sibling invocations interleave
async fn drive_thread(thread: &Thread) -> mlua::Result<LuaValue> {
    loop {
        let value = thread.resume::<LuaValue>(())?;
        match thread.status() {
            ThreadStatus::Resumable => tokio::task::yield_now().await,
            _ => return Ok(value),
        }
    }
}

/// Build the Lua table handed to the handler as its context argument
fn context_table(lua: &Lua, context: &InvocationContext) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("id", context.id.to_string())?;
    table.set("name", context.name.as_str())?;
    table.set("started_at", context.started_at.to_rfc3339())?;

    let env = lua.create_table_with_capacity(0, context.env.len())?;
    for (key, value) in &context.env {
        env.set(key.as_str(), value.as_str())?;
    }
    table.set("env", env)?;

    Ok(table)
}
