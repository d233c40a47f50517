//! Per-actor handler registry.
//!
//! Handlers are keyed by the payload's `TypeId` and matched exactly: there is
//! no supertype or trait-based fallback, so one handler must be registered
//! per concrete payload type. Re-registering a type replaces the previous
//! handler (last write wins) and logs the replacement so it is observable.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::actor::Actor;
use crate::messages::Payload;

/// Type-erased handler: `(sender, receiver, payload)`.
///
/// The sender handle is `None` when the sender id did not resolve (system
/// sends, unregistered senders).
pub(crate) type HandlerFn = Arc<dyn Fn(Option<Arc<Actor>>, &Actor, &Payload) + Send + Sync>;

struct RegisteredHandler {
    /// Payload type name, kept for replacement diagnostics.
    type_name: &'static str,
    func: HandlerFn,
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: RwLock<HashMap<TypeId, RegisteredHandler>>,
}

impl HandlerRegistry {
    /// Registers `handler` for payloads of concrete type `T`, replacing any
    /// previous registration for `T`.
    pub(crate) fn register<T, F>(&self, handler: F)
    where
        T: Any + Send + Sync,
        F: Fn(Option<Arc<Actor>>, &Actor, &T) + Send + Sync + 'static,
    {
        let func: HandlerFn = Arc::new(move |sender, receiver, payload| {
            if let Some(typed) = payload.downcast_ref::<T>() {
                handler(sender, receiver, typed);
            }
        });
        let entry = RegisteredHandler {
            type_name: std::any::type_name::<T>(),
            func,
        };
        if let Some(previous) = self.handlers.write().insert(TypeId::of::<T>(), entry) {
            info!(
                payload_type = previous.type_name,
                "handler replaced by a newer registration"
            );
        }
    }

    /// Exact-type lookup. Clones the handler out so no registry lock is held
    /// across the invocation.
    pub(crate) fn lookup(&self, type_id: TypeId) -> Option<HandlerFn> {
        self.handlers
            .read()
            .get(&type_id)
            .map(|registered| Arc::clone(&registered.func))
    }
}
