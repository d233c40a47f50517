//! The actor system: directory, send protocols, and the control thread.
//!
//! One system owns an actor directory, a scheduler (pending counters plus a
//! bounded worker pool), and a dedicated control thread that runs the
//! dispatcher loop for the system's lifetime. All shared registries are
//! owned state on the instance, so independent systems coexist in one
//! process.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::actor::{Actor, ExecutingGuard};
use crate::config::ActorSystemConfig;
use crate::error::{RegisterError, SendError};
use crate::messages::{Delivery, Envelope, Payload, SyncEnvelope};
use crate::scheduler::Scheduler;

/// Shared runtime for a set of registered actors.
///
/// Construction starts the control thread and the worker pool immediately.
/// The directory is meant to be populated during a startup phase; sends to
/// ids registered concurrently with traffic work, but
/// register-before-first-send is the supported pattern.
pub struct ActorSystem {
    directory: RwLock<HashMap<String, Arc<Actor>>>,
    scheduler: Scheduler,
    config: ActorSystemConfig,
}

impl ActorSystem {
    /// System with default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(ActorSystemConfig::default())
    }

    /// System with explicit configuration.
    pub fn with_config(config: ActorSystemConfig) -> Arc<Self> {
        let system = Arc::new(Self {
            directory: RwLock::new(HashMap::new()),
            scheduler: Scheduler::new(&config),
            config,
        });

        let weak = Arc::downgrade(&system);
        thread::Builder::new()
            .name("actors-dispatch".into())
            .spawn(move || dispatcher_loop(weak))
            .expect("spawn dispatcher thread");

        system
    }

    pub fn config(&self) -> &ActorSystemConfig {
        &self.config
    }

    /// Binds `id` and a system back-reference into `actor` and stores the
    /// handle in the directory. Must happen before any send targets `id`.
    pub fn register(
        self: &Arc<Self>,
        id: impl Into<String>,
        actor: Arc<Actor>,
    ) -> Result<(), RegisterError> {
        let id = id.into();
        let mut directory = self.directory.write();
        if directory.contains_key(&id) {
            return Err(RegisterError::DuplicateId { id });
        }
        actor.bind(id.clone(), Arc::downgrade(self))?;
        debug!(actor_id = %id, "actor registered");
        directory.insert(id, actor);
        Ok(())
    }

    /// Directory lookup; used by actors to resolve sender ids into handles.
    pub fn get_actor(&self, id: &str) -> Option<Arc<Actor>> {
        self.directory.read().get(id).cloned()
    }

    /// Fire-and-forget send. True when the envelope was accepted; the sender
    /// learns nothing about what the receiver later does with it.
    pub fn send_async(&self, sender: &str, receiver: &str, payload: Payload) -> bool {
        report(self.try_send_async(sender, receiver, payload))
    }

    /// [`Self::send_async`] with the failure reason.
    pub fn try_send_async(
        &self,
        sender: &str,
        receiver: &str,
        payload: Payload,
    ) -> Result<(), SendError> {
        if payload.is::<SyncEnvelope>() {
            return Err(SendError::DoubleWrappedSync);
        }
        self.deliver(receiver, Delivery::Plain(Envelope::new(sender, payload)))
    }

    /// Priority synchronous call: spin for the receiver's executing flag and
    /// run the dispatch pipeline inline on this thread. Steals a turn ahead
    /// of queued envelopes by design; retries forever against a receiver
    /// that never idles.
    pub fn send_sync_predatory(&self, receiver: &str, sender: &str, payload: Payload) -> bool {
        report(self.try_send_sync_predatory(receiver, sender, payload))
    }

    /// [`Self::send_sync_predatory`] with the failure reason. A handler that
    /// panics inside the call is logged but does not fail the send.
    pub fn try_send_sync_predatory(
        &self,
        receiver: &str,
        sender: &str,
        payload: Payload,
    ) -> Result<(), SendError> {
        let actor = self
            .get_actor(receiver)
            .ok_or_else(|| SendError::UnknownReceiver {
                id: receiver.to_string(),
            })?;

        loop {
            if !actor.try_claim_executing() {
                thread::sleep(self.config.claim_backoff());
                continue;
            }
            let _turn = ExecutingGuard(&actor);
            actor.dispatch_one(sender, &payload);
            return Ok(());
        }
    }

    /// Queued synchronous call: the payload takes its FIFO place behind
    /// already-enqueued traffic and the calling thread blocks until the
    /// receiver has dispatched it. Blocks forever against a wedged receiver.
    pub fn send_sync_orderly(&self, receiver: &str, sender: &str, payload: Payload) -> bool {
        report(self.try_send_sync_orderly(receiver, sender, payload))
    }

    /// [`Self::send_sync_orderly`] with the failure reason.
    pub fn try_send_sync_orderly(
        &self,
        receiver: &str,
        sender: &str,
        payload: Payload,
    ) -> Result<(), SendError> {
        if payload.is::<SyncEnvelope>() {
            return Err(SendError::DoubleWrappedSync);
        }

        let (envelope, waiter) = SyncEnvelope::new(sender, payload);
        self.deliver(receiver, Delivery::Sync(envelope))?;
        waiter.wait()
    }

    /// Shared enqueue-then-count path for async and orderly sends.
    fn deliver(&self, receiver: &str, delivery: Delivery) -> Result<(), SendError> {
        let actor = self
            .get_actor(receiver)
            .ok_or_else(|| SendError::UnknownReceiver {
                id: receiver.to_string(),
            })?;
        if !actor.enqueue_delivery(delivery) {
            return Err(SendError::MailboxRejected {
                id: receiver.to_string(),
            });
        }
        // Count only after the envelope is in the mailbox, so a scheduled
        // turn always finds a message unless something drained out of band.
        self.scheduler.note_pending(receiver);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self, actor_id: &str) -> i64 {
        self.scheduler.pending_count(actor_id)
    }
}

/// Collapses a send outcome onto the boolean surface, logging the reason.
pub(crate) fn report(outcome: Result<(), SendError>) -> bool {
    match outcome {
        Ok(()) => true,
        Err(err) => {
            error!(%err, "send failed");
            false
        }
    }
}

/// Control loop: runs until the owning system is dropped. A panicking pass
/// is logged and the loop continues; per-actor trouble never takes the
/// dispatcher down.
fn dispatcher_loop(system: Weak<ActorSystem>) {
    loop {
        let Some(system) = system.upgrade() else {
            break;
        };

        if catch_unwind(AssertUnwindSafe(|| system.scheduler.pass(&system))).is_err() {
            error!("dispatcher pass panicked, continuing");
        }

        let throttle = system.scheduler.should_throttle();
        let idle_sleep = system.config.idle_sleep();
        drop(system);

        if throttle {
            thread::sleep(idle_sleep);
        }
    }
    debug!("actor system dropped, dispatcher exiting");
}
