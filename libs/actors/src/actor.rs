//! Actor state machine and dispatch pipeline.
//!
//! An actor owns a private FIFO mailbox, a type-keyed handler registry, and
//! an executing flag mutated only by compare-and-swap. The flag is the sole
//! per-actor exclusion mechanism: whichever thread wins it (a pool worker or
//! a predatory caller) runs the dispatch pipeline alone, so an actor never
//! processes two messages concurrently.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, warn};

use crate::config::DEFAULT_POLL_TIMEOUT;
use crate::error::{RegisterError, SendError};
use crate::handler::HandlerRegistry;
use crate::messages::{Delivery, Envelope, Payload};
use crate::system::{report, ActorSystem};

/// Required capability of every concrete actor: what to do with a payload no
/// registered handler matched.
pub trait ActorBehavior: Send + Sync + 'static {
    fn on_unmatched(&self, actor: &Actor, sender: &str, payload: &Payload);
}

/// A unit of sequential logic with a private mailbox.
///
/// Constructed by the embedding application and registered into exactly one
/// [`ActorSystem`], which assigns the id and the system back-reference. Both
/// are set once and immutable afterwards. Handlers may be registered at any
/// time, though registering before traffic begins is the supported pattern.
pub struct Actor {
    id: OnceLock<String>,
    system: OnceLock<Weak<ActorSystem>>,
    mailbox_tx: Sender<Delivery>,
    mailbox_rx: Receiver<Delivery>,
    handlers: HandlerRegistry,
    executing: AtomicBool,
    behavior: Box<dyn ActorBehavior>,
}

impl Actor {
    /// Actor with an unbounded mailbox.
    pub fn new(behavior: impl ActorBehavior) -> Arc<Self> {
        let (mailbox_tx, mailbox_rx) = unbounded();
        Arc::new(Self::build(behavior, mailbox_tx, mailbox_rx))
    }

    /// Actor with a bounded mailbox that rejects envelopes when full.
    pub fn with_capacity(behavior: impl ActorBehavior, capacity: usize) -> Arc<Self> {
        let (mailbox_tx, mailbox_rx) = bounded(capacity);
        Arc::new(Self::build(behavior, mailbox_tx, mailbox_rx))
    }

    fn build(
        behavior: impl ActorBehavior,
        mailbox_tx: Sender<Delivery>,
        mailbox_rx: Receiver<Delivery>,
    ) -> Self {
        Self {
            id: OnceLock::new(),
            system: OnceLock::new(),
            mailbox_tx,
            mailbox_rx,
            handlers: HandlerRegistry::default(),
            executing: AtomicBool::new(false),
            behavior: Box::new(behavior),
        }
    }

    /// Id assigned at registration, `None` before.
    pub fn id(&self) -> Option<&str> {
        self.id.get().map(String::as_str)
    }

    fn id_for_log(&self) -> &str {
        self.id().unwrap_or("<unregistered>")
    }

    /// Owning system, if registered and still alive.
    pub fn system(&self) -> Option<Arc<ActorSystem>> {
        self.system.get().and_then(Weak::upgrade)
    }

    /// Called by [`ActorSystem::register`]; binds id and back-reference once.
    pub(crate) fn bind(&self, id: String, system: Weak<ActorSystem>) -> Result<(), RegisterError> {
        self.id.set(id).map_err(|_| RegisterError::AlreadyBound {
            id: self.id().map(str::to_string).unwrap_or_default(),
        })?;
        let _ = self.system.set(system);
        Ok(())
    }

    /// Registers a handler for payloads of concrete type `T`, replacing any
    /// previous handler for `T`. Returns `&self` so registrations chain
    /// fluently.
    pub fn register_handler<T, F>(&self, handler: F) -> &Self
    where
        T: Any + Send + Sync,
        F: Fn(Option<Arc<Actor>>, &Actor, &T) + Send + Sync + 'static,
    {
        self.handlers.register(handler);
        self
    }

    /// Appends an envelope to the mailbox without blocking. Returns false
    /// only when the mailbox rejects (bounded and full, or closed).
    pub fn enqueue(&self, sender: impl Into<String>, payload: Payload) -> bool {
        self.enqueue_delivery(Delivery::Plain(Envelope::new(sender, payload)))
    }

    pub(crate) fn enqueue_delivery(&self, delivery: Delivery) -> bool {
        match self.mailbox_tx.try_send(delivery) {
            Ok(()) => true,
            Err(TrySendError::Full(rejected)) => {
                warn!(
                    actor_id = self.id_for_log(),
                    sender = rejected.sender(),
                    "mailbox full, envelope rejected"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Atomic idle -> executing transition. A false return means another
    /// thread holds the turn and the caller must not proceed.
    pub fn try_claim_executing(&self) -> bool {
        self.executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Atomic executing -> idle transition. Safe to call when already idle;
    /// returns false in that case.
    pub fn release_executing(&self) -> bool {
        self.executing
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether some thread currently holds this actor's turn.
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    /// One scheduled turn: pop at most one envelope, dispatch it, and release
    /// the executing flag on the way out no matter what. The caller (the
    /// dispatcher) must have claimed the flag already.
    ///
    /// An empty poll is a benign scheduling race, not an error: the pending
    /// counter is a hint, the mailbox is the source of truth.
    pub(crate) fn consume_one(&self) {
        let _turn = ExecutingGuard(self);
        match self.mailbox_rx.recv_timeout(self.poll_timeout()) {
            Ok(delivery) => self.dispatch_delivery(delivery),
            Err(RecvTimeoutError::Timeout) => {
                warn!(actor_id = self.id_for_log(), "scheduled with an empty mailbox");
            }
            Err(RecvTimeoutError::Disconnected) => {
                // The actor owns its sender half, so this only happens during
                // teardown.
                debug!(actor_id = self.id_for_log(), "mailbox closed");
            }
        }
    }

    /// Polls and dispatches until the mailbox stays empty for one full poll
    /// window. Manual/test draining outside the scheduler; does not touch
    /// the executing flag.
    pub fn drain_all(&self) {
        loop {
            match self.mailbox_rx.recv_timeout(self.poll_timeout()) {
                Ok(delivery) => self.dispatch_delivery(delivery),
                Err(_) => break,
            }
        }
    }

    /// Dispatch pipeline entry for one drained mailbox element.
    pub(crate) fn dispatch_delivery(&self, delivery: Delivery) {
        match delivery {
            Delivery::Plain(envelope) => {
                let (sender, payload) = envelope.into_parts();
                self.dispatch_one(&sender, &payload);
            }
            Delivery::Sync(envelope) => {
                let (sender, payload, done) = envelope.into_parts();
                self.dispatch_one(&sender, &payload);
                // dispatch_one swallowed any handler panic, so the blocked
                // caller is always released.
                done.fire();
            }
        }
    }

    /// Routes one payload through the handler registry, falling back to the
    /// unmatched-message hook. Handler panics are caught here: they are
    /// logged, they do not poison the executing flag, and they do not crash
    /// the worker thread.
    pub(crate) fn dispatch_one(&self, sender_id: &str, payload: &Payload) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.route(sender_id, payload)));
        if let Err(panic) = outcome {
            error!(
                actor_id = self.id_for_log(),
                sender = sender_id,
                payload_type = ?payload.as_ref().type_id(),
                panic = panic_message(panic.as_ref()),
                "handler panicked during dispatch"
            );
        }
    }

    fn route(&self, sender_id: &str, payload: &Payload) {
        let sender = self.system().and_then(|system| system.get_actor(sender_id));
        match self.handlers.lookup(payload.as_ref().type_id()) {
            Some(handler) => handler(sender, self, payload),
            None => self.behavior.on_unmatched(self, sender_id, payload),
        }
    }

    fn poll_timeout(&self) -> Duration {
        self.system()
            .map(|system| system.config().poll_timeout())
            .unwrap_or(DEFAULT_POLL_TIMEOUT)
    }

    /// Fire-and-forget send using this actor's id as sender.
    pub fn send(&self, receiver: &str, payload: Payload) -> bool {
        report(self.try_send(receiver, payload))
    }

    /// Fallible twin of [`Actor::send`].
    pub fn try_send(&self, receiver: &str, payload: Payload) -> Result<(), SendError> {
        let (system, id) = self.bound()?;
        system.try_send_async(id, receiver, payload)
    }

    /// Predatory synchronous call using this actor's id as sender.
    pub fn talk_predatory(&self, receiver: &str, payload: Payload) -> bool {
        report(self.try_talk_predatory(receiver, payload))
    }

    /// Fallible twin of [`Actor::talk_predatory`].
    pub fn try_talk_predatory(&self, receiver: &str, payload: Payload) -> Result<(), SendError> {
        let (system, id) = self.bound()?;
        system.try_send_sync_predatory(receiver, id, payload)
    }

    /// Orderly synchronous call using this actor's id as sender.
    pub fn talk_orderly(&self, receiver: &str, payload: Payload) -> bool {
        report(self.try_talk_orderly(receiver, payload))
    }

    /// Fallible twin of [`Actor::talk_orderly`].
    pub fn try_talk_orderly(&self, receiver: &str, payload: Payload) -> Result<(), SendError> {
        let (system, id) = self.bound()?;
        system.try_send_sync_orderly(receiver, id, payload)
    }

    /// Resolves the system back-reference and the bound id, or reports that
    /// this actor has never been registered.
    fn bound(&self) -> Result<(Arc<ActorSystem>, &str), SendError> {
        match (self.system(), self.id()) {
            (Some(system), Some(id)) => Ok((system, id)),
            _ => Err(SendError::SenderUnbound),
        }
    }
}

/// Releases the executing flag when dropped, so a turn always ends idle even
/// if the body panics.
pub(crate) struct ExecutingGuard<'a>(pub(crate) &'a Actor);

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        self.0.release_executing();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
