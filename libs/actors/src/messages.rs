//! Message envelopes and the one-shot completion signal.
//!
//! Payloads are opaque shared values (`Arc<dyn Any + Send + Sync>`) routed by
//! exact runtime type at dispatch. The mailbox carries a [`Delivery`], which
//! is either a plain envelope or a synchronous one that a blocked caller is
//! waiting on.

use std::any::Any;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::SendError;

/// Opaque message payload.
///
/// Shared ownership lets a synchronous caller keep a handle to the payload it
/// sent and observe handler-side mutation through interior mutability.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Immutable (sender id, payload) carrier for fire-and-forget delivery.
pub struct Envelope {
    sender: String,
    payload: Payload,
}

impl Envelope {
    pub fn new(sender: impl Into<String>, payload: Payload) -> Self {
        Self {
            sender: sender.into(),
            payload,
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub(crate) fn into_parts(self) -> (String, Payload) {
        (self.sender, self.payload)
    }
}

/// Envelope variant for orderly synchronous sends: the payload plus a
/// completion signal the sending thread blocks on.
///
/// Only the orderly-sync path constructs these; supplying one as the payload
/// of another send is a caller error and is rejected up front.
pub struct SyncEnvelope {
    sender: String,
    payload: Payload,
    done: Completion,
}

impl SyncEnvelope {
    /// Builds the envelope together with the waiter half of its completion
    /// signal.
    pub(crate) fn new(sender: impl Into<String>, payload: Payload) -> (Self, CompletionWaiter) {
        let (done, waiter) = Completion::new();
        (
            Self {
                sender: sender.into(),
                payload,
                done,
            },
            waiter,
        )
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub(crate) fn into_parts(self) -> (String, Payload, Completion) {
        (self.sender, self.payload, self.done)
    }
}

/// Firing half of a one-shot completion signal.
///
/// `fire` consumes the signal, so it can be raised at most once by
/// construction. Dropping it unfired wakes the waiter with an error instead
/// of leaving it blocked forever.
pub struct Completion {
    tx: Sender<()>,
}

impl Completion {
    fn new() -> (Self, CompletionWaiter) {
        let (tx, rx) = bounded(1);
        (Self { tx }, CompletionWaiter { rx })
    }

    pub(crate) fn fire(self) {
        // A dropped waiter makes this a no-op, which is fine.
        let _ = self.tx.send(());
    }
}

/// Waiting half of a one-shot completion signal.
pub struct CompletionWaiter {
    rx: Receiver<()>,
}

impl CompletionWaiter {
    /// Blocks until the signal fires. There is no timeout: a wedged receiver
    /// blocks the caller indefinitely, a documented property of orderly
    /// sends.
    pub(crate) fn wait(self) -> Result<(), SendError> {
        self.rx.recv().map_err(|_| SendError::CompletionDropped)
    }
}

/// One mailbox element.
pub(crate) enum Delivery {
    Plain(Envelope),
    Sync(SyncEnvelope),
}

impl Delivery {
    pub(crate) fn sender(&self) -> &str {
        match self {
            Delivery::Plain(env) => env.sender(),
            Delivery::Sync(env) => env.sender(),
        }
    }
}
