//! Error taxonomies for the send and registration boundaries.
//!
//! The boolean send surface (`send_async` and friends) collapses these to
//! success/failure after logging; the `try_*` twins expose the reason.

use thiserror::Error;

/// Why a send operation failed before (or instead of) delivering.
///
/// Receiver-side handler failures are never represented here: asynchronous
/// messaging cannot synchronously report them, and synchronous modes
/// deliberately report only resolution/claim/wait failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// No actor is registered under the target id.
    #[error("unknown receiver: no actor registered under id '{id}'")]
    UnknownReceiver { id: String },

    /// The target mailbox rejected the envelope (bounded and full, or
    /// closed). The pending counter is not touched in this case.
    #[error("mailbox of actor '{id}' rejected the envelope")]
    MailboxRejected { id: String },

    /// The payload is itself a sync envelope. Sync envelopes are built only
    /// by the orderly-sync path; wrapping one inside another send is a
    /// caller error.
    #[error("a sync envelope is not a valid payload for another send")]
    DoubleWrappedSync,

    /// The completion signal was dropped before firing, which only happens
    /// when the target system is torn down mid-wait.
    #[error("completion signal dropped before firing; receiver system went away")]
    CompletionDropped,

    /// The sending actor was never registered with a system, so it has no id
    /// to stamp on the envelope.
    #[error("sending actor is not registered with any system")]
    SenderUnbound,
}

/// Why system registration was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Another actor already holds this id in the directory.
    #[error("an actor is already registered under id '{id}'")]
    DuplicateId { id: String },

    /// This actor instance is already bound to a system.
    #[error("actor is already bound to a system as '{id}'")]
    AlreadyBound { id: String },
}
