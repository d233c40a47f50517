//! In-Process Actor Runtime
//!
//! Actors are independent units of sequential logic addressed by string ids.
//! They communicate exclusively through asynchronous mailboxes, with two
//! synchronous escalation modes layered on top. A shared dispatcher thread
//! turns per-actor pending counters into turns on a bounded worker pool,
//! while a per-actor compare-and-swap flag guarantees that no actor ever
//! executes two messages concurrently.
//!
//! # Send protocols
//!
//! - **Async** ([`ActorSystem::send_async`]): fire-and-forget, FIFO per
//!   receiving actor.
//! - **Predatory sync** ([`ActorSystem::send_sync_predatory`]): the caller
//!   spins for exclusive access and runs the handler inline on its own
//!   thread, jumping ahead of queued envelopes. Lowest latency, no fairness.
//! - **Orderly sync** ([`ActorSystem::send_sync_orderly`]): the payload
//!   queues behind existing traffic and the caller blocks on a one-shot
//!   completion signal. FIFO preserved, added latency.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use inproc_actors::{Actor, ActorBehavior, ActorSystem, Payload};
//!
//! struct Logging;
//!
//! impl ActorBehavior for Logging {
//!     fn on_unmatched(&self, _actor: &Actor, sender: &str, _payload: &Payload) {
//!         println!("unmatched message from {sender}");
//!     }
//! }
//!
//! let system = ActorSystem::new();
//!
//! let pong = Actor::new(Logging);
//! pong.register_handler(|_, _, msg: &String| {
//!     println!("received: {msg}");
//! });
//!
//! system.register("pong", pong).unwrap();
//! assert!(system.send_async("app", "pong", Arc::new("ping".to_string())));
//! ```

pub mod actor;
pub mod config;
pub mod error;
mod handler;
pub mod messages;
mod pool;
mod scheduler;
pub mod system;

pub use actor::{Actor, ActorBehavior};
pub use config::ActorSystemConfig;
pub use error::{RegisterError, SendError};
pub use messages::{Envelope, Payload, SyncEnvelope};
pub use system::ActorSystem;
