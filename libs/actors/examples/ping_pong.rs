//! Two actors exchanging async greetings plus an orderly sync callback.
//!
//! Run with `cargo run --example ping_pong` (set `RUST_LOG=debug` for the
//! runtime's own diagnostics).

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use inproc_actors::{Actor, ActorBehavior, ActorSystem, Payload};

/// Demo behavior: log anything no handler matched.
struct LogUnmatched;

impl ActorBehavior for LogUnmatched {
    fn on_unmatched(&self, actor: &Actor, sender: &str, _payload: &Payload) {
        info!(
            actor_id = actor.id().unwrap_or("<unregistered>"),
            sender, "received message with no matching handler"
        );
    }
}

/// Request/response record mutated in place by the receiving handler.
struct CallbackMessage {
    request: String,
    response: Mutex<Option<String>>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let system = ActorSystem::new();

    let actor1 = Actor::new(LogUnmatched);
    actor1
        .register_handler(|_, _, msg: &String| {
            info!(%msg, "actor1 received a string");
        })
        .register_handler(|_, me: &Actor, msg: &CallbackMessage| {
            info!(request = %msg.request, "actor1 received a sync callback");
            let receiver_id = me.id().unwrap_or("<unregistered>");
            *msg.response.lock() = Some(format!("acknowledged by {receiver_id}"));
        });
    let actor2 = Actor::new(LogUnmatched);

    system.register("actor1", actor1).unwrap();
    system.register("actor2", Arc::clone(&actor2)).unwrap();

    // Fire-and-forget, both through the system and an actor's own handle.
    system.send_async("actor1", "actor2", Arc::new("Hello from actor1!".to_string()));
    system.send_async("actor2", "actor1", Arc::new("Hello from actor2!".to_string()));
    actor2.send("actor1", Arc::new("halo actor1".to_string()));

    // Orderly sync call: blocks until actor1's handler ran, then the caller
    // reads the response it wrote into the shared record.
    let callback = Arc::new(CallbackMessage {
        request: "demo callback".to_string(),
        response: Mutex::new(None),
    });
    actor2.talk_orderly("actor1", callback.clone());
    info!(
        response = callback.response.lock().as_deref().unwrap_or("<none>"),
        "sync callback completed"
    );

    // Let the async traffic drain before the process exits.
    thread::sleep(Duration::from_millis(500));
}
