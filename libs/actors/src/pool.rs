//! Bounded worker pool executing message-consumption turns.
//!
//! The dispatcher hands the pool exactly one [`Actor::consume_one`] turn per
//! claimed unit of pending work. Workers are plain named OS threads feeding
//! off one shared task channel; they exit when the channel disconnects,
//! which happens when the owning system is dropped.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use tracing::debug;

use crate::actor::Actor;

pub(crate) struct WorkerPool {
    task_tx: Sender<Arc<Actor>>,
    _workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn new(size: usize) -> Self {
        let size = size.max(1);
        let (task_tx, task_rx) = unbounded::<Arc<Actor>>();

        let workers = (0..size)
            .map(|n| {
                let task_rx = task_rx.clone();
                thread::Builder::new()
                    .name(format!("actors-worker-{n}"))
                    .spawn(move || {
                        for actor in task_rx.iter() {
                            actor.consume_one();
                        }
                        debug!("task channel closed, worker exiting");
                    })
                    .expect("spawn worker thread")
            })
            .collect();

        Self {
            task_tx,
            _workers: workers,
        }
    }

    /// Queues one consumption turn for `actor`. False only when the pool is
    /// gone, which the caller must treat as a failed handoff.
    pub(crate) fn submit(&self, actor: Arc<Actor>) -> bool {
        self.task_tx.send(actor).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorBehavior;
    use crate::messages::Payload;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct Quiet;

    impl ActorBehavior for Quiet {
        fn on_unmatched(&self, _actor: &Actor, _sender: &str, _payload: &Payload) {}
    }

    #[test]
    fn submitted_turn_consumes_one_message() {
        let pool = WorkerPool::new(2);
        let actor = Actor::new(Quiet);
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        actor.register_handler(move |_, _, _msg: &String| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(actor.enqueue("tester", Arc::new("one".to_string())));
        assert!(actor.try_claim_executing());
        assert!(pool.submit(Arc::clone(&actor)));

        let deadline = Instant::now() + Duration::from_secs(2);
        while hits.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // The turn released the flag on its way out.
        let deadline = Instant::now() + Duration::from_secs(2);
        while actor.is_executing() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!actor.is_executing());
    }
}
