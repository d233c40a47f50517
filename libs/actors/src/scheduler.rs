//! Pending-counter bookkeeping and the dispatcher pass.
//!
//! The counter table records how many message turns are owed to each actor;
//! the mailbox stays the source of truth for payload order. One pass turns
//! counters into at most one worker-pool turn per actor: claim the actor's
//! executing flag, CAS-decrement the counter against the observed value, and
//! hand off. Entries observed at zero are removed; removal re-checks the
//! count under the shard lock, so a racing increment is never lost.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use dashmap::DashMap;
use tracing::{debug, error};

use crate::config::ActorSystemConfig;
use crate::pool::WorkerPool;
use crate::system::ActorSystem;

pub(crate) struct Scheduler {
    pending: DashMap<String, AtomicI64>,
    pool: WorkerPool,
    /// Consecutive passes that found nothing to schedule.
    idle_cycles: AtomicU32,
    idle_threshold: u32,
}

impl Scheduler {
    pub(crate) fn new(config: &ActorSystemConfig) -> Self {
        Self {
            pending: DashMap::new(),
            pool: WorkerPool::new(config.workers),
            idle_cycles: AtomicU32::new(0),
            idle_threshold: config.idle_threshold,
        }
    }

    /// Records one enqueued-but-unclaimed message for `actor_id`, lazily
    /// creating the counter entry.
    pub(crate) fn note_pending(&self, actor_id: &str) {
        self.pending
            .entry(actor_id.to_string())
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(1, Ordering::AcqRel);
    }

    /// Pending turns currently recorded for `actor_id`. Diagnostic use.
    #[cfg(test)]
    pub(crate) fn pending_count(&self, actor_id: &str) -> i64 {
        self.pending
            .get(actor_id)
            .map(|counter| counter.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// One scheduling pass over a snapshot of the counter table.
    pub(crate) fn pass(&self, system: &ActorSystem) {
        if self.pending.is_empty() {
            self.idle_cycles.fetch_add(1, Ordering::AcqRel);
        }

        let scheduled: Vec<String> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        for actor_id in scheduled {
            let Some(counter) = self.pending.get(&actor_id) else {
                continue;
            };
            let observed = counter.load(Ordering::Acquire);
            if observed <= 0 {
                drop(counter);
                // Remove only if still zero under the shard lock; an
                // increment that lands in between keeps the entry alive.
                self.pending
                    .remove_if(&actor_id, |_, count| count.load(Ordering::Acquire) <= 0);
                continue;
            }

            let Some(actor) = system.get_actor(&actor_id) else {
                debug!(%actor_id, "pending work for an actor missing from the directory");
                continue;
            };

            // Busy actor: skip this cycle, never block the pass.
            if !actor.try_claim_executing() {
                continue;
            }

            if counter
                .compare_exchange(observed, observed - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                drop(counter);
                self.idle_cycles.store(0, Ordering::Release);
                if !self.pool.submit(actor.clone()) {
                    error!(actor_id = %actor_id, "worker pool unavailable, turn dropped");
                    actor.release_executing();
                }
            } else {
                // Raced with a concurrent increment; give the turn back and
                // let the next pass retry.
                actor.release_executing();
            }
        }
    }

    /// Whether the control thread should sleep before the next pass.
    pub(crate) fn should_throttle(&self) -> bool {
        self.idle_cycles.load(Ordering::Acquire) > self.idle_threshold
    }
}
