//! End-to-end properties of the runtime: per-actor mutual exclusion, FIFO
//! ordering, and the guarantees of the two synchronous call modes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use inproc_actors::{Actor, ActorBehavior, ActorSystem, Payload, SendError};

struct Quiet;

impl ActorBehavior for Quiet {
    fn on_unmatched(&self, _actor: &Actor, _sender: &str, _payload: &Payload) {}
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let limit = Instant::now() + deadline;
    while Instant::now() < limit {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn async_send_reaches_the_string_handler() {
    let system = ActorSystem::new();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let a = Actor::new(Quiet);
    a.register_handler(move |sender: Option<Arc<Actor>>, _, msg: &String| {
        let sender_id = sender
            .as_deref()
            .and_then(Actor::id)
            .unwrap_or("<unknown>")
            .to_string();
        sink.lock().push((sender_id, msg.clone()));
    });

    system.register("a", a).unwrap();
    system.register("b", Actor::new(Quiet)).unwrap();

    assert!(system.send_async("b", "a", Arc::new("ping".to_string())));

    assert!(wait_until(Duration::from_secs(5), || !received.lock().is_empty()));
    assert_eq!(
        received.lock().as_slice(),
        [("b".to_string(), "ping".to_string())]
    );
}

#[test]
fn hundred_concurrent_sends_invoke_exactly_once_each_without_overlap() {
    let system = ActorSystem::new();

    let invocations = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let actor = Actor::new(Quiet);
    let (hits, gauge, bad) = (
        Arc::clone(&invocations),
        Arc::clone(&in_flight),
        Arc::clone(&overlaps),
    );
    actor.register_handler(move |_, _, _msg: &u64| {
        if gauge.fetch_add(1, Ordering::SeqCst) != 0 {
            bad.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(1));
        gauge.fetch_sub(1, Ordering::SeqCst);
        hits.fetch_add(1, Ordering::SeqCst);
    });
    system.register("target", actor).unwrap();

    let senders: Vec<_> = (0..100u64)
        .map(|n| {
            let system = Arc::clone(&system);
            thread::spawn(move || {
                assert!(system.send_async("stress", "target", Arc::new(n)));
            })
        })
        .collect();
    for handle in senders {
        handle.join().unwrap();
    }

    assert!(wait_until(Duration::from_secs(30), || {
        invocations.load(Ordering::SeqCst) == 100
    }));
    // Give a straggler turn the chance to surface, then re-check exactness.
    thread::sleep(Duration::from_millis(200));
    assert_eq!(invocations.load(Ordering::SeqCst), 100);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn async_sends_preserve_fifo_per_actor() {
    let system = ActorSystem::new();

    let order = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&order);
    let actor = Actor::new(Quiet);
    actor.register_handler(move |_, _, msg: &u64| {
        sink.lock().push(*msg);
    });
    system.register("fifo", actor).unwrap();

    for n in 0..50u64 {
        assert!(system.send_async("producer", "fifo", Arc::new(n)));
    }

    assert!(wait_until(Duration::from_secs(10), || order.lock().len() == 50));
    let seen = order.lock();
    assert_eq!(seen.as_slice(), (0..50).collect::<Vec<_>>().as_slice());
}

#[test]
fn unknown_receiver_never_invokes_anything() {
    let system = ActorSystem::new();

    let invocations = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&invocations);
    let actor = Actor::new(Quiet);
    actor.register_handler(move |_, _, _msg: &String| {
        hits.fetch_add(1, Ordering::SeqCst);
    });
    system.register("present", actor).unwrap();

    assert!(!system.send_async("x", "absent", Arc::new("lost".to_string())));
    assert!(!system.send_sync_predatory("absent", "x", Arc::new("lost".to_string())));
    assert!(!system.send_sync_orderly("absent", "x", Arc::new("lost".to_string())));

    thread::sleep(Duration::from_millis(100));
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[test]
fn orderly_send_observes_handler_mutation() {
    struct Callback {
        request: String,
        response: Mutex<Option<String>>,
    }

    let system = ActorSystem::new();

    let receiver = Actor::new(Quiet);
    receiver.register_handler(|_, me: &Actor, msg: &Callback| {
        assert_eq!(msg.request, "x");
        let receiver_id = me.id().unwrap_or("<unknown>");
        *msg.response.lock() = Some(format!("ok from {receiver_id}"));
    });
    system.register("a", receiver).unwrap();
    system.register("b", Actor::new(Quiet)).unwrap();

    let payload = Arc::new(Callback {
        request: "x".to_string(),
        response: Mutex::new(None),
    });
    assert!(system.send_sync_orderly("a", "b", payload.clone()));

    assert_eq!(payload.response.lock().as_deref(), Some("ok from a"));
}

#[test]
fn orderly_send_unblocks_even_when_the_handler_panics() {
    let system = ActorSystem::new();

    let actor = Actor::new(Quiet);
    actor.register_handler(|_, _, _msg: &String| panic!("handler exploded"));
    system.register("a", actor).unwrap();

    let start = Instant::now();
    assert!(system.send_sync_orderly("a", "b", Arc::new("x".to_string())));
    assert!(start.elapsed() < Duration::from_secs(10));

    // The actor is not left wedged: a later message still goes through.
    let after = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&after);
    let target = system.get_actor("a").unwrap();
    target.register_handler(move |_, _, _msg: &u8| {
        hits.fetch_add(1, Ordering::SeqCst);
    });
    assert!(system.send_async("b", "a", Arc::new(1u8)));
    assert!(wait_until(Duration::from_secs(5), || {
        after.load(Ordering::SeqCst) == 1
    }));
}

#[test]
fn predatory_send_runs_inline_and_survives_contention() {
    let system = ActorSystem::new();

    let invocations = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&invocations);
    let actor = Actor::new(Quiet);
    actor.register_handler(move |_, _, _msg: &String| {
        thread::sleep(Duration::from_millis(20));
        hits.fetch_add(1, Ordering::SeqCst);
    });
    system.register("busy", actor).unwrap();

    // Two callers fight for the same receiver; both must eventually win.
    let contenders: Vec<_> = (0..2)
        .map(|_| {
            let system = Arc::clone(&system);
            thread::spawn(move || {
                system.send_sync_predatory("busy", "caller", Arc::new("go".to_string()))
            })
        })
        .collect();
    for handle in contenders {
        assert!(handle.join().unwrap());
    }

    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[test]
fn predatory_send_preempts_queued_traffic() {
    let system = ActorSystem::new();

    let order = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&order);
    let actor = Actor::new(Quiet);
    actor.register_handler(move |_, _, msg: &String| {
        sink.lock().push(msg.clone());
    });
    system.register("mixed", Arc::clone(&actor)).unwrap();

    // Park envelopes in the mailbox without telling the scheduler, so the
    // queue is provably undrained when the predatory call arrives.
    for n in 0..3 {
        assert!(actor.enqueue("producer", Arc::new(format!("queued-{n}"))));
    }
    assert!(system.send_sync_predatory("mixed", "vip", Arc::new("stolen".to_string())));
    actor.drain_all();

    let seen = order.lock();
    assert_eq!(seen[0], "stolen");
    assert_eq!(seen.len(), 4);
}

#[test]
fn convenience_sends_use_the_actor_id_as_sender() {
    let system = ActorSystem::new();

    let senders = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&senders);
    let a = Actor::new(Quiet);
    a.register_handler(move |sender: Option<Arc<Actor>>, _, _msg: &String| {
        sink.lock()
            .push(sender.as_deref().and_then(Actor::id).map(str::to_string));
    });
    system.register("a", a).unwrap();

    let b = Actor::new(Quiet);
    system.register("b", Arc::clone(&b)).unwrap();

    assert!(b.send("a", Arc::new("via send".to_string())));
    assert!(b.talk_orderly("a", Arc::new("via orderly".to_string())));
    assert!(b.talk_predatory("a", Arc::new("via predatory".to_string())));

    assert!(wait_until(Duration::from_secs(5), || senders.lock().len() == 3));
    assert!(senders
        .lock()
        .iter()
        .all(|sender| sender.as_deref() == Some("b")));
}

#[test]
fn unregistered_actor_convenience_sends_fail() {
    let loner = Actor::new(Quiet);
    assert!(!loner.send("anyone", Arc::new(1u8)));
    assert!(!loner.talk_predatory("anyone", Arc::new(1u8)));
    assert!(!loner.talk_orderly("anyone", Arc::new(1u8)));

    assert_eq!(
        loner.try_send("anyone", Arc::new(1u8)),
        Err(SendError::SenderUnbound),
    );
    assert_eq!(
        loner.try_talk_predatory("anyone", Arc::new(1u8)),
        Err(SendError::SenderUnbound),
    );
    assert_eq!(
        loner.try_talk_orderly("anyone", Arc::new(1u8)),
        Err(SendError::SenderUnbound),
    );
}

#[test]
fn handler_replacement_routes_to_the_newest_handler() {
    let system = ActorSystem::new();

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let actor = Actor::new(Quiet);
    let hits = Arc::clone(&first);
    actor.register_handler(move |_, _, _msg: &String| {
        hits.fetch_add(1, Ordering::SeqCst);
    });
    let hits = Arc::clone(&second);
    actor.register_handler(move |_, _, _msg: &String| {
        hits.fetch_add(1, Ordering::SeqCst);
    });
    system.register("a", actor).unwrap();

    assert!(system.send_sync_orderly("a", "b", Arc::new("x".to_string())));

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn independent_systems_do_not_share_directories() {
    let one = ActorSystem::new();
    let two = ActorSystem::new();

    one.register("only-in-one", Actor::new(Quiet)).unwrap();

    assert!(one.get_actor("only-in-one").is_some());
    assert!(two.get_actor("only-in-one").is_none());
    assert!(!two.send_async("x", "only-in-one", Arc::new(1u8)));
}
