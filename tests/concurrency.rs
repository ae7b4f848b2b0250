// tests/concurrency.rs

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use procmux::termination::{Interrupt, InterruptHandler, TerminationCoordinator};
use procmux_test_utils::{CaptureBuffer, capture_router, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_request_stop_fires_exactly_once() -> TestResult {
    init_tracing();
    let (_tx, rx) = mpsc::channel::<Interrupt>(1);
    let coordinator = TerminationCoordinator::with_source(rx, None);
    let fired = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(tokio::sync::Barrier::new(32));

    let mut handles = Vec::new();
    for _ in 0..32 {
        let requester = coordinator.stop_requester();
        let fired = Arc::clone(&fired);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            if requester.request_stop() {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for h in handles {
        h.await?;
    }

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(coordinator.signals().is_stopped());
    assert!(!coordinator.signals().is_forced());
    assert!(!coordinator.request_stop());
    with_timeout(coordinator.shutdown()).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_waiter_observes_the_stop() -> TestResult {
    init_tracing();
    let (_tx, rx) = mpsc::channel::<Interrupt>(1);
    let coordinator = TerminationCoordinator::with_source(rx, None);

    let mut waiters = Vec::new();
    for _ in 0..16 {
        let signals = coordinator.signals();
        waiters.push(tokio::spawn(async move { signals.stopped().await }));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    coordinator.request_stop();

    for w in waiters {
        with_timeout(w).await?;
    }
    with_timeout(coordinator.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn handler_sees_first_then_immediate_interrupt() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::channel(4);
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: InterruptHandler = Arc::new(move |sig: Interrupt, immediate: bool| {
        sink.lock().unwrap().push((sig, immediate));
    });
    let coordinator = TerminationCoordinator::with_source(rx, Some(handler));

    tx.send(Interrupt::Terminate).await?;
    with_timeout(coordinator.signals().stopped()).await;
    tx.send(Interrupt::Interrupt).await?;
    with_timeout(coordinator.signals().forced()).await;
    with_timeout(coordinator.shutdown()).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(Interrupt::Terminate, false), (Interrupt::Interrupt, true)]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn console_join_counter_waits_for_last_done() -> TestResult {
    init_tracing();
    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let router = capture_router(&out, &err);

    for _ in 0..5 {
        router.add();
    }
    let waiter = {
        let router = router.clone();
        tokio::spawn(async move { router.wait().await })
    };

    for _ in 0..4 {
        router.done();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
    }
    router.done();
    with_timeout(waiter).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lines_never_tear() -> TestResult {
    init_tracing();
    let out = CaptureBuffer::new();
    let err = CaptureBuffer::new();
    let router = capture_router(&out, &err);

    let mut producers = Vec::new();
    for p in 0..8 {
        let writer = router.line_writer(&format!("p{p}"), None, &format!("[p{p}] "));
        let guard = router.track();
        producers.push(tokio::spawn(async move {
            let _guard = guard;
            for i in 0..200 {
                writer(&format!("line {i} {}", "x".repeat(64)));
                if i % 50 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    with_timeout(router.wait()).await;
    for p in producers {
        p.await?;
    }

    let lines = out.lines();
    assert_eq!(lines.len(), 8 * 200);
    for line in lines {
        assert!(line.starts_with("[p"), "torn line: {line}");
        assert!(line.ends_with(&"x".repeat(64)), "torn line: {line}");
    }
    Ok(())
}
