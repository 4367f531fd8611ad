//! Behavioural tests for the receiver loop against in-memory doubles.

mod common;

use common::{DebugStringWriter, buffer_free};
use dbwin_events::{DBWIN_BUFFER_SIZE, DebugMessage};
use dbwin_mmap::SharedBuffer;
use dbwin_receiver::{Receiver, ReceiverConfig, ReceiverError, ReceiverState};
use dbwin_signal::{DataReady, MemoryEvent, ScriptedEvent, SignalError, Step, WaitOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(10);
const PATIENCE: Duration = Duration::from_secs(5);

fn config() -> ReceiverConfig {
    ReceiverConfig::default().with_poll_interval(POLL)
}

fn hello_world_view() -> SharedBuffer {
    let view = SharedBuffer::new(DBWIN_BUFFER_SIZE);
    let mut raw = vec![0xD2, 0x04, 0, 0];
    raw.extend_from_slice(b"Hello, World!\0");
    view.write_bytes(&raw);
    view
}

/// One signal, then stop: exactly one message and one acknowledgment.
#[test]
fn single_frame_is_delivered_and_acknowledged_once() {
    let buffer_ready = MemoryEvent::default();
    let data_ready = ScriptedEvent::new([Step::Signal]);

    let handle = Receiver::new(hello_world_view(), buffer_ready.clone(), data_ready.clone(), config())
        .unwrap()
        .start()
        .unwrap();

    let message = handle.messages().recv_timeout(PATIENCE).unwrap();
    assert_eq!(message, DebugMessage::new(1234, "Hello, World!"));

    let started = Instant::now();
    let stats = handle.stop().unwrap();
    assert!(started.elapsed() < PATIENCE);

    assert_eq!(buffer_ready.raise_count(), 1);
    assert!(data_ready.wait_count() >= 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.discarded, 0);
    assert_eq!(handle.state(), ReceiverState::Stopped);
    assert!(handle.messages().recv_timeout(POLL).is_err());
}

/// Never signaled, stopped right away: nothing delivered, nothing raised.
#[test]
fn idle_receiver_stops_without_touching_buffer_ready() {
    let buffer_ready = MemoryEvent::default();

    let handle = Receiver::new(
        SharedBuffer::new(DBWIN_BUFFER_SIZE),
        buffer_ready.clone(),
        ScriptedEvent::never(),
        config(),
    )
    .unwrap()
    .start()
    .unwrap();

    let stats = handle.stop().unwrap();
    assert_eq!(stats.delivered, 0);
    assert_eq!(buffer_ready.raise_count(), 0);
    assert_eq!(handle.iter().count(), 0);
}

/// Counts waits that begin once the test has announced a stop.
#[derive(Clone, Default)]
struct StopWatch {
    inner: ScriptedEvent,
    armed: Arc<AtomicBool>,
    waits_after_stop: Arc<AtomicU64>,
}

impl DataReady for StopWatch {
    fn wait(&self, timeout: Duration) -> Result<WaitOutcome, SignalError> {
        if self.armed.load(Ordering::SeqCst) {
            self.waits_after_stop.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.wait(timeout)
    }
}

/// Once stop is requested, only the wait already in flight (plus one begun
/// while the request was being sent) runs to completion.
#[test]
fn stop_latency_is_bounded_by_one_poll() {
    let poll = Duration::from_millis(250);
    let data_ready = StopWatch::default();

    let handle = Receiver::new(
        SharedBuffer::new(DBWIN_BUFFER_SIZE),
        MemoryEvent::default(),
        data_ready.clone(),
        config().with_poll_interval(poll),
    )
    .unwrap()
    .start()
    .unwrap();

    data_ready.armed.store(true, Ordering::SeqCst);
    let stats = handle.stop().unwrap();
    let waits_at_stop = data_ready.inner.wait_count();

    assert!(
        data_ready.waits_after_stop.load(Ordering::SeqCst) <= 1,
        "loop kept waiting after stop"
    );
    assert_eq!(stats.timeouts, waits_at_stop);
    assert_eq!(handle.state(), ReceiverState::Stopped);
}

#[test]
fn stop_is_idempotent() {
    let handle = Receiver::new(
        SharedBuffer::new(DBWIN_BUFFER_SIZE),
        MemoryEvent::default(),
        ScriptedEvent::never(),
        config(),
    )
    .unwrap()
    .start()
    .unwrap();

    let first = handle.stop();
    let second = handle.stop();
    assert!(first.is_ok());
    assert_eq!(first, second);
}

#[test]
fn concurrent_stops_share_one_completion() {
    let handle = Arc::new(
        Receiver::new(
            SharedBuffer::new(DBWIN_BUFFER_SIZE),
            MemoryEvent::default(),
            ScriptedEvent::never(),
            config(),
        )
        .unwrap()
        .start()
        .unwrap(),
    );

    let stoppers: Vec<_> = (0..4)
        .map(|_| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.stop())
        })
        .collect();

    let outcomes: Vec<_> = stoppers.into_iter().map(|t| t.join().unwrap()).collect();
    assert!(outcomes.iter().all(|o| o == &outcomes[0]));
    assert!(outcomes[0].is_ok());
    assert_eq!(handle.state(), ReceiverState::Stopped);
}

/// Messages come out in the order the writer produced them, none dropped.
#[test]
fn sequential_writes_are_delivered_in_order() {
    const COUNT: u32 = 200;

    let view = SharedBuffer::new(DBWIN_BUFFER_SIZE);
    let buffer_ready = buffer_free();
    let data_ready = MemoryEvent::default();

    let handle = Receiver::new(view.clone(), buffer_ready.clone(), data_ready.clone(), config())
        .unwrap()
        .start()
        .unwrap();

    let mut writer = DebugStringWriter {
        buffer_ready: buffer_ready.clone(),
        data_ready,
        write: move |msg: &DebugMessage| {
            view.write_frame(msg).unwrap();
        },
    };
    let producer = thread::spawn(move || {
        for i in 0..COUNT {
            let msg = DebugMessage::new(i, format!("message #{i}"));
            assert!(writer.send(&msg, PATIENCE), "reader never freed the buffer");
        }
    });

    let received: Vec<_> = handle
        .messages()
        .iter()
        .take(COUNT as usize)
        .collect();
    producer.join().unwrap();
    let stats = handle.stop().unwrap();

    let expected: Vec<_> = (0..COUNT)
        .map(|i| DebugMessage::new(i, format!("message #{i}")))
        .collect();
    assert_eq!(received, expected);
    assert_eq!(stats.delivered, u64::from(COUNT));
    // The initial free state was consumed by the first write; every frame
    // was then acknowledged once.
    assert_eq!(buffer_ready.raise_count(), u64::from(COUNT));
}

/// A slow consumer holds back the next writer.
#[test]
fn delivery_backpressure_delays_acknowledgment() {
    let view = hello_world_view();
    let buffer_ready = MemoryEvent::default();

    let handle = Receiver::new(view, buffer_ready.clone(), ScriptedEvent::new([Step::Signal]), config())
        .unwrap()
        .start()
        .unwrap();

    thread::sleep(POLL * 5);
    assert_eq!(buffer_ready.raise_count(), 0, "acknowledged before delivery");

    handle.messages().recv_timeout(PATIENCE).unwrap();
    let deadline = Instant::now() + PATIENCE;
    while buffer_ready.raise_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(buffer_ready.raise_count(), 1);
    handle.stop().unwrap();
}

/// Stopping while delivery is blocked still acknowledges the frame.
#[test]
fn stop_during_blocked_delivery_acknowledges_frame() {
    let buffer_ready = MemoryEvent::default();

    let handle = Receiver::new(
        hello_world_view(),
        buffer_ready.clone(),
        ScriptedEvent::new([Step::Signal]),
        config(),
    )
    .unwrap()
    .start()
    .unwrap();

    // Give the loop time to block on the rendezvous send.
    thread::sleep(POLL * 5);
    let stats = handle.stop().unwrap();

    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.discarded, 1);
    assert_eq!(buffer_ready.raise_count(), 1);
    assert!(handle.messages().try_recv().is_err());
}

#[test]
fn wait_failure_ends_loop_and_is_reported() {
    let buffer_ready = MemoryEvent::default();
    let data_ready = ScriptedEvent::new([Step::Timeout, Step::Fail(SignalError::Abandoned)]);

    let handle = Receiver::new(hello_world_view(), buffer_ready.clone(), data_ready, config())
        .unwrap()
        .start()
        .unwrap();

    // The channel disconnects once the loop gives up.
    assert_eq!(handle.iter().count(), 0);
    assert_eq!(
        handle.last_error(),
        Some(ReceiverError::Signal(SignalError::Abandoned))
    );
    assert!(handle.is_finished());
    assert_eq!(
        handle.stop(),
        Err(ReceiverError::Signal(SignalError::Abandoned))
    );
    assert_eq!(buffer_ready.raise_count(), 0);
}

#[test]
fn closed_data_ready_stops_a_running_receiver() {
    let data_ready = MemoryEvent::default();

    let handle = Receiver::new(
        SharedBuffer::new(DBWIN_BUFFER_SIZE),
        MemoryEvent::default(),
        data_ready.clone(),
        config(),
    )
    .unwrap()
    .start()
    .unwrap();

    assert_eq!(handle.last_error(), None);
    data_ready.close();

    assert!(handle.messages().recv_timeout(PATIENCE).is_err());
    assert_eq!(
        handle.stop(),
        Err(ReceiverError::Signal(SignalError::Closed))
    );
}

#[test]
fn dropping_handle_stops_and_acknowledges() {
    let buffer_ready = MemoryEvent::default();
    let data_ready = ScriptedEvent::new([Step::Signal]);

    let handle = Receiver::new(hello_world_view(), buffer_ready.clone(), data_ready, config())
        .unwrap()
        .start()
        .unwrap();

    // Nobody reads; dropping the handle stops the receiver mid-delivery.
    drop(handle);
    assert_eq!(buffer_ready.raise_count(), 1);
}

#[test]
fn buffered_channel_lets_loop_run_ahead() {
    let view = hello_world_view();
    let buffer_ready = MemoryEvent::default();

    let handle = Receiver::new(
        view,
        buffer_ready.clone(),
        ScriptedEvent::new([Step::Signal, Step::Signal, Step::Signal]),
        config().with_channel_capacity(8),
    )
    .unwrap()
    .start()
    .unwrap();

    let deadline = Instant::now() + PATIENCE;
    while buffer_ready.raise_count() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    let stats = handle.stop().unwrap();
    assert_eq!(stats.delivered, 3);
    assert_eq!(handle.iter().count(), 3);
}
