//! Frame queue between the capture callback and the file writer
//!
//! Unbounded single-producer/single-consumer FIFO. `push` never blocks, so
//! it is safe to call from the hardware callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::domain::recording::AudioFrame;

/// Result of a pop attempt
#[derive(Debug, PartialEq, Eq)]
pub enum Pop {
    /// The next frame in capture order
    Frame(AudioFrame),
    /// Nothing arrived within the timeout
    Empty,
    /// The producer is gone and every queued frame has been taken
    Disconnected,
}

/// Counters shared by both ends of a queue
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pushed: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

impl QueueStats {
    /// Frames accepted by the queue
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Frames pushed after the consumer had gone away
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Sending half, owned by the capture callback
pub struct FrameProducer {
    tx: Sender<AudioFrame>,
    stats: QueueStats,
}

/// Receiving half, owned by the writer thread
pub struct FrameConsumer {
    rx: Receiver<AudioFrame>,
}

/// Create a connected producer/consumer pair
pub fn frame_queue() -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (
        FrameProducer {
            tx,
            stats: QueueStats::default(),
        },
        FrameConsumer { rx },
    )
}

impl FrameProducer {
    /// Enqueue a frame without blocking.
    ///
    /// Returns `false` if the consumer has already gone away; the frame is
    /// then counted in [`QueueStats::rejected`].
    pub fn push(&self, frame: AudioFrame) -> bool {
        match self.tx.send(frame) {
            Ok(()) => {
                self.stats.pushed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Shared counters for this queue
    pub fn stats(&self) -> QueueStats {
        self.stats.clone()
    }
}

impl FrameConsumer {
    /// Wait up to `timeout` for the next frame
    pub fn pop(&self, timeout: StdDuration) -> Pop {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Pop::Frame(frame),
            Err(RecvTimeoutError::Timeout) => Pop::Empty,
            Err(RecvTimeoutError::Disconnected) => Pop::Disconnected,
        }
    }

    /// Take the next frame if one is already queued
    pub fn try_pop(&self) -> Pop {
        match self.rx.try_recv() {
            Ok(frame) => Pop::Frame(frame),
            Err(TryRecvError::Empty) => Pop::Empty,
            Err(TryRecvError::Disconnected) => Pop::Disconnected,
        }
    }

    /// Frames currently queued
    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: i16) -> AudioFrame {
        AudioFrame::new(vec![n, n], 1)
    }

    #[test]
    fn preserves_push_order() {
        let (producer, consumer) = frame_queue();
        for n in 0..100 {
            assert!(producer.push(frame(n)));
        }
        for n in 0..100 {
            assert_eq!(consumer.try_pop(), Pop::Frame(frame(n)));
        }
        assert_eq!(consumer.try_pop(), Pop::Empty);
        assert_eq!(producer.stats().pushed(), 100);
    }

    #[test]
    fn pop_times_out_when_empty() {
        let (_producer, consumer) = frame_queue();
        let start = std::time::Instant::now();
        assert_eq!(consumer.pop(StdDuration::from_millis(20)), Pop::Empty);
        assert!(start.elapsed() >= StdDuration::from_millis(20));
    }

    #[test]
    fn queued_frames_survive_producer_drop() {
        let (producer, consumer) = frame_queue();
        producer.push(frame(1));
        producer.push(frame(2));
        drop(producer);

        assert_eq!(consumer.pop(StdDuration::from_millis(10)), Pop::Frame(frame(1)));
        assert_eq!(consumer.try_pop(), Pop::Frame(frame(2)));
        assert_eq!(consumer.try_pop(), Pop::Disconnected);
        assert_eq!(consumer.pop(StdDuration::from_millis(10)), Pop::Disconnected);
    }

    #[test]
    fn push_after_consumer_drop_is_counted() {
        let (producer, consumer) = frame_queue();
        let stats = producer.stats();
        drop(consumer);

        assert!(!producer.push(frame(1)));
        assert_eq!(stats.rejected(), 1);
        assert_eq!(stats.pushed(), 0);
    }

    #[test]
    fn works_across_threads() {
        let (producer, consumer) = frame_queue();
        let handle = std::thread::spawn(move || {
            for n in 0..500 {
                producer.push(frame(n));
            }
        });

        let mut next = 0;
        loop {
            match consumer.pop(StdDuration::from_millis(100)) {
                Pop::Frame(f) => {
                    assert_eq!(f, frame(next));
                    next += 1;
                }
                Pop::Empty => continue,
                Pop::Disconnected => break,
            }
        }
        handle.join().unwrap();
        assert_eq!(next, 500);
    }
}
