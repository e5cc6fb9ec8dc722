//! Sink queue tests

use std::sync::Arc;
use std::time::Duration;

use super::*;

#[test]
fn test_offer_within_capacity() {
    let queue = SinkQueue::new(2);
    assert!(queue.offer(1));
    assert!(queue.offer(2));
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_overflow_drops_the_head() {
    let queue = SinkQueue::new(2);
    assert!(queue.offer(1));
    assert!(queue.offer(2));
    // full: the oldest item makes way for the newest
    assert!(!queue.offer(3));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.try_dequeue(), Some(2));
    assert_eq!(queue.try_dequeue(), Some(3));
}

#[test]
fn test_zero_capacity_clamps_to_one() {
    let queue = SinkQueue::new(0);
    assert!(queue.offer(1));
    assert!(!queue.offer(2));
    assert_eq!(queue.try_dequeue(), Some(2));
}

#[test]
fn test_drop_accounting_invariant() {
    // submitted = delivered + in_queue + dropped, for any interleaving
    let queue = SinkQueue::new(1);
    let mut dropped = 0;
    let mut delivered = 0;
    for i in 0..10 {
        if !queue.offer(i) {
            dropped += 1;
        }
        if i % 3 == 0 && queue.try_dequeue().is_some() {
            delivered += 1;
        }
    }
    assert_eq!(10, delivered + queue.len() + dropped);
}

#[tokio::test]
async fn test_dequeue_waits_for_offer() {
    let queue = Arc::new(SinkQueue::new(1));
    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.dequeue().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    queue.offer(42);
    assert_eq!(consumer.await.unwrap(), Some(42));
}

#[tokio::test]
async fn test_dequeue_returns_none_after_close() {
    let queue: SinkQueue<u32> = SinkQueue::new(1);
    queue.offer(7);
    queue.close();
    // pending items drain first
    assert_eq!(queue.dequeue().await, Some(7));
    assert_eq!(queue.dequeue().await, None);
}

#[tokio::test]
async fn test_close_wakes_a_parked_consumer() {
    let queue: Arc<SinkQueue<u32>> = Arc::new(SinkQueue::new(1));
    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.dequeue().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    queue.close();
    assert_eq!(consumer.await.unwrap(), None);
}

#[tokio::test]
async fn test_offer_wait_succeeds_when_space_frees() {
    let queue = Arc::new(SinkQueue::new(1));
    assert!(queue.offer(1));

    let producer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.offer_wait(2, Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(queue.try_dequeue(), Some(1));

    assert!(producer.await.unwrap());
    assert_eq!(queue.try_dequeue(), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_offer_wait_times_out_when_full() {
    let queue = SinkQueue::new(1);
    assert!(queue.offer(1));
    assert!(!queue.offer_wait(2, Duration::from_millis(50)).await);
    // nothing was discarded
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_offer_after_close_is_rejected() {
    let queue = SinkQueue::new(1);
    queue.close();
    assert!(!queue.offer(1));
    assert!(!queue.offer_wait(2, Duration::from_millis(10)).await);
}

#[tokio::test]
async fn test_fifo_order_without_overflow() {
    let queue = SinkQueue::new(4);
    for i in 0..4 {
        queue.offer(i);
    }
    for i in 0..4 {
        assert_eq!(queue.dequeue().await, Some(i));
    }
}
