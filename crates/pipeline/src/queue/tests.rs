use super::*;
use logmsg::AckOutcome;
use std::sync::Arc;
use std::time::Duration;

fn test_message(id: u64) -> LogMessage {
    LogMessage::new_internal(id, |_outcome| {})
}

#[test]
fn try_push_back_rejects_once_at_capacity() {
    let queue = Queue::new(1);
    queue.try_push_back(test_message(1)).unwrap();
    let err = queue.try_push_back(test_message(2)).unwrap_err();
    assert!(matches!(err, FlowError::QueueFull));
}

#[test]
fn push_front_bypasses_the_capacity_check() {
    let queue = Queue::new(1);
    queue.try_push_back(test_message(1)).unwrap();
    queue.push_front(test_message(2));
    assert_eq!(queue.len(), 2);
}

#[tokio::test]
async fn pop_front_returns_messages_in_fifo_order() {
    let queue = Queue::new(4);
    queue.try_push_back(test_message(1)).unwrap();
    queue.try_push_back(test_message(2)).unwrap();

    let first = queue.pop_front().await;
    let second = queue.pop_front().await;
    assert_eq!(first.receipt_id(), 1);
    assert_eq!(second.receipt_id(), 2);
    first.ack(AckOutcome::Processed);
    second.ack(AckOutcome::Processed);
}

#[tokio::test]
async fn pop_front_waits_for_a_message_pushed_from_another_task() {
    let queue = Arc::new(Queue::new(4));
    let producer = Arc::clone(&queue);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        producer.try_push_back(test_message(7)).unwrap();
    });

    let msg = queue.pop_front().await;
    assert_eq!(msg.receipt_id(), 7);
    msg.ack(AckOutcome::Processed);
    handle.await.unwrap();
}

#[test]
fn push_front_then_push_back_preserves_retry_ordering() {
    let queue = Queue::new(4);
    queue.try_push_back(test_message(1)).unwrap();
    queue.try_push_back(test_message(2)).unwrap();
    // Simulate: pop 1, delivery fails, requeue it ahead of 2.
    queue.push_front(test_message(1));
    assert_eq!(queue.len(), 3);
}

#[test]
fn queue_pipe_forwards_into_the_shared_queue() {
    let queue = Arc::new(Queue::new(2));
    let mut pipe = QueuePipe::new("primary", Arc::clone(&queue));
    pipe.queue(test_message(1), PathOptions { ack_needed: true }).unwrap();
    assert_eq!(queue.len(), 1);
}

#[test]
fn queue_pipe_clone_shares_the_same_underlying_queue() {
    let queue = Arc::new(Queue::new(2));
    let mut pipe = QueuePipe::new("primary", Arc::clone(&queue));
    let mut cloned = pipe.clone_pipe();
    cloned.queue(test_message(1), PathOptions { ack_needed: true }).unwrap();
    pipe.queue(test_message(2), PathOptions { ack_needed: true }).unwrap();
    assert_eq!(queue.len(), 2);
}
