use super::*;
use logmsg::AckOutcome;
use std::sync::{Arc, Mutex};

struct CollectingPipe {
    received: Arc<Mutex<Vec<LogMessage>>>,
}

impl Pipe for CollectingPipe {
    fn init(&mut self, _ctx: &RuntimeContext) -> PipeResult<()> {
        Ok(())
    }

    fn deinit(&mut self) -> PipeResult<()> {
        Ok(())
    }

    fn queue(&mut self, msg: LogMessage, _path_options: PathOptions) -> PipeResult<()> {
        self.received.lock().unwrap().push(msg);
        Ok(())
    }

    fn notify(&mut self, _event: PipeEvent) {}

    fn clone_pipe(&self) -> Box<dyn Pipe> {
        Box::new(Self {
            received: Arc::clone(&self.received),
        })
    }
}

fn collecting_branch() -> (Box<dyn Pipe>, Arc<Mutex<Vec<LogMessage>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    (
        Box::new(CollectingPipe {
            received: Arc::clone(&received),
        }),
        received,
    )
}

#[test]
fn zero_branches_drops_the_message_without_error() {
    let mut mux = Multiplexer::new(Vec::new());
    let msg = LogMessage::new_internal(1, |_| {});
    mux.queue(msg, PathOptions::default()).unwrap();
}

#[test]
fn single_branch_receives_the_message_unmodified() {
    let (branch, received) = collecting_branch();
    let mut mux = Multiplexer::new(vec![branch]);
    let msg = LogMessage::new_internal(42, |_| {});
    mux.queue(msg, PathOptions { ack_needed: true }).unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].receipt_id(), 42);
}

#[test]
fn n_branches_each_receive_one_fork_of_the_message() {
    let (branch_a, received_a) = collecting_branch();
    let (branch_b, received_b) = collecting_branch();
    let (branch_c, received_c) = collecting_branch();
    let mut mux = Multiplexer::new(vec![branch_a, branch_b, branch_c]);

    let msg = LogMessage::new_internal(7, |_| {});
    mux.queue(msg, PathOptions { ack_needed: true }).unwrap();

    for received in [&received_a, &received_b, &received_c] {
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].receipt_id(), 7);
    }
}

#[test]
fn fan_out_ack_fires_once_after_every_branch_acks() {
    let completions = Arc::new(Mutex::new(Vec::new()));
    let completions_clone = Arc::clone(&completions);
    let msg = LogMessage::new_internal(1, move |outcome| {
        completions_clone.lock().unwrap().push(outcome);
    });

    let (branch_a, received_a) = collecting_branch();
    let (branch_b, received_b) = collecting_branch();
    let mut mux = Multiplexer::new(vec![branch_a, branch_b]);
    mux.queue(msg, PathOptions { ack_needed: true }).unwrap();

    let first = received_a.lock().unwrap().pop().unwrap();
    let second = received_b.lock().unwrap().pop().unwrap();
    assert!(completions.lock().unwrap().is_empty());

    first.ack(AckOutcome::Processed);
    assert!(completions.lock().unwrap().is_empty());
    second.ack(AckOutcome::Suspended);

    assert_eq!(*completions.lock().unwrap(), vec![AckOutcome::Suspended]);
}

#[test]
fn clone_pipe_produces_an_independent_branch_set() {
    let (branch, received) = collecting_branch();
    let mux = Multiplexer::new(vec![branch]);
    let mut cloned = mux.clone_pipe();

    let msg = LogMessage::new_internal(3, |_| {});
    cloned.queue(msg, PathOptions::default()).unwrap();
    assert_eq!(received.lock().unwrap().len(), 1);
}
