use super::*;
use crate::pipe::{PipeEvent, PipeResult};
use flowcore::RuntimeContext;
use std::sync::Mutex;

struct ScriptedTransport {
    chunks: Mutex<std::collections::VecDeque<Vec<u8>>>,
}

impl ScriptedTransport {
    fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: Mutex::new(chunks.into()),
        }
    }
}

impl IngressTransport for ScriptedTransport {
    async fn read(&mut self, buf: &mut BytesMut) -> Result<usize, FlowError> {
        match self.chunks.lock().unwrap().pop_front() {
            Some(chunk) => {
                buf.extend_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => Ok(0),
        }
    }
}

struct CollectingPipe {
    received: Vec<LogMessage>,
}

impl Pipe for CollectingPipe {
    fn init(&mut self, _ctx: &RuntimeContext) -> PipeResult<()> {
        Ok(())
    }
    fn deinit(&mut self) -> PipeResult<()> {
        Ok(())
    }
    fn queue(&mut self, msg: LogMessage, _path_options: PathOptions) -> PipeResult<()> {
        self.received.push(msg);
        Ok(())
    }
    fn notify(&mut self, _event: PipeEvent) {}
    fn clone_pipe(&self) -> Box<dyn Pipe> {
        unimplemented!("not exercised in these tests")
    }
}

#[tokio::test]
async fn emits_both_frames_in_order_and_tags_unparseable_bodies() {
    let transport = ScriptedTransport::new(vec![b"11 hello world4 foo\n".to_vec()]);
    let mut source = Source::new("test-source", transport, 1024, false, 10);
    let mut downstream = CollectingPipe { received: Vec::new() };
    let shutdown = AtomicBool::new(false);

    source.run(&mut downstream, &shutdown).await.unwrap();

    assert_eq!(downstream.received.len(), 2);
    assert_eq!(downstream.received[0].get_handle(Handle::Message).unwrap().as_str(), Some("hello world"));
    assert_eq!(downstream.received[1].get_handle(Handle::Message).unwrap().as_str(), Some("foo\n"));
    let tag = global_registry().intern(".classifier.invalid");
    assert!(downstream.received[0].tags().is_set(tag));
}

#[tokio::test]
async fn each_frame_decrements_the_window_and_acking_restores_it() {
    let transport = ScriptedTransport::new(vec![b"5 hello".to_vec()]);
    let mut source = Source::new("test-source", transport, 1024, false, 10);
    let window = Arc::clone(source.window());
    let mut downstream = CollectingPipe { received: Vec::new() };
    let shutdown = AtomicBool::new(false);

    source.run(&mut downstream, &shutdown).await.unwrap();
    assert_eq!(window.get(), (9, false));

    let msg = downstream.received.pop().unwrap();
    msg.ack(logmsg::AckOutcome::Processed);
    assert_eq!(window.get(), (10, false));
}

#[tokio::test]
async fn eof_ends_the_run_loop_cleanly() {
    let transport = ScriptedTransport::new(Vec::new());
    let mut source = Source::new("test-source", transport, 1024, false, 10);
    let mut downstream = CollectingPipe { received: Vec::new() };
    let shutdown = AtomicBool::new(false);

    source.run(&mut downstream, &shutdown).await.unwrap();
    assert!(downstream.received.is_empty());
}

#[tokio::test]
async fn fallback_host_fills_in_a_missing_host_and_is_flagged_simple() {
    // RFC 5424 body with a nil ("-") HOSTNAME field.
    let transport = ScriptedTransport::new(vec![b"20 <13>1 - - - - - - hi".to_vec()]);
    let mut source = Source::new("test-source", transport, 1024, false, 10).with_fallback_host("10.0.0.5");
    let mut downstream = CollectingPipe { received: Vec::new() };
    let shutdown = AtomicBool::new(false);

    source.run(&mut downstream, &shutdown).await.unwrap();

    assert_eq!(downstream.received.len(), 1);
    let msg = &downstream.received[0];
    assert_eq!(msg.get_handle(Handle::Host).and_then(Value::as_str), Some("10.0.0.5"));
    assert!(msg.flags().contains(logmsg::MessageFlags::SIMPLE_HOSTNAME));
}
