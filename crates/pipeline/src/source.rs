//! The source worker: reads bytes off a transport, frames them per RFC
//! 6587, parses a syslog record, and queues it downstream — applying
//! window-counter backpressure along the way.

use crate::pipe::Pipe;
use bytes::BytesMut;
use flowcore::FlowError;
use flowctl::window::WindowCounter;
use logging::{log_surfaced_error, SurfacedError};
use logmsg::ack::PathOptions;
use logmsg::receipt::ReceiptIdAllocator;
use logmsg::value::{Handle, Value, ValueType};
use logmsg::{global_registry, AckRecord, LogMessage, MessageFlags};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::codec::Decoder;
use wireproto::framed::{Frame, FramedDecoder};
use wireproto::syslog::{parse_rfc3164, parse_rfc5424, ParsedMessage};

/// A source's ingress channel: fills `buf` with whatever bytes are ready,
/// returning the number read, or `0` at a clean EOF.
pub trait IngressTransport: Send {
    async fn read(&mut self, buf: &mut BytesMut) -> Result<usize, FlowError>;
}

/// How long to idle before re-checking `free_to_send` while the window is
/// suspended. There is no event-driven wakeup wired in this crate (that
/// belongs to the event loop integration in the daemon crate); this is a
/// polling fallback with a small, fixed cost.
const BACKPRESSURE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reads frames from one transport, parses each as a syslog message, and
/// queues it into a downstream pipe. Owns the window counter that tracks
/// how many messages are in flight for this source.
pub struct Source<T: IngressTransport> {
    name: String,
    transport: T,
    decoder: FramedDecoder,
    window: Arc<WindowCounter>,
    receipt_ids: ReceiptIdAllocator,
    buffer: BytesMut,
    fallback_host: Option<String>,
}

impl<T: IngressTransport> Source<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, transport: T, max_msg_size: usize, trim_large_messages: bool, initial_window: usize) -> Self {
        let window = Arc::new(WindowCounter::new());
        window.set(initial_window);
        Self {
            name: name.into(),
            transport,
            decoder: FramedDecoder::new(max_msg_size, trim_large_messages),
            window,
            receipt_ids: ReceiptIdAllocator::new(),
            buffer: BytesMut::with_capacity(8 * 1024),
            fallback_host: None,
        }
    }

    /// Sets the host to fill in, tagged [`MessageFlags::SIMPLE_HOSTNAME`],
    /// for any message whose body carries no explicit host field — e.g. a
    /// TCP acceptor's peer address or its reverse-DNS-resolved name.
    #[must_use]
    pub fn with_fallback_host(mut self, host: impl Into<String>) -> Self {
        self.fallback_host = Some(host.into());
        self
    }

    #[must_use]
    pub fn window(&self) -> &Arc<WindowCounter> {
        &self.window
    }

    /// Reads and dispatches messages until the transport hits EOF or
    /// cooperative shutdown is requested. Returns on a fatal transport
    /// error; a parse error on one frame only ever affects that frame.
    pub async fn run(&mut self, downstream: &mut dyn Pipe, shutdown: &AtomicBool) -> Result<(), FlowError> {
        loop {
            if shutdown.load(Ordering::Acquire) {
                return Ok(());
            }

            if !self.window.free_to_send() {
                tokio::time::sleep(BACKPRESSURE_POLL_INTERVAL).await;
                continue;
            }

            let read = self.transport.read(&mut self.buffer).await?;
            if read == 0 {
                return Ok(());
            }

            while let Some(frame) = self.decoder.decode(&mut self.buffer).map_err(|error| FlowError::Parse {
                detail: error.to_string(),
            })? {
                self.dispatch_frame(frame, downstream);
            }
        }
    }

    fn dispatch_frame(&mut self, frame: Frame, downstream: &mut dyn Pipe) {
        let (body, truncated) = match frame {
            Frame::Message(bytes) => (bytes, false),
            Frame::Trimmed(bytes) => (bytes, true),
        };

        self.window.sub(1);
        let receipt_id = self.receipt_ids.next();
        let window = Arc::clone(&self.window);
        let ack = AckRecord::new(move |_outcome| {
            window.add(1);
        });

        let msg = match Self::parse(&body) {
            Ok(parsed) => message_from_parsed(receipt_id, ack, parsed, truncated, self.fallback_host.as_deref()),
            Err(detail) => {
                log_surfaced_error(&SurfacedError {
                    source: &self.name,
                    error_kind: "ParseError",
                    detail: &detail,
                    fd: None,
                    bytes_processed: Some(body.len() as u64),
                });
                invalid_message(receipt_id, ack, &body, truncated)
            }
        };

        if let Err(error) = downstream.queue(msg, PathOptions { ack_needed: true }) {
            log_surfaced_error(&SurfacedError {
                source: &self.name,
                error_kind: error.error_kind(),
                detail: &error.to_string(),
                fd: None,
                bytes_processed: None,
            });
        }
    }

    fn parse(body: &[u8]) -> Result<ParsedMessage, String> {
        if let Ok(text) = std::str::from_utf8(body) {
            if let Ok(parsed) = parse_rfc5424(text) {
                return Ok(parsed);
            }
            match parse_rfc3164(text) {
                Ok(parsed) => return Ok(parsed),
                Err(error) => return Err(error.to_string()),
            }
        }
        Err("message body is not valid utf-8".to_owned())
    }
}

fn message_from_parsed(
    receipt_id: u64,
    ack: AckRecord,
    parsed: ParsedMessage,
    truncated: bool,
    fallback_host: Option<&str>,
) -> LogMessage {
    let mut msg = LogMessage::new_from_source(receipt_id, ack);
    {
        let mut handle = msg.make_writable();
        handle.set_pri(parsed.pri);
        let mut flags = MessageFlags::empty();
        if parsed.utf8_validated {
            flags.insert(MessageFlags::UTF8_VALID);
        }
        if parsed.syslog_protocol_parsed {
            flags.insert(MessageFlags::SYSLOG_PROTOCOL_PARSED);
        }
        if truncated {
            flags.insert(MessageFlags::TRUNCATED);
        }
        match parsed.host.as_deref().or(fallback_host) {
            Some(host) if parsed.host.is_none() => {
                flags.insert(MessageFlags::SIMPLE_HOSTNAME);
                handle.set_flags(flags);
                handle.set_handle(Handle::Host, Value::string(host));
            }
            Some(host) => {
                handle.set_flags(flags);
                handle.set_handle(Handle::Host, Value::string(host));
            }
            None => handle.set_flags(flags),
        }
        if let Some(timestamp) = parsed.timestamp {
            handle.set_timestamp_recv(timestamp);
            handle.set_timestamp_stamp(timestamp);
        }
        handle.set_handle(Handle::Message, Value::string(&parsed.message));
        if let Some(program) = &parsed.program {
            handle.set_handle(Handle::Program, Value::string(program));
        }
        if let Some(pid) = &parsed.pid {
            handle.set_handle(Handle::Pid, Value::string(pid));
        }
        if let Some(msgid) = &parsed.msgid {
            handle.set_handle(Handle::MessageId, Value::string(msgid));
        }
        for element in &parsed.structured_data {
            for (param, value) in &element.params {
                handle.set_value(&format!("{}.{param}", element.id), Value::string(value));
            }
        }
    }
    msg
}

/// Builds a message for a frame that failed to parse: forwarded to the
/// default pipeline tagged `.classifier.invalid` rather than dropped.
fn invalid_message(receipt_id: u64, ack: AckRecord, body: &[u8], truncated: bool) -> LogMessage {
    let mut msg = LogMessage::new_from_source(receipt_id, ack);
    {
        let mut handle = msg.make_writable();
        let mut flags = MessageFlags::empty();
        if truncated {
            flags.insert(MessageFlags::TRUNCATED);
        }
        handle.set_flags(flags);
        handle.set_handle(Handle::Message, Value::new(body.to_vec(), ValueType::String));
        let tag = global_registry().intern(".classifier.invalid");
        handle.tags_mut().set(tag);
    }
    msg
}

#[cfg(test)]
mod tests;
