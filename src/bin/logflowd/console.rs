//! A destination transport over a [`logging_sink::Sink`], letting
//! `--console` forward to stdout through the same takeover-safe sink the
//! rest of the process already shares.

use flowcore::FlowError;
use logging_sink::Sink;
use pipeline::transport::{DeliveryOutcome, Transport};
use std::sync::Arc;

pub struct ConsoleEgress {
    sink: Arc<dyn Sink>,
}

impl ConsoleEgress {
    #[must_use]
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink }
    }
}

impl Transport for ConsoleEgress {
    async fn send(&mut self, payload: &[u8]) -> DeliveryOutcome {
        let line = String::from_utf8_lossy(payload);
        self.sink.write_line(&line);
        DeliveryOutcome::Success
    }

    async fn reconnect(&mut self) -> Result<(), FlowError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging_sink::VecSink;

    #[tokio::test]
    async fn send_writes_one_line_to_the_sink() {
        let sink = Arc::new(VecSink::new());
        let mut egress = ConsoleEgress::new(sink.clone());
        assert_eq!(egress.send(b"hello").await, DeliveryOutcome::Success);
        assert_eq!(sink.lines(), vec!["hello".to_owned()]);
    }
}
