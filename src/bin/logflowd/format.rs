//! Turns an accepted [`LogMessage`] back into bytes for a destination.
//!
//! RFC 6587 framing belongs to the wire, not the message: a TCP
//! destination needs the `"<len> "` octet-count prefix on every line, a
//! UDP destination must not have one (the datagram boundary already is
//! the frame), and the console sink just wants one readable line. All
//! three share the same RFC 5424 rendering underneath.

use logmsg::value::Handle;
use logmsg::{LogMessage, Timestamp};
use time::OffsetDateTime;

fn field<'a>(msg: &'a LogMessage, handle: Handle) -> &'a str {
    msg.get_handle(handle).and_then(logmsg::value::Value::as_str).unwrap_or("-")
}

fn render_timestamp(timestamp: Timestamp) -> String {
    if !timestamp.is_set() {
        return "-".to_owned();
    }
    let nanos = i128::from(timestamp.seconds) * 1_000_000_000 + i128::from(timestamp.microseconds) * 1_000;
    match OffsetDateTime::from_unix_timestamp_nanos(nanos) {
        Ok(datetime) => datetime
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "-".to_owned()),
        Err(_) => "-".to_owned(),
    }
}

/// Renders one RFC 5424 line with no trailing framing of any kind.
#[must_use]
pub fn render_rfc5424(msg: &LogMessage) -> String {
    let pri = msg.pri();
    let timestamp = render_timestamp(msg.timestamp_stamp());
    let host = field(msg, Handle::Host);
    let program = field(msg, Handle::Program);
    let pid = field(msg, Handle::Pid);
    let msgid = field(msg, Handle::MessageId);
    let message = field(msg, Handle::Message);
    format!("<{pri}>1 {timestamp} {host} {program} {pid} {msgid} - {message}")
}

/// RFC 6587 octet-counted framing over [`render_rfc5424`], for a TCP
/// destination whose peer needs an explicit length prefix per message.
#[must_use]
pub fn render_framed(msg: &LogMessage) -> Vec<u8> {
    let line = render_rfc5424(msg);
    format!("{} {line}", line.len()).into_bytes()
}

/// Bare RFC 5424 bytes with no framing, for a UDP destination where the
/// datagram boundary already marks the message boundary.
#[must_use]
pub fn render_unframed(msg: &LogMessage) -> Vec<u8> {
    render_rfc5424(msg).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmsg::ack::AckRecord;
    use logmsg::value::Value;

    fn test_message() -> LogMessage {
        let mut msg = LogMessage::new_from_source(1, AckRecord::new(|_| {}));
        {
            let mut handle = msg.make_writable();
            handle.set_pri(14);
            handle.set_handle(Handle::Host, Value::string("web-1"));
            handle.set_handle(Handle::Program, Value::string("sshd"));
            handle.set_handle(Handle::Message, Value::string("login accepted"));
        }
        msg
    }

    #[test]
    fn unframed_rendering_has_no_length_prefix() {
        let line = render_rfc5424(&test_message());
        assert!(line.starts_with("<14>1 "));
        assert!(line.ends_with("login accepted"));
    }

    #[test]
    fn framed_rendering_prefixes_the_exact_byte_length() {
        let framed = render_framed(&test_message());
        let text = std::str::from_utf8(&framed).unwrap();
        let (len_token, rest) = text.split_once(' ').unwrap();
        let declared_len: usize = len_token.parse().unwrap();
        assert_eq!(declared_len, rest.len());
    }

    #[test]
    fn a_field_with_no_value_renders_as_a_nil_dash() {
        let msg = LogMessage::new_from_source(1, AckRecord::new(|_| {}));
        let line = render_rfc5424(&msg);
        assert!(line.contains(" - - - - - "));
    }
}
