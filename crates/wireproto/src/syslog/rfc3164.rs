//! RFC 3164 (legacy BSD syslog) parsing: `<PRI>TIMESTAMP HOSTNAME TAG[PID]:
//! MSG`, with liberal timestamp acceptance across three historically-seen
//! shapes: the classic 3-letter-month stamp, ISO 8601, and raw Unix time.

use super::ParsedMessage;
use logmsg::Timestamp;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum Rfc3164Error {
    #[error("message does not start with '<'")]
    MissingPriStart,
    #[error("PRI value is not terminated by '>'")]
    UnterminatedPri,
    #[error("PRI value out of range 0..=191")]
    PriOutOfRange,
    #[error("message is missing a TAG before ':'")]
    MissingTag,
}

fn parse_timestamp(token: &str) -> Option<Timestamp> {
    let classic = format_description!("[month repr:short] [day padding:space] [hour]:[minute]:[second]");
    if let Ok(parsed) = time::PrimitiveDateTime::parse(token, &classic) {
        let now_year = time::OffsetDateTime::now_utc().year();
        let with_year = parsed.replace_year(now_year).unwrap_or(parsed);
        return Some(Timestamp {
            seconds: with_year.assume_utc().unix_timestamp(),
            microseconds: 0,
            gmt_offset_seconds: 0,
        });
    }
    if let Ok(parsed) = time::OffsetDateTime::parse(token, &Rfc3339) {
        return Some(Timestamp {
            seconds: parsed.unix_timestamp(),
            microseconds: parsed.nanosecond() / 1_000,
            gmt_offset_seconds: parsed.offset().whole_seconds(),
        });
    }
    if let Ok(seconds) = token.parse::<i64>() {
        return Some(Timestamp {
            seconds,
            microseconds: 0,
            gmt_offset_seconds: 0,
        });
    }
    None
}

/// Splits `"TAG[PID]: MSG"` (or `"TAG: MSG"` with no pid) into its parts.
fn split_tag(rest: &str) -> Option<(&str, Option<&str>, &str)> {
    let colon_at = rest.find(':')?;
    let header = &rest[..colon_at];
    let msg = rest[colon_at + 1..].strip_prefix(' ').unwrap_or(&rest[colon_at + 1..]);
    if let Some(bracket_at) = header.find('[') {
        let tag = &header[..bracket_at];
        let pid = header[bracket_at + 1..].strip_suffix(']')?;
        Some((tag, Some(pid), msg))
    } else {
        Some((header, None, msg))
    }
}

/// Parses one RFC 3164 message.
pub fn parse_rfc3164(input: &[u8]) -> Result<ParsedMessage, Rfc3164Error> {
    let utf8_validated = std::str::from_utf8(input).is_ok();
    let text = String::from_utf8_lossy(input);
    let mut rest = text.as_ref();

    rest = rest.strip_prefix('<').ok_or(Rfc3164Error::MissingPriStart)?;
    let pri_end = rest.find('>').ok_or(Rfc3164Error::UnterminatedPri)?;
    let pri: u16 = rest[..pri_end]
        .parse()
        .map_err(|_| Rfc3164Error::PriOutOfRange)?;
    if pri > 191 {
        return Err(Rfc3164Error::PriOutOfRange);
    }
    rest = &rest[pri_end + 1..];

    // The classic timestamp is fixed-width ("Mmm dd hh:mm:ss", 15 bytes);
    // an ISO 8601 or Unix-time stamp is whatever precedes the next space
    // that isn't inside the timestamp itself. Liberal acceptance means we
    // just try the fixed-width slice first and fall back to token scanning.
    let (timestamp, after_timestamp) = if rest.len() >= 15 && rest.as_bytes()[3] == b' ' {
        let (candidate, remainder) = rest.split_at(15);
        (parse_timestamp(candidate), remainder)
    } else {
        (None, rest)
    };
    let (timestamp, after_timestamp) = match timestamp {
        Some(_) => (timestamp, after_timestamp),
        None => match after_timestamp.find(' ') {
            Some(at) => (parse_timestamp(&after_timestamp[..at]), &after_timestamp[at..]),
            None => (None, after_timestamp),
        },
    };
    rest = after_timestamp.strip_prefix(' ').unwrap_or(after_timestamp);

    let host_end = rest.find(' ').unwrap_or(rest.len());
    let host = rest[..host_end].to_string();
    rest = rest[host_end..].strip_prefix(' ').unwrap_or(&rest[host_end..]);

    let (program, pid, message) = split_tag(rest).ok_or(Rfc3164Error::MissingTag)?;

    Ok(ParsedMessage {
        pri: u8::try_from(pri).unwrap_or(u8::MAX),
        timestamp,
        host: Some(host),
        program: Some(program.to_string()),
        pid: pid.map(str::to_string),
        msgid: None,
        structured_data: Vec::new(),
        message: message.to_string(),
        utf8_validated,
        syslog_protocol_parsed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_classic_bsd_message() {
        let parsed = parse_rfc3164(b"<34>Oct 11 22:14:15 mymachine su[1234]: 'su root' failed").unwrap();
        assert_eq!(parsed.pri, 34);
        assert_eq!(parsed.host.as_deref(), Some("mymachine"));
        assert_eq!(parsed.program.as_deref(), Some("su"));
        assert_eq!(parsed.pid.as_deref(), Some("1234"));
        assert_eq!(parsed.message, "'su root' failed");
        assert!(parsed.timestamp.is_some());
        assert!(!parsed.syslog_protocol_parsed);
    }

    #[test]
    fn parses_message_without_pid() {
        let parsed = parse_rfc3164(b"<13>Oct 11 22:14:15 mymachine sshd: accepted password").unwrap();
        assert_eq!(parsed.program.as_deref(), Some("sshd"));
        assert!(parsed.pid.is_none());
        assert_eq!(parsed.message, "accepted password");
    }

    #[test]
    fn rejects_pri_out_of_range() {
        let err = parse_rfc3164(b"<999>Oct 11 22:14:15 host tag: msg").unwrap_err();
        assert!(matches!(err, Rfc3164Error::PriOutOfRange));
    }
}
