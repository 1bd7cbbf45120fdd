//! RFC 5424 parsing: `<PRI>VERSION TIMESTAMP HOSTNAME APP-NAME PROCID MSGID
//! [SD-ID PARAM="VAL" …] MSG`.

use super::ParsedMessage;
use logmsg::Timestamp;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// One `[SD-ID PARAM="VAL" ...]` structured-data element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructuredDataElement {
    pub id: String,
    pub params: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum Rfc5424Error {
    #[error("message does not start with '<'")]
    MissingPriStart,
    #[error("PRI value is not terminated by '>'")]
    UnterminatedPri,
    #[error("PRI value out of range 0..=191")]
    PriOutOfRange,
    #[error("message is missing the VERSION field")]
    MissingVersion,
    #[error("unsupported syslog VERSION (only 1 is recognized)")]
    UnsupportedVersion,
    #[error("message header is truncated before field {0}")]
    TruncatedHeader(&'static str),
    #[error("structured data element is missing a closing ']'")]
    UnterminatedStructuredData,
}

fn next_token(input: &str) -> Option<(&str, &str)> {
    let input = input.strip_prefix(' ')?;
    match input.find(' ') {
        Some(at) => Some((&input[..at], &input[at..])),
        None => Some((input, "")),
    }
}

fn nil_or(token: &str) -> Option<String> {
    if token == "-" {
        None
    } else {
        Some(token.to_string())
    }
}

fn parse_structured_data(input: &str) -> Result<(Vec<StructuredDataElement>, &str), Rfc5424Error> {
    let mut elements = Vec::new();
    let Some(mut rest) = input.strip_prefix(' ') else {
        return Ok((elements, input));
    };
    if let Some(after_nil) = rest.strip_prefix('-') {
        return Ok((elements, after_nil));
    }

    // Consecutive SD elements are directly concatenated ("[..][..]"), with
    // no separating space, so only the first "[" is reached via the
    // mandatory single space stripped above.
    loop {
        let Some(mut body) = rest.strip_prefix('[') else {
            return Ok((elements, rest));
        };

        let id_end = body
            .find(|c: char| c == ' ' || c == ']')
            .ok_or(Rfc5424Error::UnterminatedStructuredData)?;
        let id = body[..id_end].to_string();
        body = &body[id_end..];

        let mut params = Vec::new();
        loop {
            if let Some(after) = body.strip_prefix(']') {
                body = after;
                break;
            }
            let Some(after_space) = body.strip_prefix(' ') else {
                return Err(Rfc5424Error::UnterminatedStructuredData);
            };
            body = after_space;
            let eq_at = body
                .find('=')
                .ok_or(Rfc5424Error::UnterminatedStructuredData)?;
            let name = body[..eq_at].to_string();
            body = &body[eq_at + 1..];
            body = body
                .strip_prefix('"')
                .ok_or(Rfc5424Error::UnterminatedStructuredData)?;

            let mut value = String::new();
            let mut chars = body.char_indices();
            let mut closing_quote_at = None;
            while let Some((idx, ch)) = chars.next() {
                match ch {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        closing_quote_at = Some(idx);
                        break;
                    }
                    other => value.push(other),
                }
            }
            let closing_quote_at =
                closing_quote_at.ok_or(Rfc5424Error::UnterminatedStructuredData)?;
            body = &body[closing_quote_at + 1..];
            params.push((name, value));
        }

        elements.push(StructuredDataElement { id, params });
        rest = body;
    }
}

/// Parses one RFC 5424 message. Strips a UTF-8 BOM from the start of `MSG`
/// if present and sets [`ParsedMessage::utf8_validated`] once the whole
/// message has been confirmed valid UTF-8.
pub fn parse_rfc5424(input: &[u8]) -> Result<ParsedMessage, Rfc5424Error> {
    let utf8_validated = std::str::from_utf8(input).is_ok();
    let text = String::from_utf8_lossy(input);
    let mut rest = text.as_ref();

    rest = rest.strip_prefix('<').ok_or(Rfc5424Error::MissingPriStart)?;
    let pri_end = rest.find('>').ok_or(Rfc5424Error::UnterminatedPri)?;
    let pri: u16 = rest[..pri_end]
        .parse()
        .map_err(|_| Rfc5424Error::PriOutOfRange)?;
    if pri > 191 {
        return Err(Rfc5424Error::PriOutOfRange);
    }
    rest = &rest[pri_end + 1..];

    let version_end = rest
        .find(' ')
        .ok_or(Rfc5424Error::MissingVersion)?;
    let version = &rest[..version_end];
    if version != "1" {
        return Err(Rfc5424Error::UnsupportedVersion);
    }
    rest = &rest[version_end..];

    let (timestamp_token, r) = next_token(rest).ok_or(Rfc5424Error::TruncatedHeader("TIMESTAMP"))?;
    rest = r;
    let timestamp = if timestamp_token == "-" {
        None
    } else {
        time::OffsetDateTime::parse(timestamp_token, &time::format_description::well_known::Rfc3339)
            .ok()
            .map(|parsed| Timestamp {
                seconds: parsed.unix_timestamp(),
                microseconds: (parsed.nanosecond() / 1_000),
                gmt_offset_seconds: parsed.offset().whole_seconds(),
            })
    };

    let (host_token, r) = next_token(rest).ok_or(Rfc5424Error::TruncatedHeader("HOSTNAME"))?;
    rest = r;
    let (app_token, r) = next_token(rest).ok_or(Rfc5424Error::TruncatedHeader("APP-NAME"))?;
    rest = r;
    let (pid_token, r) = next_token(rest).ok_or(Rfc5424Error::TruncatedHeader("PROCID"))?;
    rest = r;
    let (msgid_token, r) = next_token(rest).ok_or(Rfc5424Error::TruncatedHeader("MSGID"))?;
    rest = r;

    let (structured_data, remainder) = parse_structured_data(rest)?;

    let message_bytes = remainder.strip_prefix(' ').unwrap_or(remainder).as_bytes();
    let message_bytes = message_bytes.strip_prefix(&UTF8_BOM).unwrap_or(message_bytes);
    let message = String::from_utf8_lossy(message_bytes).into_owned();

    Ok(ParsedMessage {
        pri: u8::try_from(pri).unwrap_or(u8::MAX),
        timestamp,
        host: nil_or(host_token),
        program: nil_or(app_token),
        pid: nil_or(pid_token),
        msgid: nil_or(msgid_token),
        structured_data,
        message,
        utf8_validated,
        syslog_protocol_parsed: true,
    })
}
