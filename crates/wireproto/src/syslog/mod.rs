//! RFC 3164 and RFC 5424 syslog message parsing.

mod rfc3164;
mod rfc5424;

pub use rfc3164::{parse_rfc3164, Rfc3164Error};
pub use rfc5424::{parse_rfc5424, Rfc5424Error, StructuredDataElement};

use logmsg::Timestamp;

/// Fields extracted from a syslog message body, independent of which RFC
/// variant produced them. A parser pipe maps this onto a
/// [`logmsg::LogMessage`]'s value payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedMessage {
    pub pri: u8,
    pub timestamp: Option<Timestamp>,
    pub host: Option<String>,
    pub program: Option<String>,
    pub pid: Option<String>,
    pub msgid: Option<String>,
    pub structured_data: Vec<StructuredDataElement>,
    pub message: String,
    pub utf8_validated: bool,
    pub syslog_protocol_parsed: bool,
}
