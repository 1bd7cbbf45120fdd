//! PROXY protocol v1/v2 preface parsing.
//!
//! The preface is parsed once per connection; the resulting
//! [`ProxyInfo`] is then published as `.proxy.*` auxiliary data on every
//! subsequent message read from that connection.

use std::net::IpAddr;

/// Parsed `PROXY` preamble.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyInfo {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub ip_version: u8,
}

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("preface does not start with a recognized PROXY signature")]
    UnrecognizedSignature,
    #[error("v1 header has fewer than the required 6 space-separated fields")]
    V1Truncated,
    #[error("v1 header address family is neither TCP4 nor TCP6")]
    V1UnknownFamily,
    #[error("v1 header contains an unparsable address or port")]
    V1Malformed,
    #[error("v2 header is shorter than its declared length")]
    V2Truncated,
    #[error("v2 header has an unsupported address family/protocol byte")]
    V2UnsupportedFamily,
}

const V2_SIGNATURE: [u8; 12] = *b"\r\n\r\n\0\r\nQUIT\n";

/// Attempts to parse a `PROXY` v1 or v2 preface from the start of `input`.
/// Returns the parsed info and the number of bytes the preface consumed, or
/// `Ok(None)` if `input` does not begin with either signature (the caller
/// should then treat every byte as ordinary message data).
pub fn parse_preface(input: &[u8]) -> Result<Option<(ProxyInfo, usize)>, ProxyError> {
    if input.starts_with(&V2_SIGNATURE) {
        return parse_v2(input).map(Some);
    }
    if input.starts_with(b"PROXY ") {
        return parse_v1(input).map(Some);
    }
    Ok(None)
}

/// Parses `"PROXY TCP4 src dst sport dport"` terminated by `\r\n` or, kept
/// intentionally permissive to match long-standing behavior, by a bare
/// `\n` with no preceding `\r`.
fn parse_v1(input: &[u8]) -> Result<(ProxyInfo, usize), ProxyError> {
    let newline_at = memchr::memchr(b'\n', input).ok_or(ProxyError::V1Truncated)?;
    let mut line = &input[..newline_at];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    let line = std::str::from_utf8(line).map_err(|_| ProxyError::V1Malformed)?;

    let mut fields = line.split(' ');
    let _proxy = fields.next().ok_or(ProxyError::V1Truncated)?;
    let family = fields.next().ok_or(ProxyError::V1Truncated)?;
    let src_ip = fields.next().ok_or(ProxyError::V1Truncated)?;
    let dst_ip = fields.next().ok_or(ProxyError::V1Truncated)?;
    let src_port = fields.next().ok_or(ProxyError::V1Truncated)?;
    let dst_port = fields.next().ok_or(ProxyError::V1Truncated)?;

    let ip_version = match family {
        "TCP4" => 4,
        "TCP6" => 6,
        _ => return Err(ProxyError::V1UnknownFamily),
    };

    Ok((
        ProxyInfo {
            src_ip: src_ip.parse().map_err(|_| ProxyError::V1Malformed)?,
            dst_ip: dst_ip.parse().map_err(|_| ProxyError::V1Malformed)?,
            src_port: src_port.parse().map_err(|_| ProxyError::V1Malformed)?,
            dst_port: dst_port.parse().map_err(|_| ProxyError::V1Malformed)?,
            ip_version,
        },
        newline_at + 1,
    ))
}

fn parse_v2(input: &[u8]) -> Result<(ProxyInfo, usize), ProxyError> {
    if input.len() < 16 {
        return Err(ProxyError::V2Truncated);
    }
    let address_family_and_protocol = input[13];
    let addr_len = u16::from_be_bytes([input[14], input[15]]) as usize;
    let total_len = 16 + addr_len;
    if input.len() < total_len {
        return Err(ProxyError::V2Truncated);
    }
    let address_block = &input[16..total_len];

    let (ip_version, src_ip, dst_ip, src_port, dst_port) = match address_family_and_protocol >> 4 {
        0x1 => {
            if address_block.len() < 12 {
                return Err(ProxyError::V2Truncated);
            }
            let src: [u8; 4] = address_block[0..4].try_into().unwrap();
            let dst: [u8; 4] = address_block[4..8].try_into().unwrap();
            let src_port = u16::from_be_bytes([address_block[8], address_block[9]]);
            let dst_port = u16::from_be_bytes([address_block[10], address_block[11]]);
            (4u8, IpAddr::from(src), IpAddr::from(dst), src_port, dst_port)
        }
        0x2 => {
            if address_block.len() < 36 {
                return Err(ProxyError::V2Truncated);
            }
            let src: [u8; 16] = address_block[0..16].try_into().unwrap();
            let dst: [u8; 16] = address_block[16..32].try_into().unwrap();
            let src_port = u16::from_be_bytes([address_block[32], address_block[33]]);
            let dst_port = u16::from_be_bytes([address_block[34], address_block[35]]);
            (6u8, IpAddr::from(src), IpAddr::from(dst), src_port, dst_port)
        }
        _ => return Err(ProxyError::V2UnsupportedFamily),
    };

    Ok((
        ProxyInfo {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            ip_version,
        },
        total_len,
    ))
}
