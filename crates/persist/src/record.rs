//! Data-region records: `{key_len: u16, key, value_len: u32, version: u8,
//! value}`, padded to an 8-byte boundary.

pub const FIXED_PREFIX_LEN: usize = 8; // key_len(2) + value_len(4) + version(1) + pad(1)

#[must_use]
pub fn padded_len(key_len: usize, value_len: usize) -> usize {
    let raw = FIXED_PREFIX_LEN + key_len + value_len;
    raw.div_ceil(8) * 8
}

/// Encodes one record into a freshly allocated, 8-byte-aligned buffer.
#[must_use]
pub fn encode(key: &[u8], value: &[u8], version: u8) -> Vec<u8> {
    let total = padded_len(key.len(), value.len());
    let mut buf = vec![0u8; total];
    buf[0..2].copy_from_slice(&(key.len() as u16).to_le_bytes());
    buf[2..6].copy_from_slice(&(value.len() as u32).to_le_bytes());
    buf[6] = version;
    buf[7] = 0;
    buf[FIXED_PREFIX_LEN..FIXED_PREFIX_LEN + key.len()].copy_from_slice(key);
    let value_start = FIXED_PREFIX_LEN + key.len();
    buf[value_start..value_start + value.len()].copy_from_slice(value);
    buf
}

/// A view into a record already resident in the mmap.
#[derive(Clone, Copy, Debug)]
pub struct RecordView<'a> {
    pub key: &'a [u8],
    pub value: &'a [u8],
    pub version: u8,
}

pub fn decode(buf: &[u8]) -> RecordView<'_> {
    let key_len = u16::from_le_bytes(buf[0..2].try_into().unwrap()) as usize;
    let value_len = u32::from_le_bytes(buf[2..6].try_into().unwrap()) as usize;
    let version = buf[6];
    let key_start = FIXED_PREFIX_LEN;
    let value_start = key_start + key_len;
    RecordView {
        key: &buf[key_start..key_start + key_len],
        value: &buf[value_start..value_start + value_len],
        version,
    }
}
