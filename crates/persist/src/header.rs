//! On-disk header.
//!
//! The file keeps **two** header slots (offsets `0` and [`HEADER_LEN`]).
//! A commit writes the new directory, fsyncs, then writes the *inactive*
//! slot with an incremented generation and fsyncs again — the currently
//! active slot is never touched by a commit in flight, so a crash mid-write
//! leaves the other slot's CRC and `directory_offset` intact: open reads
//! both slots and picks the valid one with the higher generation.

pub const MAGIC: [u8; 8] = *b"LFDPERS1";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 64;
pub const HEADER_SLOT_COUNT: usize = 2;
pub const HEADER_REGION_LEN: usize = HEADER_LEN * HEADER_SLOT_COUNT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub format_version: u32,
    pub generation: u64,
    pub file_size: u64,
    pub directory_offset: u64,
    pub directory_len: u64,
}

impl Header {
    pub fn write_to(&self, buf: &mut [u8]) {
        assert!(buf.len() >= HEADER_LEN);
        buf[0..8].copy_from_slice(&MAGIC);
        buf[8..12].copy_from_slice(&self.format_version.to_le_bytes());
        buf[12..16].copy_from_slice(&[0; 4]);
        buf[16..24].copy_from_slice(&self.generation.to_le_bytes());
        buf[24..32].copy_from_slice(&self.file_size.to_le_bytes());
        buf[32..40].copy_from_slice(&self.directory_offset.to_le_bytes());
        buf[40..48].copy_from_slice(&self.directory_len.to_le_bytes());
        let crc = crc32fast::hash(&buf[0..48]);
        buf[48..52].copy_from_slice(&crc.to_le_bytes());
        buf[52..64].copy_from_slice(&[0; 12]);
    }

    pub fn read_from(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < HEADER_LEN {
            return Err(HeaderError::Truncated);
        }
        if buf[0..8] != MAGIC {
            return Err(HeaderError::BadMagic);
        }
        let stored_crc = u32::from_le_bytes(buf[48..52].try_into().unwrap());
        let computed_crc = crc32fast::hash(&buf[0..48]);
        if stored_crc != computed_crc {
            return Err(HeaderError::CrcMismatch);
        }
        let format_version = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        if format_version != FORMAT_VERSION {
            return Err(HeaderError::UnsupportedVersion(format_version));
        }
        Ok(Self {
            format_version,
            generation: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            file_size: u64::from_le_bytes(buf[24..32].try_into().unwrap()),
            directory_offset: u64::from_le_bytes(buf[32..40].try_into().unwrap()),
            directory_len: u64::from_le_bytes(buf[40..48].try_into().unwrap()),
        })
    }

    /// Reads both header slots from `region` (expected to be at least
    /// [`HEADER_REGION_LEN`] bytes) and picks the valid one with the
    /// higher generation. The returned index is which slot (0 or 1) that
    /// was, so the next commit knows to write the other one.
    pub fn read_active(region: &[u8]) -> Result<(Self, usize), HeaderError> {
        let slot0 = Self::read_from(&region[0..HEADER_LEN]);
        let slot1 = Self::read_from(&region[HEADER_LEN..HEADER_LEN * 2]);
        match (slot0, slot1) {
            (Ok(a), Ok(b)) => {
                if a.generation >= b.generation {
                    Ok((a, 0))
                } else {
                    Ok((b, 1))
                }
            }
            (Ok(a), Err(_)) => Ok((a, 0)),
            (Err(_), Ok(b)) => Ok((b, 1)),
            (Err(e), Err(_)) => Err(e),
        }
    }
}

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("file is shorter than the persist header")]
    Truncated,
    #[error("file does not start with the persist store magic bytes")]
    BadMagic,
    #[error("persist header CRC does not match its contents")]
    CrcMismatch,
    #[error("persist file format version {0} is not supported")]
    UnsupportedVersion(u32),
}
