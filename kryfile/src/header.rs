use super::ext::ReadExt;
use super::{Error, Kind};
use byteorder::{ReadBytesExt, LE};

/// Parsed container header. Everything before the ciphertext body:
///
/// | offset  | size       | field            |
/// |---------|------------|------------------|
/// | 0       | 2          | magic            |
/// | 2       | 4          | plaintext length |
/// | 6       | 4          | subkey length    |
/// | 10      | subkey len | subkey           |
/// | 10 + sk | 16         | verify block     |
///
/// Integers are little-endian.
#[derive(Debug, Clone)]
pub struct Header {
    pub kind: Kind,
    pub plaintext_len: u32,
    pub subkey: Vec<u8>,
    pub verify_block: [u8; 16],
}

impl Header {
    /// Total byte length of the header as stored, which is also the file
    /// offset of the first ciphertext block.
    pub fn byte_len(&self) -> u64 {
        2 + 4 + 4 + self.subkey.len() as u64 + 16
    }

    pub fn read<R: std::io::Read>(reader: &mut R) -> Result<Self, Error> {
        let magic = reader.read_magic().map_err(|e| truncated(e, "magic"))?;
        let kind = Kind::from_magic(magic).ok_or(Error::WrongMagic(magic))?;
        let plaintext_len = reader
            .read_u32::<LE>()
            .map_err(|e| truncated(e.into(), "plaintext length"))?;
        let subkey_len = reader
            .read_u32::<LE>()
            .map_err(|e| truncated(e.into(), "subkey length"))?;
        let subkey = reader
            .read_len(subkey_len as usize)
            .map_err(|e| truncated(e, "subkey"))?;
        let verify_block = reader
            .read_block()
            .map_err(|e| truncated(e, "verify block"))?;
        Ok(Self {
            kind,
            plaintext_len,
            subkey,
            verify_block,
        })
    }
}

fn truncated(err: Error, field: &'static str) -> Error {
    match err {
        Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            Error::TruncatedHeader(field)
        }
        other => other,
    }
}
