mod driver;
mod error;
mod ext;
mod file;
mod header;
mod keys;

pub use {driver::*, error::*, file::*, header::*, keys::*};

/// Magic pair opening dongle-keyed arcade containers.
pub const ARCADE_MAGIC: [u8; 2] = *b":|";
/// Magic pair opening secret-keyed patch containers.
pub const PATCH_MAGIC: [u8; 2] = *b"8O";
/// Expected prefix of the decrypted verify block.
pub const VERIFY_MAGIC: [u8; 2] = *b":D";

/// Patch secrets are exactly this long, no terminator.
pub const SECRET_LEN: usize = 47;

/// The decryption chain restarts with a zeroed back buffer every this many
/// plaintext bytes (255 AES blocks), which is what makes bounded-range
/// random access possible.
pub const CHAIN_RESET: u64 = 4080;

/// Container flavor, decided by the magic pair.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
pub enum Kind {
    /// `.kry` content keyed through the hardware dongle.
    Arcade,
    /// `.patch` updates keyed off the shared secret.
    Patch,
}

impl Kind {
    pub fn magic(self) -> [u8; 2] {
        match self {
            Kind::Arcade => ARCADE_MAGIC,
            Kind::Patch => PATCH_MAGIC,
        }
    }

    pub fn from_magic(magic: [u8; 2]) -> Option<Self> {
        match magic {
            ARCADE_MAGIC => Some(Kind::Arcade),
            PATCH_MAGIC => Some(Kind::Patch),
            _ => None,
        }
    }
}
