#[derive(thiserror::Error, Debug)]
pub enum Error {
    // std errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    // crate errors
    #[error("could not open {path}: {source}")]
    CannotOpen {
        path: String,
        source: std::io::Error,
    },
    #[error("could not reopen {path}: {source}")]
    CannotReopen {
        path: String,
        source: std::io::Error,
    },
    #[error("truncated header reading {0}")]
    TruncatedHeader(&'static str),
    #[error("unexpected magic {0:02x?}")]
    WrongMagic([u8; 2]),
    #[error("verify block did not decrypt, wrong key for this file")]
    KeyVerifyFailed,
    #[error("dongle key derivation failed: {0}")]
    Dongle(String),
    #[error("secret must be exactly {} bytes, got {0}", super::SECRET_LEN)]
    SecretLength(usize),
    #[error("output would overwrite input {0}")]
    OutputCollision(String),
    // key-input errors, used by callers feeding keys in from the outside
    #[error("malformed base64")]
    Base64,
    #[error("dongle key is an incorrect length")]
    KeyLength,
    #[error("no secret or dongle key provided")]
    MissingKey,
}
