use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::Aes192;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha512};

use super::{Error, Header, Kind, SECRET_LEN, VERIFY_MAGIC};

/// A 24-byte AES-192 key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AesKey(pub [u8; 24]);

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AesKey({})", hex::encode(self.0))
    }
}

/// The hardware key oracle. The real device is an iButton token on the
/// cabinet; PC builds and tests supply their own implementation.
pub trait Dongle: Send + Sync {
    fn derive_aes_key(&self, subkey: &[u8]) -> Result<AesKey, Error>;
}

/// A fixed 24-byte key applied to every file, standing in for the dongle on
/// builds without one.
pub struct StaticKey(pub AesKey);

impl Dongle for StaticKey {
    fn derive_aes_key(&self, _subkey: &[u8]) -> Result<AesKey, Error> {
        Ok(self.0)
    }
}

/// How file keys are resolved. Also decides which magic a file must carry.
#[derive(Clone)]
pub enum Keying {
    /// No secret; keys come from the dongle oracle.
    Dongle(Arc<dyn Dongle>),
    /// Keys are derived from the per-file subkey and this shared secret.
    Secret([u8; SECRET_LEN]),
}

impl std::fmt::Debug for Keying {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Keying::Dongle(_) => f.write_str("Keying::Dongle"),
            Keying::Secret(_) => f.write_str("Keying::Secret"),
        }
    }
}

impl Keying {
    pub fn dongle(dongle: Arc<dyn Dongle>) -> Self {
        Keying::Dongle(dongle)
    }

    pub fn secret(secret: impl AsRef<[u8]>) -> Result<Self, Error> {
        let secret = secret.as_ref();
        let secret = secret
            .try_into()
            .map_err(|_| Error::SecretLength(secret.len()))?;
        Ok(Keying::Secret(secret))
    }

    /// The container kind this keying can open.
    pub fn kind(&self) -> Kind {
        match self {
            Keying::Dongle(_) => Kind::Arcade,
            Keying::Secret(_) => Kind::Patch,
        }
    }

    fn derive(&self, subkey: &[u8]) -> Result<AesKey, Error> {
        match self {
            Keying::Dongle(dongle) => dongle.derive_aes_key(subkey),
            Keying::Secret(secret) => {
                // sign subkey || secret and keep the first 24 digest bytes
                let mut hasher = Sha512::new();
                hasher.update(subkey);
                hasher.update(secret);
                let digest = hasher.finalize();
                let mut key = [0; 24];
                key.copy_from_slice(&digest[..24]);
                Ok(AesKey(key))
            }
        }
    }
}

// pre-hashed decryption keys, for faster loading; keyed by path value
static KNOWN_KEYS: Lazy<Mutex<HashMap<String, AesKey>>> = Lazy::new(Default::default);

/// Removes the cached key for `path`, forcing re-derivation on the next
/// open. Arcade cabinets never replace content at runtime, but PC builds
/// can, and a container rewritten with a fresh subkey would otherwise fail
/// verification against the stale cached key forever.
pub fn forget_key(path: &str) {
    KNOWN_KEYS.lock().unwrap().remove(path);
}

/// Resolves the AES key for a file, consulting the cache first, and builds
/// the decryption schedule. The key enters the cache only once the verify
/// block has decrypted to the expected prefix.
pub(crate) fn resolve(path: &str, header: &Header, keying: &Keying) -> Result<Aes192, Error> {
    let cached = KNOWN_KEYS.lock().unwrap().get(path).copied();
    let hit = cached.is_some();
    let key = match cached {
        Some(key) => key,
        None => keying.derive(&header.subkey)?,
    };
    log::debug!(
        "{}: aes key {} via {}",
        path,
        hex::encode(key.0),
        match (hit, keying) {
            (true, _) => "cache",
            (false, Keying::Dongle(_)) => "dongle",
            (false, Keying::Secret(_)) => "secret",
        }
    );

    let cipher = Aes192::new(GenericArray::from_slice(&key.0));

    let mut plain = aes::Block::from(header.verify_block);
    cipher.decrypt_block(&mut plain);
    if plain[..2] != VERIFY_MAGIC[..] {
        log::warn!("{path}: decrypt failed, unexpected decryption magic");
        return Err(Error::KeyVerifyFailed);
    }

    if !hit {
        KNOWN_KEYS.lock().unwrap().insert(path.to_owned(), key);
    }
    Ok(cipher)
}
