use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use aes::cipher::BlockDecrypt;
use aes::Aes192;

use super::{keys, Error, Header, Keying, Kind, CHAIN_RESET};

fn align(offset: u64) -> u64 {
    // round up to the aes block size (16) then zero out alignment bits
    (offset + 15) & !15
}

/// An open encrypted container. Reads decrypt transparently; the position,
/// `len` and all seeks are in plaintext coordinates. End of file is the
/// header's plaintext length, never the raw file size.
pub struct KryFile {
    path: PathBuf,
    file: File,
    header: Header,
    header_len: u64,
    cipher: Aes192,
    keying: Keying,
    pos: u64,
}

impl std::fmt::Debug for KryFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KryFile")
            .field("path", &self.path)
            .field("kind", &self.header.kind)
            .field("len", &self.header.plaintext_len)
            .field("pos", &self.pos)
            .finish()
    }
}

impl KryFile {
    /// Opens an encrypted container read-only. The keying decides which
    /// magic is accepted and how the AES key is resolved; the key is then
    /// checked against the verify block before any data reads happen.
    pub fn open(path: impl AsRef<Path>, keying: Keying) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|source| Error::CannotOpen {
            path: path.display().to_string(),
            source,
        })?;
        let header = Header::read(&mut file)?;
        if header.kind != keying.kind() {
            match keying.kind() {
                Kind::Arcade => log::warn!(
                    "{}: no secret given and this is not an arcade encrypted file",
                    path.display()
                ),
                Kind::Patch => log::warn!(
                    "{}: secret given, but this is not a patch file",
                    path.display()
                ),
            }
            return Err(Error::WrongMagic(header.kind.magic()));
        }
        let cipher = keys::resolve(&path.to_string_lossy(), &header, &keying)?;
        let header_len = header.byte_len();
        Ok(Self {
            path,
            file,
            header,
            header_len,
            cipher,
            keying,
            pos: 0,
        })
    }

    /// Plaintext length in bytes, as recorded in the header.
    pub fn len(&self) -> u64 {
        self.header.plaintext_len as u64
    }

    pub fn is_empty(&self) -> bool {
        self.header.plaintext_len == 0
    }

    pub fn kind(&self) -> Kind {
        self.header.kind
    }

    /// Current position in plaintext coordinates.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Duplicates the open file at the same position. The duplicate holds
    /// its own raw file handle and its own copy of the key schedule.
    pub fn try_clone(&self) -> Result<Self, Error> {
        let file = File::open(&self.path).map_err(|source| Error::CannotReopen {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(Self {
            path: self.path.clone(),
            file,
            header: self.header.clone(),
            header_len: self.header_len,
            cipher: self.cipher.clone(),
            keying: self.keying.clone(),
            pos: self.pos,
        })
    }

    // startpos is rounded down to the nearest block we can decrypt from,
    // endpos is rounded up to the farthest block we need to decrypt
    fn read_internal(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let remaining = self.len() - self.pos;
        let len = (buf.len() as u64).min(remaining) as usize;
        if len == 0 {
            return Ok(0);
        }

        let start = self.pos / 16 * 16;
        let end = align(self.pos + len as u64);
        let skip = (self.pos - start) as usize;

        // the chain restarts from zero at every reset boundary; anywhere
        // else it is seeded with the ciphertext block just before startpos
        let mut backbuffer = [0u8; 16];
        if start % CHAIN_RESET != 0 {
            self.file.seek(SeekFrom::Start(self.header_len + start - 16))?;
            self.file.read_exact(&mut backbuffer)?;
        }

        self.file.seek(SeekFrom::Start(self.header_len + start))?;
        let mut ciphertext = vec![0u8; (end - start) as usize];
        self.file.read_exact(&mut ciphertext)?;

        let mut plaintext = vec![0u8; ciphertext.len()];
        for (i, (cipher_block, plain_block)) in ciphertext
            .chunks_exact(16)
            .zip(plaintext.chunks_exact_mut(16))
            .enumerate()
        {
            let mut block = aes::Block::default();
            self.cipher
                .decrypt_block_b2b(aes::Block::from_slice(cipher_block), &mut block);

            // per-block whitening: each decrypted byte is XORed with the
            // back buffer byte minus its index, wrapping. Not a standard
            // mode, but it is what the format does.
            for j in 0..16 {
                plain_block[j] = block[j] ^ backbuffer[j].wrapping_sub(j as u8);
            }

            if (start + (i as u64 + 1) * 16) % CHAIN_RESET == 0 {
                backbuffer = [0; 16];
            } else {
                backbuffer.copy_from_slice(cipher_block);
            }
        }

        buf[..len].copy_from_slice(&plaintext[skip..skip + len]);
        self.pos += len as u64;
        Ok(len)
    }
}

impl Read for KryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_internal(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl Seek for KryFile {
    /// Seeks in plaintext coordinates. Positions past the end clamp to the
    /// end rather than erroring, matching read semantics.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::End(n) => self.len() as i128 + n as i128,
            SeekFrom::Current(n) => self.pos as i128 + n as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of file",
            ));
        }
        self.pos = (target as u64).min(self.len());
        Ok(self.pos)
    }
}
