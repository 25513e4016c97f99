use std::path::{Path, PathBuf};

use super::{Error, Keying, Kind, KryFile};

/// Opens encrypted containers beneath a root directory with a fixed keying.
/// One driver serves one tree: arcade content keyed through the dongle, or
/// patch content keyed off the shared secret.
#[derive(Clone, Debug)]
pub struct KryDriver {
    root: PathBuf,
    keying: Keying,
}

impl KryDriver {
    pub fn new(root: impl Into<PathBuf>, keying: Keying) -> Self {
        Self {
            root: root.into(),
            keying,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The container kind files under this root must carry.
    pub fn kind(&self) -> Kind {
        self.keying.kind()
    }

    /// Opens `path` relative to the driver root.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<KryFile, Error> {
        KryFile::open(self.root.join(path), self.keying.clone())
    }
}
