use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RomKind {
    Control,
    /// Wave-table sample data.
    Pcm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RomModel {
    Mt32,
    Mt32New,
    Cm32l,
}

/// Layout an image was matched against during validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomInfo {
    pub kind: RomKind,
    pub model: RomModel,
    pub size: usize,
}

/// A firmware image read from storage. `info` is set once validated.
#[derive(Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    kind: RomKind,
    name: String,
    data: Vec<u8>,
    info: Option<RomInfo>,
}

impl FirmwareImage {
    pub fn new(kind: RomKind, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind,
            name: name.into(),
            data,
            info: None,
        }
    }

    pub fn kind(&self) -> RomKind {
        self.kind
    }

    /// File name the image was read from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn info(&self) -> Option<RomInfo> {
        self.info
    }

    pub fn is_valid(&self) -> bool {
        self.info.is_some()
    }

    pub fn mark_valid(&mut self, info: RomInfo) {
        self.info = Some(info);
    }
}

impl fmt::Debug for FirmwareImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirmwareImage")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("len", &self.data.len())
            .field("info", &self.info)
            .finish()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FirmwareError {
    #[error("firmware file not found: {0}")]
    NotFound(String),
    #[error("io error reading {name}: {message}")]
    Io { name: String, message: String },
    #[error("error opening {primary} / {fallback}")]
    MissingResource { primary: String, fallback: String },
    #[error("corrupt firmware image {name}: {reason}")]
    CorruptResource { name: String, reason: String },
}

/// Where firmware images are read from (a search path, an archive, memory).
pub trait FirmwareSource: Send + Sync {
    fn read(&self, name: &str) -> Result<Vec<u8>, FirmwareError>;

    fn exists(&self, name: &str) -> bool {
        self.read(name).is_ok()
    }
}
