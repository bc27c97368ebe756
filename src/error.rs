//! Error types for persistence, settings and the world tick.

use thiserror::Error;

use crate::core::chunk::ChunkCoords;

/// Failure while encoding, decoding or moving a chunk save file.
#[derive(Debug, Error)]
pub enum ChunkFileError {
    #[error("bad chunk file magic {0:?}, expected \"GCHK\"")]
    BadMagic([u8; 4]),
    #[error("unsupported chunk file version {0}")]
    UnsupportedVersion(u8),
    #[error("chunk dimensions {found:?} do not match compiled dimensions {expected:?}")]
    DimensionMismatch { expected: [u8; 3], found: [u8; 3] },
    #[error("zero-length run at byte {offset}")]
    ZeroLengthRun { offset: usize },
    #[error("unknown block type {id} at byte {offset}")]
    UnknownBlockType { id: u8, offset: usize },
    #[error("run at byte {offset} overflows the chunk")]
    Overrun { offset: usize },
    #[error("chunk file truncated: decoded {decoded} of {expected} blocks")]
    Truncated { decoded: usize, expected: usize },
    #[error("{0} trailing bytes after the last run")]
    TrailingBytes(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings encoding failed: {0}")]
    Encode(#[from] bincode::Error),
}

/// Failure while loading or validating a block definition list.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("definition encoding failed: {0}")]
    Encode(#[from] bincode::Error),
    #[error("expected {expected} block definitions, found {found}")]
    WrongCount { expected: usize, found: usize },
    #[error("block {name} emits light {value}, above the maximum")]
    LightOutOfRange { name: String, value: u8 },
}

/// Unrecoverable failures surfaced by the world tick.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("corrupt save for chunk {coords}: {source}")]
    CorruptChunk {
        coords: ChunkCoords,
        #[source]
        source: ChunkFileError,
    },
    #[error("failed to save chunk {coords}: {source}")]
    SaveFailed {
        coords: ChunkCoords,
        #[source]
        source: ChunkFileError,
    },
}
