//! Chunk persistence
//!
//! One file per chunk: an 8-byte header (`GCHK`, version, bit widths)
//! followed by `(block type, run length)` byte pairs covering every voxel in
//! index order. Storage backends only move opaque byte buffers around.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::constants::*;
use crate::core::block::{Block, BlockType};
use crate::core::chunk::ChunkCoords;
use crate::error::ChunkFileError;

const MAGIC_HEADER: &[u8; 4] = b"GCHK";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 8;
const MAX_RUN: usize = u8::MAX as usize;

pub const CHUNK_FILE_EXTENSION: &str = "chunk";

/// Encode a full chunk of blocks into the run-length save format.
pub fn encode_chunk(blocks: &[Block]) -> Vec<u8> {
    encode_types(blocks.iter().map(Block::block_type))
}

pub fn encode_types(types: impl IntoIterator<Item = BlockType>) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 512);
    out.extend_from_slice(MAGIC_HEADER);
    out.extend_from_slice(&[
        VERSION,
        CHUNK_BITS_X as u8,
        CHUNK_BITS_Y as u8,
        CHUNK_BITS_Z as u8,
    ]);

    let mut run: Option<(BlockType, usize)> = None;
    for block_type in types {
        run = match run {
            Some((current, len)) if current == block_type && len < MAX_RUN => {
                Some((current, len + 1))
            }
            Some((current, len)) => {
                out.extend_from_slice(&[current.id(), len as u8]);
                Some((block_type, 1))
            }
            None => Some((block_type, 1)),
        };
    }
    if let Some((current, len)) = run {
        out.extend_from_slice(&[current.id(), len as u8]);
    }
    out
}

/// Decode a save buffer into exactly `CHUNK_BLOCK_COUNT` block types.
pub fn decode_chunk(bytes: &[u8]) -> Result<Vec<BlockType>, ChunkFileError> {
    if bytes.len() < HEADER_LEN {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        if &magic != MAGIC_HEADER {
            return Err(ChunkFileError::BadMagic(magic));
        }
        return Err(ChunkFileError::Truncated {
            decoded: 0,
            expected: CHUNK_BLOCK_COUNT,
        });
    }

    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if &magic != MAGIC_HEADER {
        return Err(ChunkFileError::BadMagic(magic));
    }
    if bytes[4] != VERSION {
        return Err(ChunkFileError::UnsupportedVersion(bytes[4]));
    }
    let expected = [CHUNK_BITS_X as u8, CHUNK_BITS_Y as u8, CHUNK_BITS_Z as u8];
    let found = [bytes[5], bytes[6], bytes[7]];
    if found != expected {
        return Err(ChunkFileError::DimensionMismatch { expected, found });
    }

    let mut types = Vec::with_capacity(CHUNK_BLOCK_COUNT);
    let mut offset = HEADER_LEN;
    while types.len() < CHUNK_BLOCK_COUNT {
        let (Some(&id), Some(&len)) = (bytes.get(offset), bytes.get(offset + 1)) else {
            return Err(ChunkFileError::Truncated {
                decoded: types.len(),
                expected: CHUNK_BLOCK_COUNT,
            });
        };
        let block_type =
            BlockType::from_id(id).ok_or(ChunkFileError::UnknownBlockType { id, offset })?;
        if len == 0 {
            return Err(ChunkFileError::ZeroLengthRun { offset });
        }
        if types.len() + len as usize > CHUNK_BLOCK_COUNT {
            return Err(ChunkFileError::Overrun { offset });
        }
        types.extend(std::iter::repeat_n(block_type, len as usize));
        offset += 2;
    }

    if offset != bytes.len() {
        return Err(ChunkFileError::TrailingBytes(bytes.len() - offset));
    }
    Ok(types)
}

/// Where chunk save buffers live.
pub trait ChunkStorage: Send + Sync {
    fn exists(&self, coords: ChunkCoords) -> bool;
    fn read(&self, coords: ChunkCoords) -> io::Result<Vec<u8>>;
    fn write(&self, coords: ChunkCoords, bytes: &[u8]) -> io::Result<()>;
}

/// `Chunk(x,y).chunk` files in one directory.
pub struct DiskStorage {
    dir: PathBuf,
}

impl DiskStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, coords: ChunkCoords) -> PathBuf {
        self.dir.join(chunk_file_name(coords))
    }
}

pub fn chunk_file_name(coords: ChunkCoords) -> String {
    format!("Chunk({},{}).{}", coords.x, coords.y, CHUNK_FILE_EXTENSION)
}

impl ChunkStorage for DiskStorage {
    fn exists(&self, coords: ChunkCoords) -> bool {
        self.path_for(coords).is_file()
    }

    fn read(&self, coords: ChunkCoords) -> io::Result<Vec<u8>> {
        let file = File::open(self.path_for(coords))?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn write(&self, coords: ChunkCoords, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let file = File::create(self.path_for(coords))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()
    }
}

/// Process-local storage, handy for tests and throwaway worlds.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<FxHashMap<ChunkCoords, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

impl ChunkStorage for MemoryStorage {
    fn exists(&self, coords: ChunkCoords) -> bool {
        self.files.lock().contains_key(&coords)
    }

    fn read(&self, coords: ChunkCoords) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .get(&coords)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, chunk_file_name(coords)))
    }

    fn write(&self, coords: ChunkCoords, bytes: &[u8]) -> io::Result<()> {
        self.files.lock().insert(coords, bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    fn layered_types() -> Vec<BlockType> {
        (0..CHUNK_BLOCK_COUNT)
            .map(|i| {
                let z = i / CHUNK_BLOCKS_PER_LAYER;
                match z {
                    0 => BlockType::Lava,
                    1 => BlockType::Obsidian,
                    2..=50 if i % 7 == 0 => BlockType::Coal,
                    2..=50 => BlockType::Stone,
                    51..=59 => BlockType::Water,
                    _ => BlockType::Air,
                }
            })
            .collect()
    }

    #[test]
    fn test_round_trip() {
        let types = layered_types();
        let bytes = encode_types(types.iter().copied());
        assert_eq!(&bytes[..4], b"GCHK");
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[5..8], &[5, 5, 7]);
        let decoded = decode_chunk(&bytes).unwrap();
        assert_eq!(decoded.len(), CHUNK_BLOCK_COUNT);
        assert_eq!(decoded, types);
    }

    #[test]
    fn test_all_air_uses_max_runs() {
        let bytes = encode_types(std::iter::repeat_n(BlockType::Air, CHUNK_BLOCK_COUNT));
        let runs = (bytes.len() - HEADER_LEN) / 2;
        assert_eq!(runs, CHUNK_BLOCK_COUNT.div_ceil(MAX_RUN));
        for pair in bytes[HEADER_LEN..].chunks(2) {
            assert_eq!(pair[0], 0);
            assert!(pair[1] >= 1);
        }
        assert_eq!(decode_chunk(&bytes).unwrap().len(), CHUNK_BLOCK_COUNT);
    }

    #[test]
    fn test_alternating_types_never_merge() {
        let types: Vec<_> = (0..CHUNK_BLOCK_COUNT)
            .map(|i| if i % 2 == 0 { BlockType::Dirt } else { BlockType::Sand })
            .collect();
        let bytes = encode_types(types.iter().copied());
        assert_eq!(bytes.len(), HEADER_LEN + CHUNK_BLOCK_COUNT * 2);
        assert_eq!(decode_chunk(&bytes).unwrap(), types);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode_types(layered_types());
        bytes[0] = b'X';
        assert!(matches!(decode_chunk(&bytes), Err(ChunkFileError::BadMagic(_))));
        assert!(matches!(decode_chunk(b"NOPE"), Err(ChunkFileError::BadMagic(_))));
    }

    #[test]
    fn test_header_checks() {
        let mut bytes = encode_types(layered_types());
        bytes[4] = 2;
        assert!(matches!(
            decode_chunk(&bytes),
            Err(ChunkFileError::UnsupportedVersion(2))
        ));
        bytes[4] = 1;
        bytes[5] = 4;
        assert!(matches!(
            decode_chunk(&bytes),
            Err(ChunkFileError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_and_overlong() {
        let bytes = encode_types(layered_types());
        assert!(matches!(
            decode_chunk(&bytes[..bytes.len() - 2]),
            Err(ChunkFileError::Truncated { .. })
        ));

        let mut longer = bytes.clone();
        longer.extend_from_slice(&[0, 1]);
        assert!(matches!(
            decode_chunk(&longer),
            Err(ChunkFileError::TrailingBytes(2))
        ));

        let mut overrun = bytes[..HEADER_LEN].to_vec();
        overrun.extend(std::iter::repeat_n([6u8, 255u8], CHUNK_BLOCK_COUNT / 255).flatten());
        overrun.extend_from_slice(&[6, 255]);
        assert!(matches!(
            decode_chunk(&overrun),
            Err(ChunkFileError::Overrun { .. })
        ));
    }

    #[test]
    fn test_bad_runs() {
        let mut bytes = encode_types(layered_types());
        bytes[HEADER_LEN + 1] = 0;
        assert!(matches!(
            decode_chunk(&bytes),
            Err(ChunkFileError::ZeroLengthRun { offset: HEADER_LEN })
        ));
        bytes[HEADER_LEN] = 200;
        assert!(matches!(
            decode_chunk(&bytes),
            Err(ChunkFileError::UnknownBlockType { id: 200, .. })
        ));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(chunk_file_name(IVec2::new(-3, 12)), "Chunk(-3,12).chunk");
    }

    #[test]
    fn test_disk_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().join("Saves"));
        let at = IVec2::new(2, -1);
        assert!(!storage.exists(at));
        assert!(storage.read(at).is_err());

        let bytes = encode_types(layered_types());
        storage.write(at, &bytes).unwrap();
        assert!(storage.exists(at));
        assert!(storage.path_for(at).ends_with("Chunk(2,-1).chunk"));
        assert_eq!(storage.read(at).unwrap(), bytes);
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::default();
        let at = IVec2::new(0, 7);
        assert!(storage.is_empty());
        storage.write(at, b"abc").unwrap();
        assert!(storage.exists(at));
        assert_eq!(storage.read(at).unwrap(), b"abc");
        assert_eq!(storage.read(IVec2::ZERO).unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
