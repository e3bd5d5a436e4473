//! On-disk snapshot of a flat index.
//!
//! A snapshot directory holds generations of two data files plus a manifest
//! naming the live generation:
//! - `fragments-<gen>.json`: fragment records in insertion order
//! - `vectors-<gen>.bin`: header (`DQV1`, dim `u32`, count `u64`, BLAKE3
//!   digest of the fragments file) followed by `count * dim` little-endian `f32`
//! - `snapshot.json`: `{ generation, vectors, fragments }`
//!
//! A save writes the next generation's data files (tmp, sync, rename), then
//! swaps the manifest with a single rename. Until that rename the previous
//! generation stays live; afterwards older generations are removed.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use docqa_core::error::{Error, Result};
use docqa_core::types::Fragment;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const MANIFEST_FILE: &str = "snapshot.json";

const MAGIC: &[u8; 4] = b"DQV1";
const HEADER_LEN: usize = 4 + 4 + 8 + 32;
const VECTORS_PREFIX: &str = "vectors-";
const FRAGMENTS_PREFIX: &str = "fragments-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub generation: u64,
    pub vectors: String,
    pub fragments: String,
}

impl Manifest {
    pub fn for_generation(generation: u64) -> Self {
        Self {
            generation,
            vectors: format!("{}{:08}.bin", VECTORS_PREFIX, generation),
            fragments: format!("{}{:08}.json", FRAGMENTS_PREFIX, generation),
        }
    }

    fn owns(&self, file_name: &str) -> bool {
        file_name == self.vectors || file_name == self.fragments
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub dim: usize,
    /// Row-major, `fragments.len() * dim` values.
    pub vectors: Vec<f32>,
    pub fragments: Vec<Fragment>,
}

struct Header {
    dim: usize,
    count: usize,
    digest: [u8; 32],
}

pub fn write(dir: &Path, dim: usize, vectors: &[f32], fragments: &[Fragment]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))?;

    let previous = read_manifest(dir)?;
    let manifest = Manifest::for_generation(previous.as_ref().map_or(1, |m| m.generation.saturating_add(1)));

    let fragments_path = dir.join(&manifest.fragments);
    let fragments_json =
        serde_json::to_vec(fragments).map_err(|e| Error::storage(&fragments_path, e.into()))?;
    let digest = blake3::hash(&fragments_json);

    let dim_u32 = u32::try_from(dim)
        .map_err(|_| Error::InvalidConfig(format!("dimension {} does not fit the snapshot header", dim)))?;
    let mut buf = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&dim_u32.to_le_bytes());
    buf.extend_from_slice(&(fragments.len() as u64).to_le_bytes());
    buf.extend_from_slice(digest.as_bytes());
    for x in vectors {
        buf.extend_from_slice(&x.to_le_bytes());
    }

    write_atomic(&fragments_path, &fragments_json)?;
    write_atomic(&dir.join(&manifest.vectors), &buf)?;
    sync_dir(dir)?;

    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest_json =
        serde_json::to_vec_pretty(&manifest).map_err(|e| Error::storage(&manifest_path, e.into()))?;
    write_atomic(&manifest_path, &manifest_json)?;
    sync_dir(dir)?;

    remove_stale_generations(dir, &manifest);
    debug!(
        dir = %dir.display(),
        generation = manifest.generation,
        count = fragments.len(),
        bytes = buf.len() + fragments_json.len(),
        "snapshot written"
    );
    Ok(())
}

/// The live manifest, or `None` when there is none or it is unreadable.
pub fn read_manifest(dir: &Path) -> Result<Option<Manifest>> {
    let path = dir.join(MANIFEST_FILE);
    let Some(bytes) = read_if_exists(&path)? else {
        return Ok(None);
    };
    match serde_json::from_slice(&bytes) {
        Ok(manifest) => Ok(Some(manifest)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot manifest is unreadable; ignoring");
            Ok(None)
        }
    }
}

/// `Ok(None)` when there is no manifest, a data file is missing, or the pair
/// does not verify.
pub fn read(dir: &Path) -> Result<Option<Snapshot>> {
    let Some(manifest) = read_manifest(dir)? else {
        return Ok(None);
    };
    let vectors_path = dir.join(&manifest.vectors);
    let fragments_path = dir.join(&manifest.fragments);
    let Some(vector_bytes) = read_if_exists(&vectors_path)? else {
        warn!(path = %vectors_path.display(), "snapshot vectors are missing; ignoring");
        return Ok(None);
    };
    let Some(fragment_bytes) = read_if_exists(&fragments_path)? else {
        warn!(path = %fragments_path.display(), "snapshot fragments are missing; ignoring");
        return Ok(None);
    };

    let Some((header, body)) = parse_header(&vector_bytes) else {
        warn!(path = %vectors_path.display(), "snapshot header is malformed; ignoring");
        return Ok(None);
    };
    if blake3::hash(&fragment_bytes).as_bytes() != &header.digest {
        warn!(dir = %dir.display(), "snapshot files do not belong together; ignoring");
        return Ok(None);
    }
    let expected_len = header.count.checked_mul(header.dim).and_then(|n| n.checked_mul(4));
    if expected_len != Some(body.len()) {
        warn!(path = %vectors_path.display(), "snapshot vector data is truncated; ignoring");
        return Ok(None);
    }
    let fragments: Vec<Fragment> = match serde_json::from_slice(&fragment_bytes) {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %fragments_path.display(), error = %e, "snapshot fragments are unreadable; ignoring");
            return Ok(None);
        }
    };
    if fragments.len() != header.count || fragments.iter().enumerate().any(|(i, f)| f.id != i) {
        warn!(dir = %dir.display(), "snapshot fragments are out of order; ignoring");
        return Ok(None);
    }

    let vectors = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(Some(Snapshot { dim: header.dim, vectors, fragments }))
}

fn parse_header(bytes: &[u8]) -> Option<(Header, &[u8])> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return None;
    }
    let dim = u32::from_le_bytes(bytes[4..8].try_into().ok()?) as usize;
    let count = usize::try_from(u64::from_le_bytes(bytes[8..16].try_into().ok()?)).ok()?;
    let digest: [u8; 32] = bytes[16..48].try_into().ok()?;
    if dim == 0 {
        return None;
    }
    Some((Header { dim, count, digest }, &bytes[HEADER_LEN..]))
}

fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::storage(path, e)),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut file = File::create(&tmp_path).map_err(|e| Error::storage(&tmp_path, e))?;
    file.write_all(bytes).map_err(|e| Error::storage(&tmp_path, e))?;
    file.sync_all().map_err(|e| Error::storage(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| Error::storage(path, e))
}

fn remove_stale_generations(dir: &Path, live: &Manifest) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let generational = name.starts_with(VECTORS_PREFIX) || name.starts_with(FRAGMENTS_PREFIX);
        if generational && !live.owns(name) {
            if let Err(e) = fs::remove_file(entry.path()) {
                debug!(file = name, error = %e, "could not remove stale snapshot file");
            }
        }
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| Error::storage(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
