//! Console fixture accessors for the iocheck probe suites.
//!
//! Every file is listed in `fixtures.index.toml`, verified against its
//! SHA-256 digest at build time, and verified again when first loaded.

mod types;

pub use types::{FixtureKind, FixtureMeta};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/generated.rs"));
}

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use sha2::{Digest, Sha256};

static DATA_DIR: Lazy<std::path::PathBuf> =
    Lazy::new(|| std::path::PathBuf::from(env!("TESTDATA_DATA_DIR")));

struct Entry {
    #[cfg(feature = "embed")]
    embed_data: Option<&'static [u8]>,
    cache: OnceCell<Arc<[u8]>>,
}

#[cfg(feature = "embed")]
fn embed_lookup() -> HashMap<(&'static str, &'static str), &'static [u8]> {
    generated::EMBED_DATA.iter().copied().collect()
}

static ENTRIES: Lazy<Vec<Entry>> = Lazy::new(|| {
    #[cfg(feature = "embed")]
    let embed = embed_lookup();

    generated::FIXTURES
        .iter()
        .map(|meta| {
            #[cfg(not(feature = "embed"))]
            let _ = meta;

            Entry {
                #[cfg(feature = "embed")]
                embed_data: embed.get(&(meta.device, meta.path)).copied(),
                cache: OnceCell::new(),
            }
        })
        .collect()
});

static BY_DEVICE: Lazy<HashMap<&'static str, HashMap<&'static str, usize>>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, HashMap<&'static str, usize>> = HashMap::new();
    for (idx, meta) in generated::FIXTURES.iter().enumerate() {
        map.entry(meta.device).or_default().insert(meta.path, idx);
    }
    map
});

fn index_of(device: &str, path: &str) -> Option<usize> {
    BY_DEVICE.get(device)?.get(path).copied()
}

/// Returns metadata for every fixture.
pub fn list() -> &'static [FixtureMeta] {
    generated::FIXTURES
}

/// Fixtures mounted on `device`, in manifest order.
pub fn for_device(device: &str) -> impl Iterator<Item = &'static FixtureMeta> + '_ {
    generated::FIXTURES
        .iter()
        .filter(move |meta| meta.device == device)
}

/// Returns the fixture bundle identifier.
pub fn source_bundle() -> &'static str {
    generated::SOURCE_BUNDLE
}

/// Looks up fixture metadata by device and path.
pub fn metadata(device: &str, path: &str) -> Option<&'static FixtureMeta> {
    index_of(device, path).map(|idx| &generated::FIXTURES[idx])
}

/// Loads fixture bytes, verifying them against the manifest digest.
pub fn load(device: &str, path: &str) -> io::Result<Arc<[u8]>> {
    let idx = index_of(device, path).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("unknown fixture {device}:/{path}"),
        )
    })?;
    load_entry(idx)
}

fn load_entry(idx: usize) -> io::Result<Arc<[u8]>> {
    ENTRIES[idx]
        .cache
        .get_or_try_init(|| {
            #[cfg(feature = "embed")]
            if let Some(data) = ENTRIES[idx].embed_data {
                return Ok(Arc::from(data));
            }

            let meta = &generated::FIXTURES[idx];
            let file_path = DATA_DIR.join(meta.device).join(meta.path);
            let bytes = std::fs::read(&file_path)?;

            let digest_hex = hex::encode(Sha256::digest(&bytes));
            if digest_hex != meta.sha256 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "fixture {}:/{} does not match manifest digest",
                        meta.device, meta.path
                    ),
                ));
            }

            Ok(Arc::from(bytes.into_boxed_slice()))
        })
        .cloned()
}
