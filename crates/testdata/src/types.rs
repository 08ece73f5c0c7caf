//! Core type definitions for fixture metadata.

/// What a fixture file represents on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    /// `PARAM.SFO` parameter table.
    Sfo,
    /// `UMD_DATA.BIN` disc identifier record.
    UmdData,
    /// Plain text file.
    Text,
    /// Compiled PRX module.
    Module,
    /// Fallback when the kind is not known.
    Unknown,
}

/// Describes a single fixture file exposed by the `testdata` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureMeta {
    /// Canonical name of the device the file is mounted on.
    pub device: &'static str,
    /// Path relative to the device root, `/`-separated.
    pub path: &'static str,
    /// Kind of content.
    pub kind: FixtureKind,
    /// Lower-case SHA-256 digest.
    pub sha256: &'static str,
    /// File size in bytes.
    pub size: u64,
    /// Whether the bytes are compiled into the crate under the `embed` feature.
    pub embed: bool,
}
