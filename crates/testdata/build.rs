//! Verifies and indexes the vendored console fixtures during the build.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Deserialize)]
struct Manifest {
    #[allow(dead_code)]
    generated: Option<String>,
    source: Source,
    #[serde(rename = "fixture")]
    fixtures: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
struct Source {
    bundle: String,
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    device: String,
    path: String,
    kind: String,
    sha256: String,
    embed: bool,
}

fn rust_string(value: &str) -> String {
    format!("{value:?}")
}

fn kind_variant(kind: &str) -> &'static str {
    match kind {
        "sfo" => "Sfo",
        "umd-data" => "UmdData",
        "text" => "Text",
        "module" => "Module",
        _ => "Unknown",
    }
}

fn main() -> Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let manifest_path = manifest_dir.join("fixtures.index.toml");
    println!("cargo:rerun-if-changed={}", manifest_path.display());

    let manifest_str =
        fs::read_to_string(&manifest_path).with_context(|| format!("reading {manifest_path:?}"))?;
    let manifest: Manifest = toml::from_str(&manifest_str)?;

    let fixture_dir = manifest_dir.join("fixtures");
    println!("cargo:rerun-if-changed={}", fixture_dir.display());

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let data_out_dir = out_dir.join("fixtures");
    fs::create_dir_all(&data_out_dir)?;

    let mut generated = String::new();
    writeln!(
        &mut generated,
        "use crate::types::{{FixtureKind, FixtureMeta}};"
    )?;
    writeln!(
        &mut generated,
        "pub(crate) const SOURCE_BUNDLE: &str = {};",
        rust_string(&manifest.source.bundle)
    )?;
    writeln!(&mut generated)?;
    generated.push_str("pub(crate) static FIXTURES: &[FixtureMeta] = &[\n");

    let mut embed_lines: Vec<String> = Vec::new();

    for fixture in &manifest.fixtures {
        let relative = Path::new(&fixture.device).join(&fixture.path);
        let source_file = fixture_dir.join(&relative);
        let bytes = fs::read(&source_file)
            .with_context(|| format!("reading fixture file {source_file:?}"))?;
        let sha = hex::encode(Sha256::digest(&bytes));
        if !sha.eq_ignore_ascii_case(&fixture.sha256) {
            bail!(
                "fixture {source_file:?} hashes to {sha}, manifest records {}",
                fixture.sha256
            );
        }
        let size = bytes.len() as u64;

        let dest = data_out_dir.join(&relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &bytes).with_context(|| format!("copying fixture bytes to {dest:?}"))?;

        writeln!(
            &mut generated,
            "    FixtureMeta {{ device: {}, path: {}, kind: FixtureKind::{}, sha256: {}, size: {size}, embed: {} }},",
            rust_string(&fixture.device),
            rust_string(&fixture.path),
            kind_variant(&fixture.kind),
            rust_string(&sha),
            fixture.embed
        )?;

        if fixture.embed {
            let embed_rel = Path::new("fixtures")
                .join(&relative)
                .to_string_lossy()
                .replace('\\', "/");
            embed_lines.push(format!(
                "    (({}, {}), include_bytes!(concat!(env!(\"CARGO_MANIFEST_DIR\"), \"/{embed_rel}\")).as_slice()),\n",
                rust_string(&fixture.device),
                rust_string(&fixture.path)
            ));
        }
    }

    generated.push_str("];\n\n");
    generated.push_str("#[cfg(feature = \"embed\")]\n");
    generated.push_str("pub(crate) static EMBED_DATA: &[((&str, &str), &[u8])] = &[\n");
    for line in embed_lines {
        generated.push_str(&line);
    }
    generated.push_str("];\n");

    let generated_path = out_dir.join("generated.rs");
    let mut file = fs::File::create(&generated_path)?;
    file.write_all(generated.as_bytes())?;

    println!(
        "cargo:rustc-env=TESTDATA_DATA_DIR={}",
        data_out_dir.to_string_lossy()
    );

    Ok(())
}
