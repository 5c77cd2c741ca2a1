// src/commands.rs

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufReader, Cursor},
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use huffpack::{CompressionReport, DecompressionReport, node::Node};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

pub const COMPRESSED_EXT: &str = "huf";
const TEMP_SUFFIX: &str = ".tmp"; // For atomic writes
const RESTORED_SUFFIX: &str = ".out";

#[derive(Debug, Serialize)]
pub struct VerifyOutcome {
    pub input_bytes: u64,
    pub compressed_bytes: u64,
    pub digest: String,
    pub restored_digest: String,
}

impl VerifyOutcome {
    pub fn matches(&self) -> bool {
        self.digest == self.restored_digest
    }
}

/// `notes.txt` -> `notes.txt.huf`
pub fn default_compressed_path(input: &Path) -> PathBuf {
    with_suffix(input, &format!(".{COMPRESSED_EXT}"))
}

/// `notes.txt.huf` -> `notes.txt`, anything else gets `.out` appended.
pub fn default_restored_path(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) if ext == COMPRESSED_EXT => input.with_extension(""),
        _ => with_suffix(input, RESTORED_SUFFIX),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

// Writes through a sibling temp file and renames it over `path` only when
// `write` succeeds, so a failed run never leaves a partial output behind.
fn write_atomically<T>(
    path: &Path,
    force: bool,
    write: impl FnOnce(&mut File) -> huffpack::Result<T>,
) -> anyhow::Result<T> {
    if path.exists() && !force {
        warn!(path = %path.display(), "output exists, refusing to overwrite");
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let temp_path = with_suffix(path, TEMP_SUFFIX);
    let mut temp = File::create(&temp_path)
        .with_context(|| format!("cannot create {}", temp_path.display()))?;

    let result = write(&mut temp).and_then(|value| {
        temp.sync_all()?;
        Ok(value)
    });
    drop(temp);

    match result {
        Ok(value) => {
            fs::rename(&temp_path, path)
                .with_context(|| format!("cannot move output into {}", path.display()))?;
            Ok(value)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e.into())
        }
    }
}

pub fn compress_file(input: &Path, output: &Path, force: bool) -> anyhow::Result<CompressionReport> {
    let mut source =
        File::open(input).with_context(|| format!("cannot open {}", input.display()))?;

    let report = write_atomically(output, force, |dest| huffpack::compress(&mut source, dest))
        .with_context(|| format!("compressing {}", input.display()))?;

    match report.ratio() {
        Some(ratio) => info!(
            input = %input.display(),
            output = %output.display(),
            ratio_pct = ratio * 100.0,
            "file compressed"
        ),
        None => info!(input = %input.display(), "empty file compressed"),
    }
    Ok(report)
}

pub fn decompress_file(
    input: &Path,
    output: &Path,
    force: bool,
) -> anyhow::Result<DecompressionReport> {
    let mut source =
        File::open(input).with_context(|| format!("cannot open {}", input.display()))?;

    let report = write_atomically(output, force, |dest| huffpack::decompress(&mut source, dest))
        .with_context(|| format!("decompressing {}", input.display()))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = report.output_bytes,
        "file decompressed"
    );
    Ok(report)
}

/// Compresses and restores `input` in memory and compares SHA-256 digests.
pub fn verify_file(input: &Path) -> anyhow::Result<VerifyOutcome> {
    let mut source =
        File::open(input).with_context(|| format!("cannot open {}", input.display()))?;

    let mut compressed = Vec::new();
    let report = huffpack::compress(&mut source, &mut compressed)
        .with_context(|| format!("compressing {}", input.display()))?;

    let mut original = Sha256::default();
    io::copy(&mut File::open(input)?, &mut original)?;

    let mut restored = Sha256::default();
    huffpack::decompress(&mut Cursor::new(&compressed), &mut restored)
        .with_context(|| format!("restoring {}", input.display()))?;

    let outcome = VerifyOutcome {
        input_bytes: report.input_bytes,
        compressed_bytes: report.output_bytes,
        digest: hex(&original.finalize()),
        restored_digest: hex(&restored.finalize()),
    };
    if outcome.matches() {
        info!(input = %input.display(), digest = %outcome.digest, "round trip verified");
    } else {
        warn!(input = %input.display(), "round trip digest mismatch");
    }
    Ok(outcome)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Prints the tree stored in a compressed file and the code of every symbol.
pub fn inspect_file(input: &Path) -> anyhow::Result<()> {
    let file = File::open(input).with_context(|| format!("cannot open {}", input.display()))?;
    let mut reader = BufReader::new(file);

    let Some(tree) = huffpack::read_header(&mut reader)
        .with_context(|| format!("reading tree header of {}", input.display()))?
    else {
        println!("{}: empty stream (no symbols)", input.display());
        return Ok(());
    };

    let table = tree.code_table()?;
    println!(
        "{}: {} nodes, {} symbols, depth {}",
        input.display(),
        tree.node_count(),
        tree.leaf_count(),
        tree.depth()
    );
    if let Node::Leaf { byte, .. } = tree.node(tree.root()) {
        println!("single symbol {byte:#04x}, one 1 bit per occurrence");
        return Ok(());
    }

    for (byte, code) in table.iter() {
        let shown = if byte.is_ascii_graphic() { byte as char } else { '.' };
        println!(
            "  {byte:#04x} {shown}  {:>2}  {:0width$b}",
            code.len,
            code.bits,
            width = code.len as usize
        );
    }
    Ok(())
}
