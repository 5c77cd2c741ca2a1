//! Compression and decompression of whole streams.
//!
//! Compressed layout:
//!
//! ```text
//! [tree header][DATA][packed bitstream][trailing zero count]
//! ```
//!
//! Empty input is stored as a bare `DATA` byte followed by a zero footer.

use std::io::{self, BufRead, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};

use serde::Serialize;
use tracing::{debug, info};

use crate::bits::{BitPacker, BitWalker};
use crate::error::{Error, Result};
use crate::frequency::FrequencyMap;
use crate::node::Node;
use crate::tree::{DATA, Tree};

const FILL_CHUNK: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressionReport {
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub header_bytes: u64,
    pub packed_bytes: u64,
    pub trailing_zeros: u8,
    pub distinct_symbols: usize,
    pub tree_nodes: usize,
    pub max_code_len: u8,
}

impl CompressionReport {
    /// Output size as a fraction of the input size, `None` for empty input.
    pub fn ratio(&self) -> Option<f64> {
        (self.input_bytes > 0).then(|| self.output_bytes as f64 / self.input_bytes as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompressionReport {
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub header_bytes: u64,
    pub packed_bytes: u64,
    pub trailing_zeros: u8,
    pub tree_nodes: usize,
}

/// Compresses `input` from its current position to the end into `output`.
///
/// The input is read twice, once to count bytes and once to encode them, so it
/// must be seekable.
pub fn compress<R, W>(input: &mut R, output: &mut W) -> Result<CompressionReport>
where
    R: Read + Seek,
    W: Write,
{
    let start = input.stream_position()?;
    let freqs = FrequencyMap::from_reader(&mut *input)?;
    let input_bytes = freqs.total();
    let mut output = BufWriter::new(output);

    if freqs.is_empty() {
        output.write_all(&[DATA, 0])?;
        output.flush()?;
        info!("input is empty, wrote header-only stream");
        return Ok(CompressionReport {
            input_bytes: 0,
            output_bytes: 2,
            header_bytes: 1,
            packed_bytes: 0,
            trailing_zeros: 0,
            distinct_symbols: 0,
            tree_nodes: 0,
            max_code_len: 0,
        });
    }

    let tree = Tree::from_histogram(&freqs)?;
    let table = tree.code_table()?;
    let header_bytes = tree.serialize(&mut output)? as u64;
    debug!(header_bytes, distinct = freqs.distinct(), "wrote tree header");

    input.seek(SeekFrom::Start(start))?;
    let mut reader = BufReader::new(&mut *input);
    let mut packer = BitPacker::new(&mut output);
    let mut encoded = 0u64;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        for &byte in buf {
            packer.push(table.get(byte)?)?;
        }
        let n = buf.len();
        encoded += n as u64;
        reader.consume(n);
    }
    if encoded != input_bytes {
        return Err(io::Error::other(format!(
            "input changed between passes: counted {input_bytes} bytes, encoded {encoded}"
        ))
        .into());
    }

    let (_, packed) = packer.finish()?;
    output.write_all(&[packed.trailing_zeros])?;
    output.flush()?;

    let report = CompressionReport {
        input_bytes,
        output_bytes: header_bytes + packed.bytes + 1,
        header_bytes,
        packed_bytes: packed.bytes,
        trailing_zeros: packed.trailing_zeros,
        distinct_symbols: freqs.distinct(),
        tree_nodes: tree.node_count(),
        max_code_len: table.max_len(),
    };
    info!(
        input_bytes = report.input_bytes,
        output_bytes = report.output_bytes,
        "compressed"
    );
    Ok(report)
}

/// Reads the tree header. `None` means the stream holds the empty-input form.
pub fn read_header<R: BufRead>(input: &mut R) -> Result<Option<Tree>> {
    let first = input.fill_buf()?.first().copied();
    match first {
        None => Err(Error::malformed("stream is empty, expected a tree header")),
        Some(DATA) => {
            input.consume(1);
            Ok(None)
        }
        Some(_) => Tree::deserialize(input).map(Some),
    }
}

/// Decompresses `input` from its current position into `output`.
///
/// The footer is located by seeking to the last byte of the stream.
pub fn decompress<R, W>(input: &mut R, output: &mut W) -> Result<DecompressionReport>
where
    R: Read + Seek,
    W: Write,
{
    let mut input = BufReader::new(input);
    let start = input.stream_position()?;

    let tree = read_header(&mut input)?;
    let data_start = input.stream_position()?;

    let footer_pos = input.seek(SeekFrom::End(0))?.checked_sub(1).filter(|&pos| pos >= data_start);
    let Some(footer_pos) = footer_pos else {
        return Err(Error::malformed("missing trailing zero count"));
    };
    input.seek(SeekFrom::Start(footer_pos))?;
    let mut footer = [0u8; 1];
    input.read_exact(&mut footer)?;
    let trailing_zeros = footer[0];
    input.seek(SeekFrom::Start(data_start))?;

    let packed_bytes = footer_pos - data_start;
    if trailing_zeros > 7 {
        return Err(Error::malformed(format!(
            "trailing zero count {trailing_zeros} is out of range"
        )));
    }
    if packed_bytes == 0 && trailing_zeros != 0 {
        return Err(Error::malformed("padding declared for an empty bitstream"));
    }
    debug!(
        header_bytes = data_start - start,
        packed_bytes, trailing_zeros, "read stream layout"
    );

    let mut output = BufWriter::new(output);
    let payload_bits = packed_bytes * 8 - u64::from(trailing_zeros);

    let output_bytes = match &tree {
        None if packed_bytes == 0 => 0,
        None => return Err(Error::malformed("bitstream present after an empty tree")),
        Some(tree) => match tree.node(tree.root()) {
            Node::Leaf { byte, .. } => {
                repeat_byte(&mut output, *byte, payload_bits)?;
                payload_bits
            }
            Node::Internal { .. } => {
                let walker = BitWalker::new(&mut input, packed_bytes, trailing_zeros);
                walk_tree(tree, walker, &mut output)?
            }
        },
    };
    output.flush()?;

    let report = DecompressionReport {
        input_bytes: footer_pos + 1 - start,
        output_bytes,
        header_bytes: data_start - start,
        packed_bytes,
        trailing_zeros,
        tree_nodes: tree.as_ref().map_or(0, Tree::node_count),
    };
    info!(
        input_bytes = report.input_bytes,
        output_bytes = report.output_bytes,
        "decompressed"
    );
    Ok(report)
}

fn repeat_byte<W: Write>(output: &mut W, byte: u8, count: u64) -> io::Result<()> {
    let chunk = [byte; FILL_CHUNK];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(FILL_CHUNK as u64) as usize;
        output.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

fn walk_tree<R: Read, W: Write>(
    tree: &Tree,
    mut walker: BitWalker<R>,
    output: &mut W,
) -> Result<u64> {
    let root = tree.root();
    let mut cursor = root;
    let mut written = 0u64;

    while let Some(bit) = walker.next_bit()? {
        cursor = tree
            .child(cursor, bit)
            .ok_or_else(|| Error::malformed("walked past a leaf"))?;
        if let Node::Leaf { byte, .. } = tree.node(cursor) {
            output.write_all(&[*byte])?;
            written += 1;
            cursor = root;
        }
    }

    if cursor != root {
        return Err(Error::malformed("bitstream ends inside a code"));
    }
    Ok(written)
}

pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    compress(&mut Cursor::new(data), &mut out)?;
    Ok(out)
}

pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decompress(&mut Cursor::new(data), &mut out)?;
    Ok(out)
}
