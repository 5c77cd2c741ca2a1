//! # huffpack
//!
//! Static, single-pass Huffman compression of arbitrary byte streams.
//!
//! ```rust
//! let data = b"three A and one B: AAAB".to_vec();
//! let compressed = huffpack::compress_bytes(&data)?;
//! assert_eq!(huffpack::decompress_bytes(&compressed)?, data);
//! # Ok::<(), huffpack::Error>(())
//! ```

pub mod bits;
pub mod codec;
pub mod error;
pub mod frequency;
pub mod node;
pub mod tree;

pub use codec::{
    CompressionReport, DecompressionReport, compress, compress_bytes, decompress,
    decompress_bytes, read_header,
};
pub use error::{Error, Result};
pub use frequency::FrequencyMap;
pub use tree::{Code, CodeTable, Tree};
