//! Bit packing for the compressed payload.
//!
//! [`BitPacker`] fills one byte at a time MSB-first. A code that does not fit
//! in the free bits of the current byte is split: its high-order bits finish
//! the byte, the byte is flushed, and the low-order bits start the next one.
//! The final partial byte is padded with zeros in its low bits and the
//! padding width is reported back so it can be stored in the footer.
//!
//! [`BitWalker`] reads the payload back with an exact bit budget, so the
//! padding bits are never handed to the decoder.

use std::io::{self, Read, Write};

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::error::{Error, Result};
use crate::tree::Code;

const BYTE_BITS: u32 = 8;

pub struct BitPacker<W: Write> {
    writer: W,
    /// Current partial byte, filled from the high bit down
    acc: u8,
    /// Bits used in `acc`, always below 8 between calls
    filled: u32,
    bytes_written: u64,
}

/// What a finished [`BitPacker`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSummary {
    pub bytes: u64,
    pub trailing_zeros: u8,
}

impl<W: Write> BitPacker<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            acc: 0,
            filled: 0,
            bytes_written: 0,
        }
    }

    pub fn push(&mut self, code: Code) -> io::Result<()> {
        let mut bits = code.bits;
        let mut remaining = u32::from(code.len);

        while remaining > 0 {
            let free = BYTE_BITS - self.filled;
            let take = remaining.min(free);
            let rest = remaining - take;

            let chunk = ((bits >> rest) & ((1u64 << take) - 1)) as u8;
            self.acc |= chunk << (free - take);
            self.filled += take;

            bits &= low_mask(rest);
            remaining = rest;

            if self.filled == BYTE_BITS {
                self.flush_byte()?;
            }
        }
        Ok(())
    }

    fn flush_byte(&mut self) -> io::Result<()> {
        self.writer.write_all(&[self.acc])?;
        self.bytes_written += 1;
        self.acc = 0;
        self.filled = 0;
        Ok(())
    }

    /// Flushes the partial byte, if any, and hands back the writer.
    pub fn finish(mut self) -> io::Result<(W, PackSummary)> {
        let trailing_zeros = if self.filled > 0 {
            let pad = BYTE_BITS - self.filled;
            self.flush_byte()?;
            pad as u8
        } else {
            0
        };
        let summary = PackSummary {
            bytes: self.bytes_written,
            trailing_zeros,
        };
        Ok((self.writer, summary))
    }
}

fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Reads exactly `packed_bytes * 8 - trailing_zeros` bits, MSB-first.
pub struct BitWalker<R: Read> {
    reader: BitReader<io::Take<R>, BigEndian>,
    remaining: u64,
}

impl<R: Read> BitWalker<R> {
    /// The caller checks that `trailing_zeros` fits in the last packed byte.
    pub fn new(reader: R, packed_bytes: u64, trailing_zeros: u8) -> Self {
        let remaining = (packed_bytes * u64::from(BYTE_BITS)).saturating_sub(u64::from(trailing_zeros));
        Self {
            reader: BitReader::endian(reader.take(packed_bytes), BigEndian),
            remaining,
        }
    }

    /// Next payload bit, or `None` once the budget is spent.
    pub fn next_bit(&mut self) -> Result<Option<bool>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let bit = self.reader.read_bit().map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::malformed("bitstream shorter than its declared length"),
            _ => Error::Io(e),
        })?;
        self.remaining -= 1;
        Ok(Some(bit))
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(codes: &[(u64, u8)]) -> (Vec<u8>, PackSummary) {
        let mut packer = BitPacker::new(Vec::new());
        for &(bits, len) in codes {
            packer.push(Code { bits, len }).unwrap();
        }
        packer.finish().unwrap()
    }

    fn walk(bytes: &[u8], trailing_zeros: u8) -> Vec<bool> {
        let mut walker = BitWalker::new(bytes, bytes.len() as u64, trailing_zeros);
        let mut bits = Vec::new();
        while let Some(bit) = walker.next_bit().unwrap() {
            bits.push(bit);
        }
        bits
    }

    #[test]
    fn pads_final_byte_and_reports_padding() {
        let (bytes, summary) = pack(&[(1, 1), (1, 1), (1, 1), (0, 1)]);
        assert_eq!(bytes, vec![0b1110_0000]);
        assert_eq!(summary, PackSummary { bytes: 1, trailing_zeros: 4 });
    }

    #[test]
    fn splits_codes_across_byte_boundary() {
        let (bytes, summary) = pack(&[(0b10110, 5), (0b111001, 6)]);
        // 10110 111 | 001 00000
        assert_eq!(bytes, vec![0b1011_0111, 0b0010_0000]);
        assert_eq!(summary.trailing_zeros, 5);
    }

    #[test]
    fn exact_fill_has_no_padding() {
        let (bytes, summary) = pack(&[(0b1010, 4), (0b0101, 4), (0xFF, 8)]);
        assert_eq!(bytes, vec![0b1010_0101, 0xFF]);
        assert_eq!(summary, PackSummary { bytes: 2, trailing_zeros: 0 });
    }

    #[test]
    fn nothing_pushed_writes_nothing() {
        let (bytes, summary) = pack(&[]);
        assert!(bytes.is_empty());
        assert_eq!(summary, PackSummary { bytes: 0, trailing_zeros: 0 });
    }

    #[test]
    fn long_codes_keep_their_bits() {
        let code = 0x8000_0000_0000_0001u64;
        let (bytes, summary) = pack(&[(1, 3), (code, 64)]);
        // 001 then 1, 62 zeros, 1: 67 bits over 9 bytes
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[0], 0b0011_0000);
        assert_eq!(&bytes[1..8], &[0; 7]);
        assert_eq!(bytes[8], 0b0010_0000);
        assert_eq!(summary.trailing_zeros, 5);
    }

    #[test]
    fn walker_stops_before_padding() {
        assert_eq!(walk(&[0b1110_0000], 4), vec![true, true, true, false]);
        assert_eq!(walk(&[0b1011_0111, 0b0010_0000], 5).len(), 11);
        assert!(walk(&[], 0).is_empty());
    }

    #[test]
    fn walker_reads_only_its_slice() {
        let data = [0xFFu8, 0x00, 0xAA];
        let mut walker = BitWalker::new(&data[..], 1, 0);
        let mut count = 0;
        while let Some(bit) = walker.next_bit().unwrap() {
            assert!(bit);
            count += 1;
        }
        assert_eq!(count, 8);
        assert_eq!(walker.remaining(), 0);
    }

    #[test]
    fn walker_reports_truncated_payload() {
        let data = [0xFFu8];
        let mut walker = BitWalker::new(&data[..], 2, 0);
        for _ in 0..8 {
            walker.next_bit().unwrap();
        }
        assert!(matches!(walker.next_bit(), Err(Error::MalformedStream(_))));
    }

    #[test]
    fn packer_and_walker_agree() {
        let codes = [(0b1, 1), (0b0110, 4), (0b1_0000_0001, 9), (0b01, 2), (0b111, 3)];
        let (bytes, summary) = pack(&codes);

        let mut expected = Vec::new();
        for &(bits, len) in &codes {
            for i in (0..len).rev() {
                expected.push((bits >> i) & 1 == 1);
            }
        }
        assert_eq!(walk(&bytes, summary.trailing_zeros), expected);
    }
}
