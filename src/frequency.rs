use std::io::{BufReader, Read};

use crate::error::Result;

const MAP_SIZE: usize = 256;

/// Occurrence count of every possible byte value in a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyMap {
    counts: [u64; MAP_SIZE],
}

impl FrequencyMap {
    /// Scans `reader` to the end, counting each byte once.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        let mut map = Self::default();
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            map.add(&buf[..n]);
        }
        Ok(map)
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let mut map = Self::default();
        map.add(data);
        map
    }

    fn add(&mut self, data: &[u8]) {
        for &byte in data {
            self.counts[byte as usize] += 1;
        }
    }

    pub fn count(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Total number of bytes counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of byte values that occurred at least once.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Non-zero slots as `(byte, count)`, in ascending byte order.
    pub fn symbols(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count != 0)
            .map(|(byte, &count)| (byte as u8, count))
    }
}

impl Default for FrequencyMap {
    fn default() -> Self {
        Self {
            counts: [0; MAP_SIZE],
        }
    }
}
