//! End-to-end tests over the public stream API.

use std::io::Cursor;

use huffpack::{Error, FrequencyMap, Tree, compress, compress_bytes, decompress, decompress_bytes};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

fn assert_round_trip(data: &[u8]) -> Vec<u8> {
    let compressed = compress_bytes(data).expect("compression failed");
    let restored = decompress_bytes(&compressed).expect("decompression failed");
    assert_eq!(restored.len(), data.len(), "restored length differs");
    assert!(restored == data, "restored bytes differ from input");
    compressed
}

#[test]
fn every_byte_value() {
    let data: Vec<u8> = (0..=255u8).collect();
    assert_round_trip(&data);

    let reversed: Vec<u8> = (0..=255u8).rev().chain(0..=255u8).collect();
    assert_round_trip(&reversed);
}

#[test]
fn uniform_distribution_packs_to_eight_bits_per_byte() {
    let data: Vec<u8> = (0..1024).flat_map(|_| 0..=255u8).collect();
    let compressed = assert_round_trip(&data);

    // 511 nodes * 2 header bytes + DATA + payload + footer
    let header = 511 * 2 + 1;
    assert_eq!(compressed.len(), header + data.len() + 1);
    assert_eq!(*compressed.last().unwrap(), 0);
}

#[test]
fn single_symbol_lengths() {
    for n in [1usize, 2, 7, 8, 9, 63, 64, 65, 100_000] {
        let data = vec![b'Q'; n];
        let compressed = assert_round_trip(&data);
        assert_eq!(compressed.len(), 3 + n.div_ceil(8) + 1);
    }
}

#[test]
fn empty_input() {
    let compressed = assert_round_trip(&[]);
    assert_eq!(compressed, vec![2, 0]);
}

#[test]
fn random_inputs() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..40 {
        let len = rng.gen_range(0..20_000);
        let alphabet = rng.gen_range(1..=256usize);
        let data: Vec<u8> = (0..len)
            .map(|_| rng.gen_range(0..alphabet) as u8)
            .collect();
        assert_round_trip(&data);
    }
}

#[test]
fn random_noise() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut data = vec![0u8; 64 * 1024];
    rng.fill_bytes(&mut data);
    assert_round_trip(&data);
}

#[test]
fn skewed_geometric_distribution() {
    // Weights halve per symbol, which pushes the rarest codes deep into the tree.
    let mut data = Vec::new();
    for symbol in 0..20u8 {
        let count = 1usize << (20 - symbol as usize);
        data.extend(std::iter::repeat_n(symbol, count.max(1)));
    }
    let tree = Tree::from_histogram(&FrequencyMap::from_bytes(&data)).unwrap();
    assert!(tree.depth() >= 19);
    assert_round_trip(&data);
}

#[test]
fn text_compresses() {
    let text = b"It was the best of times, it was the worst of times, it was the age of wisdom, \
                 it was the age of foolishness, it was the epoch of belief, it was the epoch of \
                 incredulity, it was the season of Light, it was the season of Darkness."
        .repeat(20);
    let compressed = assert_round_trip(&text);
    assert!(compressed.len() < text.len() * 3 / 4);
}

#[test]
fn identical_input_gives_identical_output() {
    let mut rng = StdRng::seed_from_u64(99);
    let data: Vec<u8> = (0..10_000).map(|_| rng.gen_range(0..40u8)).collect();
    let first = compress_bytes(&data).unwrap();
    for _ in 0..3 {
        assert_eq!(compress_bytes(&data).unwrap(), first);
    }
}

#[test]
fn footer_is_padding_width() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..50 {
        let len = rng.gen_range(1..500);
        let data: Vec<u8> = (0..len).map(|_| rng.gen_range(0..12u8)).collect();

        let mut compressed = Vec::new();
        let report = compress(&mut Cursor::new(&data), &mut compressed).unwrap();
        let footer = *compressed.last().unwrap();

        assert!(footer <= 7);
        assert_eq!(footer, report.trailing_zeros);
        let table = Tree::from_histogram(&FrequencyMap::from_bytes(&data))
            .unwrap()
            .code_table()
            .unwrap();
        let payload_bits: u64 = data
            .iter()
            .map(|&b| u64::from(table.get(b).unwrap().len))
            .sum();
        assert_eq!((payload_bits + u64::from(footer)) % 8, 0);
        assert_eq!(report.packed_bytes * 8, payload_bits + u64::from(footer));
    }
}

#[test]
fn decompress_into_writer_reports_sizes() {
    let data = b"stream me through a writer".repeat(100);
    let compressed = compress_bytes(&data).unwrap();

    let mut restored = Vec::new();
    let report = decompress(&mut Cursor::new(&compressed), &mut restored).unwrap();
    assert_eq!(restored, data);
    assert_eq!(report.output_bytes, data.len() as u64);
    assert_eq!(report.input_bytes, compressed.len() as u64);
}

#[test]
fn corrupted_footer_is_rejected() {
    let mut compressed = compress_bytes(b"some data to corrupt").unwrap();
    *compressed.last_mut().unwrap() = 9;
    assert!(matches!(
        decompress_bytes(&compressed),
        Err(Error::MalformedStream(_))
    ));
}

#[test]
fn truncated_header_is_rejected() {
    let compressed = compress_bytes(b"header goes first").unwrap();
    for cut in [1, 2, 5, 10] {
        assert!(matches!(
            decompress_bytes(&compressed[..cut]),
            Err(Error::MalformedStream(_))
        ));
    }
}
