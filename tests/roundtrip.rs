use coding_techniques::coding::text::{
    build_frequency_table, build_huffman_tree, build_shannon_fano_tree, is_prefix_free,
    ArithmeticCoder, HuffmanCoder, LzwCoder, RunLengthCoder, ShannonFanoCoder,
};
use coding_techniques::coding::Coder;
use coding_techniques::{CodingConfig, Error, Media, Registry, ResultBundle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

const ALPHABET: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', ' ', '.', ',', 'X', 'Y', 'Z', '!', '?', 'é', 'ß', '中',
];

/// Random strings over a skewed alphabet, fixed seed.
fn random_messages(count: usize, max_len: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(1..=max_len);
            let distinct = rng.gen_range(1..=ALPHABET.len());
            (0..len)
                .map(|_| {
                    // Squaring skews the distribution towards early symbols.
                    let r: f64 = rng.gen();
                    ALPHABET[((r * r) * distinct as f64) as usize % distinct]
                })
                .collect()
        })
        .collect()
}

fn assert_round_trip<C: Coder<Input = str, Output = String>>(coder: &C, messages: &[String]) {
    for message in messages {
        let (encoded, metadata) = coder.encode(message).unwrap();
        let decoded = coder.decode(&encoded, &metadata).unwrap();
        assert_eq!(&decoded, message, "{} failed", coder.algorithm_name());
    }
}

#[test]
fn huffman_round_trips() {
    assert_round_trip(&HuffmanCoder::new(), &random_messages(200, 300, 1));
}

#[test]
fn shannon_fano_round_trips() {
    assert_round_trip(&ShannonFanoCoder::new(), &random_messages(200, 300, 2));
}

#[test]
fn lzw_round_trips() {
    assert_round_trip(&LzwCoder::new(), &random_messages(200, 300, 3));
}

#[test]
fn run_length_round_trips() {
    assert_round_trip(&RunLengthCoder::new(), &random_messages(200, 300, 4));
}

#[test]
fn arithmetic_round_trips_at_adaptive_precision() {
    assert_round_trip(&ArithmeticCoder::new(), &random_messages(100, 80, 5));
}

#[test]
fn prefix_codes_are_prefix_free() {
    for message in random_messages(300, 200, 6) {
        let frequencies = build_frequency_table(&message);
        let huffman = build_huffman_tree(&frequencies).unwrap().code_table();
        let shannon_fano = build_shannon_fano_tree(&frequencies).unwrap().code_table();
        assert_eq!(huffman.len(), frequencies.len());
        assert_eq!(shannon_fano.len(), frequencies.len());
        assert!(is_prefix_free(&huffman), "{:?}", huffman);
        assert!(is_prefix_free(&shannon_fano), "{:?}", shannon_fano);
    }
}

#[test]
fn huffman_is_no_longer_than_shannon_fano() {
    let huffman = HuffmanCoder::new();
    let shannon_fano = ShannonFanoCoder::new();
    for message in random_messages(100, 300, 7) {
        let (h, _) = huffman.encode(&message).unwrap();
        let (s, _) = shannon_fano.encode(&message).unwrap();
        assert!(h.len() <= s.len(), "{:?}", message);
    }
}

#[test]
fn lzw_dictionaries_grow_in_lock_step() {
    let coder = LzwCoder::new();
    for message in random_messages(100, 400, 8) {
        let (codes, metadata) = coder.encode(&message).unwrap();
        let (decoded, decoder_size) = coder.decode_with_dictionary_size(&codes).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoder_size, metadata.dictionary_size);
    }
}

#[test]
fn bundles_survive_disk() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(&CodingConfig::default());
    let message = "she sells sea shells by the sea shore";

    for name in registry.available()[&Media::Text].clone() {
        let coder = registry.create(name).unwrap();
        let bundle = coder.encode_value(json!(message)).unwrap();
        let path = dir.path().join(format!("{}.json", name.replace(' ', "_")));
        bundle.save(&path).unwrap();

        let loaded = ResultBundle::load(&path).unwrap();
        assert_eq!(loaded, bundle);
        let decoder = registry.create(&loaded.algorithm).unwrap();
        assert_eq!(decoder.decode_bundle(&loaded).unwrap(), json!(message));
    }
}

#[test]
fn audio_bundle_round_trip() {
    let registry = Registry::default();
    let coder = registry.create("LPC (Linear Predictive Coding)").unwrap();
    let samples: Vec<f64> = (0..2048).map(|n| (0.25 * n as f64).sin()).collect();
    let bundle = coder.encode_value(json!(samples)).unwrap();
    assert_eq!(bundle.metadata["status"]["kind"], json!("complete"));

    let decoded: Vec<f64> = serde_json::from_value(coder.decode_bundle(&bundle).unwrap()).unwrap();
    assert_eq!(decoded.len(), samples.len());
    for (a, b) in decoded.iter().zip(&samples).take(32) {
        assert!((a - b).abs() < 0.05);
    }
}

#[test]
fn unknown_names_are_rejected() {
    let registry = Registry::default();
    assert!(matches!(registry.create("Huffmann"), Err(Error::UnknownCoder(_))));
}
