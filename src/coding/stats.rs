//! Summary statistics for coding results.

use std::collections::HashMap;

use log::debug;

/// Shannon entropy of the characters of `text`, in bits per symbol.
///
/// # Examples
///
/// ```rust
/// use coding_techniques::coding::stats::shannon_entropy;
///
/// assert_eq!(shannon_entropy("abab"), 1.0);
/// assert_eq!(shannon_entropy(""), 0.0);
/// ```
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut length = 0usize;
    for ch in text.chars() {
        *counts.entry(ch).or_insert(0) += 1;
        length += 1;
    }
    if length == 0 {
        return 0.0;
    }

    let entropy = counts
        .values()
        .map(|&count| {
            let p = count as f64 / length as f64;
            -p * p.log2()
        })
        .sum::<f64>();
    debug!("Calculated entropy for data of length {}: {}", length, entropy);
    entropy
}

/// `original / compressed`, infinite when nothing was produced.
pub fn compression_ratio(original_size: usize, compressed_size: usize) -> f64 {
    if compressed_size == 0 {
        return f64::INFINITY;
    }
    original_size as f64 / compressed_size as f64
}

/// Percentage of the original size saved, negative when the output grew.
pub fn space_savings(original_size: usize, compressed_size: usize) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
}

/// Human-readable byte count with one decimal, e.g. `"1.5 KB"`.
pub fn format_size(size_bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    if size_bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
