//! Arithmetic coding with arbitrary-precision decimal intervals.
//!
//! The whole message becomes a single number inside `[0, 1)`. For every
//! symbol the current interval `[stage_min, stage_max)` is split into
//! sub-intervals proportional to the symbol probabilities (in sorted symbol
//! order) and narrowed to the sub-interval of that symbol. The encoded value
//! is the midpoint of the final interval.
//!
//! Interval width shrinks geometrically with message length, so the bounds
//! are [`FixedDecimal`] values rather than floats. See
//! [`required_precision`] for the number of digits a message needs.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::decimal::FixedDecimal;
use super::prefix::{build_frequency_table, FrequencyTable};
use crate::coding::{Coder, Media, Result};
use crate::config::ArithmeticConfig;
use crate::error::Error;

/// Extra digits on top of the information content of the message.
const GUARD_DIGITS: u32 = 8;

/// Number of decimal digits needed to encode a message with these symbol
/// counts without the final interval collapsing.
///
/// The final interval width is the product of the symbol probabilities,
/// i.e. `10^-I` where `I = Σ count·log10(total/count)`. Every narrowing step
/// truncates at most one unit in the last place, so `log10(len + 2)` digits
/// cover the accumulated truncation, and a fixed guard absorbs the rounding
/// of the estimate itself.
pub fn required_precision(frequencies: &FrequencyTable, message_length: usize) -> u32 {
    let total: usize = frequencies.values().sum();
    if total == 0 {
        return GUARD_DIGITS;
    }
    let information: f64 = frequencies
        .values()
        .filter(|&&count| count > 0)
        .map(|&count| count as f64 * (total as f64 / count as f64).log10())
        .sum();
    let truncation = ((message_length + 2) as f64).log10();
    information.ceil() as u32 + truncation.ceil() as u32 + GUARD_DIGITS
}

/// Symbols in sorted order with their cumulative probabilities.
///
/// `bounds[k]` is the sum of the probabilities of the first `k` symbols,
/// each truncated to `scale` digits, so `bounds` has one more entry than
/// `symbols` and starts at zero.
struct CumulativeTable {
    symbols: Vec<char>,
    bounds: Vec<FixedDecimal>,
}

impl CumulativeTable {
    fn new(frequencies: &FrequencyTable, scale: u32) -> Self {
        let total: usize = frequencies.values().sum();
        let mut symbols = Vec::with_capacity(frequencies.len());
        let mut bounds = Vec::with_capacity(frequencies.len() + 1);
        bounds.push(FixedDecimal::zero(scale));
        if total == 0 {
            return Self { symbols, bounds };
        }
        for (&symbol, &count) in frequencies {
            let probability = FixedDecimal::from_ratio(count, total, scale);
            let next = &bounds[bounds.len() - 1] + &probability;
            symbols.push(symbol);
            bounds.push(next);
        }
        Self { symbols, bounds }
    }

    fn len(&self) -> usize {
        self.symbols.len()
    }

    fn index_of(&self, symbol: char) -> Option<usize> {
        self.symbols.binary_search(&symbol).ok()
    }
}

/// Current sub-interval of `[0, 1)`.
struct Interval {
    stage_min: FixedDecimal,
    stage_max: FixedDecimal,
}

impl Interval {
    fn unit(scale: u32) -> Self {
        Self {
            stage_min: FixedDecimal::zero(scale),
            stage_max: FixedDecimal::one(scale),
        }
    }

    fn domain(&self) -> FixedDecimal {
        &self.stage_max - &self.stage_min
    }

    /// Narrow to the sub-interval of the symbol at `index`.
    fn narrow_to_index(&mut self, table: &CumulativeTable, index: usize) {
        let domain = self.domain();
        let low = &self.stage_min + &table.bounds[index].mul_trunc(&domain);
        let high = &self.stage_min + &table.bounds[index + 1].mul_trunc(&domain);
        self.stage_min = low;
        self.stage_max = high;
    }

    /// Narrow to `symbol`'s sub-interval. Returns `false` if it is not in the table.
    fn narrow_to(&mut self, table: &CumulativeTable, symbol: char) -> bool {
        match table.index_of(symbol) {
            Some(index) => {
                self.narrow_to_index(table, index);
                true
            }
            None => false,
        }
    }

    /// Index of the sub-interval containing `value`.
    ///
    /// Binary search over the cumulative bounds. Returns `None` when `value`
    /// lies outside every sub-interval, which truncation can cause at the
    /// top of the interval.
    fn locate(&self, table: &CumulativeTable, value: &FixedDecimal) -> Option<usize> {
        if table.len() == 0 || *value < self.stage_min {
            return None;
        }
        let offset = value - &self.stage_min;
        let domain = self.domain();

        // bounds[lo] * domain <= offset always holds since bounds[0] is zero.
        let (mut lo, mut hi) = (0, table.len());
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if table.bounds[mid].mul_trunc(&domain) <= offset {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (offset < table.bounds[lo + 1].mul_trunc(&domain)).then_some(lo)
    }
}

/// Side-channel data for an arithmetic-coded message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArithmeticMetadata {
    pub frequencies: FrequencyTable,
    /// Number of symbols to decode; decoding is driven by this count.
    pub message_length: usize,
    pub original_length: usize,
    /// Decimal digits used by the encoder.
    pub precision: u32,
}

/// Arithmetic coder over the characters of a text.
#[derive(Debug, Clone)]
pub struct ArithmeticCoder {
    precision: u32,
    adaptive: bool,
}

impl Default for ArithmeticCoder {
    fn default() -> Self {
        Self::from_config(&ArithmeticConfig::default())
    }
}

impl ArithmeticCoder {
    /// Create a coder with 50 digits of precision, raised per message when needed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ArithmeticConfig) -> Self {
        Self {
            precision: config.precision,
            adaptive: config.adaptive,
        }
    }

    /// Use exactly `precision` digits for every message.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision.max(1);
        self.adaptive = false;
        self
    }

    /// Raise the precision per message to [`required_precision`].
    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    fn effective_precision(&self, frequencies: &FrequencyTable, message_length: usize) -> u32 {
        let required = required_precision(frequencies, message_length);
        if self.adaptive {
            return self.precision.max(required);
        }
        if self.precision < required {
            warn!(
                "Precision of {} digits is below the {} needed for {} symbols",
                self.precision, required, message_length
            );
        }
        self.precision
    }
}

impl Coder for ArithmeticCoder {
    const MEDIA: Media = Media::Text;
    type Input = str;
    type Encoded = FixedDecimal;
    type Metadata = ArithmeticMetadata;
    type Output = String;

    fn algorithm_name(&self) -> &'static str {
        "Arithmetic"
    }

    fn encode(&self, input: &str) -> Result<(FixedDecimal, ArithmeticMetadata)> {
        info!("Encoding data with {}", self.algorithm_name());
        if input.is_empty() {
            let metadata = ArithmeticMetadata {
                precision: self.precision,
                ..ArithmeticMetadata::default()
            };
            return Ok((FixedDecimal::zero(self.precision), metadata));
        }

        let frequencies = build_frequency_table(input);
        debug!("Calculated frequencies: {:?}", frequencies);
        let message_length = input.chars().count();
        let precision = self.effective_precision(&frequencies, message_length);
        let table = CumulativeTable::new(&frequencies, precision);

        let mut interval = Interval::unit(precision);
        for symbol in input.chars() {
            if !interval.narrow_to(&table, symbol) {
                return Err(Error::invalid_input(format!(
                    "symbol {:?} missing from probability table",
                    symbol
                )));
            }
        }

        let encoded = interval.stage_min.midpoint(&interval.stage_max);
        debug!(
            "Final range: ({}, {}), encoded value: {}",
            interval.stage_min, interval.stage_max, encoded
        );

        let metadata = ArithmeticMetadata {
            frequencies,
            message_length,
            original_length: message_length,
            precision,
        };
        info!(
            "Encoded {} chars to a decimal of {} digits.",
            message_length, precision
        );
        Ok((encoded, metadata))
    }

    fn decode(&self, encoded: &FixedDecimal, metadata: &ArithmeticMetadata) -> Result<String> {
        info!("Decoding data with {}", self.algorithm_name());
        if metadata.frequencies.is_empty() || metadata.message_length == 0 {
            return Ok(String::new());
        }

        let precision = if metadata.precision > 0 {
            metadata.precision
        } else {
            self.precision
        };
        let table = CumulativeTable::new(&metadata.frequencies, precision);
        let Some(last) = table.len().checked_sub(1) else {
            return Ok(String::new());
        };
        let last_symbol = table.symbols[last];
        let value = encoded.rescale(precision);

        let mut decoded = String::with_capacity(metadata.message_length);
        let mut interval = Interval::unit(precision);
        for _ in 0..metadata.message_length {
            let index = match interval.locate(&table, &value) {
                Some(index) => index,
                None => {
                    // Truncation can leave a gap at the top of the interval
                    // that no sub-interval covers. Attribute it to the last
                    // symbol and keep going; this is a boundary compromise,
                    // not a guarantee of correctness.
                    warn!(
                        "Encoded value was at the boundary. Fallback to last symbol {:?}.",
                        last_symbol
                    );
                    last
                }
            };
            decoded.push(table.symbols[index]);
            interval.narrow_to_index(&table, index);
        }

        info!("Decoded decimal to {} chars.", metadata.message_length);
        Ok(decoded)
    }
}
