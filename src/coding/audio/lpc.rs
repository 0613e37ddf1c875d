//! Linear Predictive Coding.
//!
//! The coder models a signal as an all-pole filter: every sample is predicted
//! from the `order` samples before it,
//!
//! ```text
//! x[n] = -(a[1]·x[n-1] + a[2]·x[n-2] + … + a[p]·x[n-p])
//! ```
//!
//! The coefficient vector `a` (with `a[0] = 1`) is obtained from the
//! autocorrelation of the normalized signal by the Levinson-Durbin recursion.
//! Decoding runs the predictor forward from the first `order` original
//! samples, which travel in the metadata.

use log::{debug, info, warn};
use ndarray::{s, Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::coding::{Coder, Media, Result};
use crate::config::{EnhancementConfig, LpcConfig};

/// Outcome of a coefficient computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoefficientStatus {
    /// All `order` iterations ran.
    Complete,
    /// The prediction error became non-positive at iteration `at`; later
    /// coefficients are left at zero.
    Truncated { at: usize },
    /// The signal is not longer than the order; no coefficients.
    InsufficientData,
    /// The signal has no energy; no coefficients.
    ZeroEnergy,
}

impl CoefficientStatus {
    /// Whether any usable coefficients were produced.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Complete | Self::Truncated { .. })
    }
}

/// Subtract the mean and scale by the largest absolute deviation.
///
/// Returns the normalized signal with the mean and scale used. A signal with
/// no deviation is scaled by 1.
pub fn normalize(signal: ArrayView1<f64>) -> (Array1<f64>, f64, f64) {
    let mean = signal.mean().unwrap_or(0.0);
    let mut max_abs = signal
        .iter()
        .fold(0.0_f64, |acc, &x| acc.max((x - mean).abs()));
    if max_abs == 0.0 {
        max_abs = 1.0;
    }
    debug!("Normalized signal with mean={}, max_abs={}", mean, max_abs);
    (signal.mapv(|x| (x - mean) / max_abs), mean, max_abs)
}

/// Inverse of [`normalize`].
pub fn denormalize(signal: ArrayView1<f64>, mean: f64, max_abs: f64) -> Array1<f64> {
    signal.mapv(|x| x * max_abs + mean)
}

/// Non-negative lags `0..=max_lag` of the full self-convolution
/// `r[k] = Σ x[i]·x[i+k]`.
///
/// Lags at or beyond the signal length are dropped.
pub fn autocorrelation(signal: ArrayView1<f64>, max_lag: usize) -> Array1<f64> {
    let n = signal.len();
    let lags = (max_lag + 1).min(n);
    Array1::from_shape_fn(lags, |k| signal.slice(s![..n - k]).dot(&signal.slice(s![k..])))
}

/// Levinson-Durbin recursion over an autocorrelation sequence.
///
/// Returns `order + 1` coefficients with `a[0] = 1`, or an empty vector when
/// the sequence is too short or has zero energy. If the prediction error
/// stops being positive the recursion ends early and the coefficients
/// computed so far are returned.
pub fn levinson_durbin(r: ArrayView1<f64>, order: usize) -> (Array1<f64>, CoefficientStatus) {
    if r.len() <= order {
        warn!(
            "Autocorrelation length ({}) is too short for LPC order {}.",
            r.len(),
            order
        );
        return (Array1::zeros(0), CoefficientStatus::InsufficientData);
    }

    let mut energy = r[0];
    if energy == 0.0 {
        warn!("Zero energy in signal, LPC coefficients cannot be calculated.");
        return (Array1::zeros(0), CoefficientStatus::ZeroEnergy);
    }

    let mut a = Array1::<f64>::zeros(order + 1);
    a[0] = 1.0;
    let mut status = CoefficientStatus::Complete;

    for i in 1..=order {
        let acc = r[i] + (1..i).map(|j| a[j] * r[i - j]).sum::<f64>();
        // Reflection coefficient.
        let k = -acc / energy;

        let previous = a.clone();
        a[i] = k;
        for j in 1..i {
            a[j] = previous[j] + k * previous[i - j];
        }

        energy *= 1.0 - k * k;
        if energy <= 0.0 {
            warn!(
                "Energy became non-positive at iteration {}, stopping LPC calculation.",
                i
            );
            status = CoefficientStatus::Truncated { at: i };
            break;
        }
    }

    debug!("Calculated LPC coefficients (order {}): {}", order, a);
    (a, status)
}

/// LPC coefficients of a (normalized) signal.
pub fn lpc_coefficients(signal: ArrayView1<f64>, order: usize) -> (Array1<f64>, CoefficientStatus) {
    if signal.len() <= order {
        warn!(
            "Signal length ({}) must be greater than LPC order ({}).",
            signal.len(),
            order
        );
        return (Array1::zeros(0), CoefficientStatus::InsufficientData);
    }
    let r = autocorrelation(signal, order);
    levinson_durbin(r.view(), order)
}

/// Amplify samples whose magnitude is below the threshold.
///
/// This is a heuristic post-processing stage with no basis in the LPC model;
/// it is only run when configured.
pub fn enhance(signal: &mut Array1<f64>, enhancement: &EnhancementConfig) {
    signal.mapv_inplace(|x| {
        if x.abs() < enhancement.threshold {
            x * enhancement.gain
        } else {
            x
        }
    });
}

/// Side-channel data for an LPC-coded signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpcMetadata {
    pub order: usize,
    pub mean: f64,
    pub max_abs: f64,
    pub signal_length: usize,
    /// The first `order` raw samples, used to seed prediction
    pub initial_samples: Vec<f64>,
    pub status: CoefficientStatus,
}

/// Linear predictive coder for sampled audio.
#[derive(Debug, Clone)]
pub struct LpcCoder {
    order: usize,
    enhancement: Option<EnhancementConfig>,
}

impl Default for LpcCoder {
    fn default() -> Self {
        Self::from_config(&LpcConfig::default())
    }
}

impl LpcCoder {
    pub fn new(order: usize) -> Self {
        Self {
            order: order.max(1),
            enhancement: None,
        }
    }

    pub fn from_config(config: &LpcConfig) -> Self {
        Self {
            order: config.order.max(1),
            enhancement: config.enhancement,
        }
    }

    /// Enable the small-sample amplification stage on decode.
    pub fn with_enhancement(mut self, enhancement: EnhancementConfig) -> Self {
        self.enhancement = Some(enhancement);
        self
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Run the predictor forward over the normalized domain.
    fn reconstruct(coefficients: &[f64], metadata: &LpcMetadata) -> Array1<f64> {
        let length = metadata.signal_length;
        let max_abs = if metadata.max_abs == 0.0 {
            1.0
        } else {
            metadata.max_abs
        };
        let mut decoded = Array1::<f64>::zeros(length);

        let seeded = metadata.order.min(length).min(metadata.initial_samples.len());
        for (slot, &sample) in decoded
            .iter_mut()
            .zip(&metadata.initial_samples)
            .take(seeded)
        {
            *slot = (sample - metadata.mean) / max_abs;
        }

        if coefficients.len() <= 1 {
            // Nothing to predict with: the rest of the signal stays at the mean.
            warn!("No LPC coefficients; reconstructing from the seed samples only.");
            return decoded;
        }

        let taps = (coefficients.len() - 1).min(metadata.order);
        for n in metadata.order..length {
            let prediction: f64 = (1..=taps).map(|k| coefficients[k] * decoded[n - k]).sum();
            decoded[n] = -prediction;
        }
        decoded
    }
}

impl Coder for LpcCoder {
    const MEDIA: Media = Media::Audio;
    type Input = [f64];
    type Encoded = Vec<f64>;
    type Metadata = LpcMetadata;
    type Output = Vec<f64>;

    fn algorithm_name(&self) -> &'static str {
        "LPC (Linear Predictive Coding)"
    }

    fn encode(&self, input: &[f64]) -> Result<(Vec<f64>, LpcMetadata)> {
        info!("Encoding data with {}", self.algorithm_name());
        let signal = ArrayView1::from(input);
        let (normalized, mean, max_abs) = normalize(signal);
        let (coefficients, status) = lpc_coefficients(normalized.view(), self.order);

        let metadata = LpcMetadata {
            order: self.order,
            mean,
            max_abs,
            signal_length: input.len(),
            initial_samples: input.iter().take(self.order).copied().collect(),
            status,
        };
        info!(
            "Encoded {} samples to {} LPC coefficients.",
            metadata.signal_length,
            coefficients.len()
        );
        Ok((coefficients.to_vec(), metadata))
    }

    fn decode(&self, encoded: &Vec<f64>, metadata: &LpcMetadata) -> Result<Vec<f64>> {
        info!("Decoding data with {}", self.algorithm_name());
        let mut decoded = Self::reconstruct(encoded, metadata);
        debug!("Reconstructed signal from LPC coefficients.");

        if let Some(enhancement) = &self.enhancement {
            debug!(
                "Enhancing samples below {} by a gain of {}",
                enhancement.threshold, enhancement.gain
            );
            enhance(&mut decoded, enhancement);
        }

        let max_abs = if metadata.max_abs == 0.0 {
            1.0
        } else {
            metadata.max_abs
        };
        let output = denormalize(decoded.view(), metadata.mean, max_abs);
        info!(
            "Decoded {} LPC coefficients to {} samples.",
            encoded.len(),
            output.len()
        );
        Ok(output.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(length: usize, omega: f64) -> Vec<f64> {
        (0..length).map(|n| (omega * n as f64).sin()).collect()
    }

    fn max_error(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()))
    }

    #[test]
    fn test_normalize() {
        let signal = Array1::from(vec![1.0, 2.0, 3.0]);
        let (normalized, mean, max_abs) = normalize(signal.view());
        assert_abs_diff_eq!(mean, 2.0);
        assert_abs_diff_eq!(max_abs, 1.0);
        assert_abs_diff_eq!(normalized, Array1::from(vec![-1.0, 0.0, 1.0]));
        let restored = denormalize(normalized.view(), mean, max_abs);
        assert_abs_diff_eq!(restored, signal, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_constant_signal_guards_divisor() {
        let signal = Array1::from(vec![4.0; 5]);
        let (normalized, mean, max_abs) = normalize(signal.view());
        assert_abs_diff_eq!(mean, 4.0);
        assert_abs_diff_eq!(max_abs, 1.0);
        assert!(normalized.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_autocorrelation() {
        let signal = Array1::from(vec![1.0, 2.0, 3.0]);
        let r = autocorrelation(signal.view(), 5);
        // Only lags below the signal length exist.
        assert_abs_diff_eq!(r, Array1::from(vec![14.0, 8.0, 3.0]));
    }

    #[test]
    fn test_sinusoid_coefficients() {
        let omega = 0.25;
        let signal = Array1::from(sine(4096, omega));
        let (normalized, _, _) = normalize(signal.view());
        let (a, status) = lpc_coefficients(normalized.view(), 2);
        assert_eq!(status, CoefficientStatus::Complete);
        assert_eq!(a.len(), 3);
        // An undamped resonator: x[n] = 2cos(w)x[n-1] - x[n-2].
        assert_abs_diff_eq!(a[0], 1.0);
        assert_abs_diff_eq!(a[1], -2.0 * omega.cos(), epsilon = 5e-3);
        assert_abs_diff_eq!(a[2], 1.0, epsilon = 5e-3);
    }

    #[test]
    fn test_sinusoid_reconstruction_bound() {
        let signal = sine(4096, 0.25);
        for order in [2, 4] {
            let coder = LpcCoder::new(order);
            let (coefficients, metadata) = coder.encode(&signal).unwrap();
            let decoded = coder.decode(&coefficients, &metadata).unwrap();
            assert_eq!(decoded.len(), signal.len());
            // The seed samples come back exactly (up to rounding).
            assert!(max_error(&decoded[..order], &signal[..order]) < 1e-12);
            // The free-running predictor tracks the signal over a short horizon.
            assert!(max_error(&decoded[..64], &signal[..64]) < 0.05, "order {}", order);
        }
    }

    #[test]
    fn test_zero_signal_is_degenerate() {
        let coder = LpcCoder::new(4);
        let signal = vec![0.0; 32];
        let (coefficients, metadata) = coder.encode(&signal).unwrap();
        assert!(coefficients.is_empty());
        assert_eq!(metadata.status, CoefficientStatus::ZeroEnergy);
        assert!(!metadata.status.is_usable());
        let decoded = coder.decode(&coefficients, &metadata).unwrap();
        assert_eq!(decoded, signal);
    }

    #[test]
    fn test_constant_signal_decodes_to_constant() {
        let coder = LpcCoder::new(3);
        let signal = vec![5.0; 20];
        let (coefficients, metadata) = coder.encode(&signal).unwrap();
        assert!(coefficients.is_empty());
        let decoded = coder.decode(&coefficients, &metadata).unwrap();
        assert_eq!(decoded, signal);
    }

    #[test]
    fn test_short_signal_is_insufficient() {
        let coder = LpcCoder::new(3);
        let signal = vec![1.0, -2.0, 0.5];
        let (coefficients, metadata) = coder.encode(&signal).unwrap();
        assert!(coefficients.is_empty());
        assert_eq!(metadata.status, CoefficientStatus::InsufficientData);
        assert_eq!(metadata.initial_samples, signal);
        let decoded = coder.decode(&coefficients, &metadata).unwrap();
        assert!(max_error(&decoded, &signal) < 1e-12);
    }

    #[test]
    fn test_recursion_truncates_on_non_positive_energy() {
        let r = Array1::from(vec![1.0, 1.0, 1.0]);
        let (a, status) = levinson_durbin(r.view(), 2);
        assert_eq!(status, CoefficientStatus::Truncated { at: 1 });
        assert!(status.is_usable());
        assert_abs_diff_eq!(a, Array1::from(vec![1.0, -1.0, 0.0]));
    }

    #[test]
    fn test_enhancement_is_opt_in() {
        let mut samples = Array1::from(vec![0.1, -0.3, 0.5, -0.9]);
        enhance(&mut samples, &EnhancementConfig::default());
        assert_abs_diff_eq!(samples, Array1::from(vec![1.0, -3.0, 0.5, -0.9]), epsilon = 1e-12);

        let signal = sine(512, 0.3);
        let plain = LpcCoder::new(2);
        let boosted = LpcCoder::new(2).with_enhancement(EnhancementConfig::default());
        let (coefficients, metadata) = plain.encode(&signal).unwrap();
        let a = plain.decode(&coefficients, &metadata).unwrap();
        let b = boosted.decode(&coefficients, &metadata).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_metadata_survives_json() {
        let coder = LpcCoder::new(2);
        let signal = sine(256, 0.4);
        let (coefficients, metadata) = coder.encode(&signal).unwrap();
        let json = serde_json::to_string(&metadata).unwrap();
        let restored: LpcMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, metadata);
        assert_eq!(
            coder.decode(&coefficients, &restored).unwrap(),
            coder.decode(&coefficients, &metadata).unwrap()
        );
    }
}
