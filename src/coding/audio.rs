//! Audio coding algorithms.
//!
//! Signals are plain `f64` sample sequences; reading and writing audio files
//! is left to the caller.

pub mod lpc;

pub use lpc::{
    autocorrelation, enhance, levinson_durbin, lpc_coefficients, CoefficientStatus, LpcCoder,
    LpcMetadata,
};
