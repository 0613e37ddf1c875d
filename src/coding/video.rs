//! Video coding algorithms.
//!
//! - `motion`: block motion estimation, compensation and residuals
//! - `y4m`: YUV4MPEG2 frame source and sink
//! - `h261`: the inter-frame coder built on them

pub mod h261;
pub mod motion;
pub mod y4m;

pub use h261::{EncodedFrame, EncodedVideo, H261Coder, VideoMetadata};
pub use motion::{
    reconstruct, reconstruction_drift, residual, Frame, MotionField, MotionSearch, MotionVector,
};
pub use y4m::{save_frames, write_frames, Y4mReader};
