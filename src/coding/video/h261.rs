use std::path::Path;

use log::{debug, info};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::motion::{reconstruct, residual, Frame, MotionField, MotionSearch};
use super::y4m::Y4mReader;
use crate::coding::{Coder, Media, Result};
use crate::config::VideoConfig;
use crate::error::Error;

/// One coded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodedFrame {
    /// Stored as-is
    Intra(Frame),
    /// Motion vectors against the previous frame and the (quantized) residual
    Predicted {
        motion: MotionField,
        residual: Array2<i16>,
    },
}

/// Coded frame sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodedVideo {
    pub frames: Vec<EncodedFrame>,
}

/// Side-channel data for a coded frame sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub frame_count: usize,
    /// `(height, width)` after cropping to whole blocks
    pub frame_shape: (usize, usize),
    pub block_size: usize,
    pub search_range: usize,
    pub residual_step: u8,
}

/// H.261-style inter-frame coder.
///
/// The first frame is stored intra. Every later frame is predicted from the
/// previous *source* frame during encoding and from the previous *decoded*
/// frame during decoding. With a residual step of 1 the two agree exactly;
/// with coarser steps quantization error carries from frame to frame.
#[derive(Debug, Clone)]
pub struct H261Coder {
    search: MotionSearch,
    max_frames: usize,
    residual_step: u8,
}

impl Default for H261Coder {
    fn default() -> Self {
        Self::from_config(&VideoConfig::default())
    }
}

impl H261Coder {
    pub fn new(block_size: usize, search_range: usize) -> Self {
        let config = VideoConfig {
            block_size,
            search_range,
            ..VideoConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        info!(
            "Initialized H.261 Coder with block_size={}, search_range={}",
            config.block_size, config.search_range
        );
        Self {
            search: MotionSearch::from_config(config),
            max_frames: config.max_frames.max(1),
            residual_step: config.residual_step.max(1),
        }
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames.max(1);
        self
    }

    pub fn with_residual_step(mut self, residual_step: u8) -> Self {
        self.residual_step = residual_step.max(1);
        self
    }

    pub fn with_parallel_search(mut self, parallel: bool) -> Self {
        self.search = self.search.with_parallel(parallel);
        self
    }

    pub fn search(&self) -> &MotionSearch {
        &self.search
    }

    /// Encodes in-memory frames.
    ///
    /// Frames are cropped to whole blocks and must all share the first
    /// frame's shape. At most `max_frames` frames are coded.
    pub fn encode_frames(&self, frames: &[Frame]) -> Result<(EncodedVideo, VideoMetadata)> {
        let total = frames.len().min(self.max_frames);
        let mut encoded = EncodedVideo::default();
        let mut previous: Option<Frame> = None;

        for (i, frame) in frames.iter().take(total).enumerate() {
            let current = self.search.crop(frame.view())?;
            let coded = match &previous {
                None => EncodedFrame::Intra(current.clone()),
                Some(reference) => {
                    if reference.dim() != current.dim() {
                        return Err(Error::invalid_input(format!(
                            "frame {} has shape {:?}, expected {:?}",
                            i,
                            current.dim(),
                            reference.dim()
                        )));
                    }
                    let motion = self.search.estimate(current.view(), reference.view())?;
                    let predicted = self.search.compensate(reference.view(), &motion)?;
                    let residual = residual(current.view(), predicted.view(), self.residual_step)?;
                    EncodedFrame::Predicted { motion, residual }
                }
            };
            encoded.frames.push(coded);
            previous = Some(current);

            if (i + 1) % 10 == 0 {
                info!("-> Processed frame {}/{}", i + 1, total);
            }
        }

        let metadata = VideoMetadata {
            frame_count: encoded.frames.len(),
            frame_shape: previous.map(|frame| frame.dim()).unwrap_or((0, 0)),
            block_size: self.search.block_size(),
            search_range: self.search.search_range(),
            residual_step: self.residual_step,
        };
        info!(
            "Finished encoding video. Total frames processed: {}",
            metadata.frame_count
        );
        Ok((encoded, metadata))
    }
}

impl Coder for H261Coder {
    const MEDIA: Media = Media::Video;
    type Input = Path;
    type Encoded = EncodedVideo;
    type Metadata = VideoMetadata;
    type Output = Vec<Frame>;

    fn algorithm_name(&self) -> &'static str {
        "H.261 (Motion Estimation & Compensation)"
    }

    fn encode(&self, path: &Path) -> Result<(EncodedVideo, VideoMetadata)> {
        info!("Encoding data with {}", self.algorithm_name());
        info!("Starting to encode video file: {}", path.display());
        let reader = Y4mReader::open(path)?;
        debug!("Processing up to {} frames", self.max_frames);
        let frames = reader.take(self.max_frames).collect::<Result<Vec<_>>>()?;
        self.encode_frames(&frames)
    }

    fn decode(&self, encoded: &EncodedVideo, metadata: &VideoMetadata) -> Result<Vec<Frame>> {
        info!("Decoding data with {}", self.algorithm_name());
        let search = MotionSearch::new(metadata.block_size, metadata.search_range);
        let mut decoded: Vec<Frame> = Vec::with_capacity(encoded.frames.len());

        for (i, frame) in encoded.frames.iter().enumerate() {
            let frame = match frame {
                EncodedFrame::Intra(frame) => frame.clone(),
                EncodedFrame::Predicted { motion, residual } => {
                    let reference = decoded.last().ok_or_else(|| {
                        Error::invalid_input(format!("predicted frame {} has no reference", i))
                    })?;
                    let predicted = search.compensate(reference.view(), motion)?;
                    reconstruct(predicted.view(), residual.view(), metadata.residual_step)?
                }
            };
            decoded.push(frame);
        }

        info!("Decoded {} frames.", decoded.len());
        Ok(decoded)
    }
}
