//! Block motion estimation and compensation.
//!
//! Frames are single-channel `u8` intensity planes. A frame is tiled into
//! square blocks; each block of the current frame is matched against every
//! block-sized window of the reference frame within `±search_range` pixels,
//! scored by the sum of squared differences (SSD).

use log::debug;
use ndarray::{s, Array2, ArrayView2, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::VideoConfig;
use crate::error::{Error, Result};

/// A single-channel intensity frame, indexed `[row, column]`.
pub type Frame = Array2<u8>;

/// One motion vector per block, indexed `[block_row, block_column]`.
pub type MotionField = Array2<MotionVector>;

/// Displacement from a block to its best match in the reference frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotionVector {
    pub dy: i32,
    pub dx: i32,
}

impl MotionVector {
    pub const ZERO: MotionVector = MotionVector { dy: 0, dx: 0 };

    pub fn new(dy: i32, dx: i32) -> Self {
        Self { dy, dx }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Full-search block matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSearch {
    block_size: usize,
    search_range: usize,
    parallel: bool,
}

impl Default for MotionSearch {
    fn default() -> Self {
        Self::from_config(&VideoConfig::default())
    }
}

impl MotionSearch {
    /// Creates a new block matcher.
    ///
    /// # Arguments
    ///
    /// * `block_size` - side length of the square blocks (at least 1)
    /// * `search_range` - maximum displacement searched along each axis
    pub fn new(block_size: usize, search_range: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            search_range,
            parallel: true,
        }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        Self::new(config.block_size, config.search_range).with_parallel(config.parallel_search)
    }

    /// Search the blocks of a frame on the rayon thread pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn search_range(&self) -> usize {
        self.search_range
    }

    /// Number of whole blocks along each axis of a frame.
    pub fn grid_shape(&self, frame_shape: (usize, usize)) -> (usize, usize) {
        (frame_shape.0 / self.block_size, frame_shape.1 / self.block_size)
    }

    /// Crop a frame to a whole number of blocks along each axis.
    ///
    /// Fails when the frame is smaller than one block.
    pub fn crop(&self, frame: ArrayView2<u8>) -> Result<Frame> {
        let (rows, cols) = self.grid_shape(frame.dim());
        if rows == 0 || cols == 0 {
            return Err(Error::invalid_input(format!(
                "frame of {}x{} pixels is smaller than one {}x{} block",
                frame.ncols(),
                frame.nrows(),
                self.block_size,
                self.block_size
            )));
        }
        Ok(frame
            .slice(s![..rows * self.block_size, ..cols * self.block_size])
            .to_owned())
    }

    /// Estimates one motion vector per block of `current` against `reference`.
    ///
    /// # Returns
    ///
    /// A motion field with one entry per whole block. Each block keeps the
    /// zero vector unless some in-bounds candidate has a strictly smaller
    /// SSD; candidates are scanned by `dy` then `dx`, both ascending.
    pub fn estimate(
        &self,
        current: ArrayView2<u8>,
        reference: ArrayView2<u8>,
    ) -> Result<MotionField> {
        if current.dim() != reference.dim() {
            return Err(Error::invalid_input(format!(
                "current frame {:?} and reference frame {:?} differ in shape",
                current.dim(),
                reference.dim()
            )));
        }
        let (rows, cols) = self.grid_shape(current.dim());
        let search_block =
            |index: usize| self.search_block(current, reference, index / cols, index % cols);

        let vectors: Vec<MotionVector> = if self.parallel {
            (0..rows * cols).into_par_iter().map(search_block).collect()
        } else {
            (0..rows * cols).map(search_block).collect()
        };
        let field = Array2::from_shape_vec((rows, cols), vectors)?;
        debug!(
            "Estimated {}x{} motion field, {} non-zero vectors",
            rows,
            cols,
            field.iter().filter(|v| !v.is_zero()).count()
        );
        Ok(field)
    }

    fn search_block(
        &self,
        current: ArrayView2<u8>,
        reference: ArrayView2<u8>,
        block_row: usize,
        block_col: usize,
    ) -> MotionVector {
        let bs = self.block_size;
        let (y, x) = (block_row * bs, block_col * bs);
        let block = current.slice(s![y..y + bs, x..x + bs]);

        let mut best = MotionVector::ZERO;
        let mut min_error = self
            .candidate(reference, y, x, best)
            .map(|candidate| ssd(block, candidate))
            .unwrap_or(u64::MAX);

        // Displacements beyond the frame never yield an in-bounds window.
        let (height, width) = reference.dim();
        let range = self.search_range.min(height.max(width)).min(i32::MAX as usize) as i32;
        for dy in -range..=range {
            for dx in -range..=range {
                let vector = MotionVector::new(dy, dx);
                if let Some(candidate) = self.candidate(reference, y, x, vector) {
                    let error = ssd(block, candidate);
                    if error < min_error {
                        min_error = error;
                        best = vector;
                    }
                }
            }
        }
        best
    }

    /// The reference window displaced from block origin `(y, x)`, if it
    /// lies entirely inside the frame.
    fn candidate<'a>(
        &self,
        reference: ArrayView2<'a, u8>,
        y: usize,
        x: usize,
        vector: MotionVector,
    ) -> Option<ArrayView2<'a, u8>> {
        let bs = self.block_size as i64;
        let ref_y = y as i64 + vector.dy as i64;
        let ref_x = x as i64 + vector.dx as i64;
        let (height, width) = reference.dim();
        if ref_y < 0 || ref_x < 0 || ref_y + bs > height as i64 || ref_x + bs > width as i64 {
            return None;
        }
        let (ref_y, ref_x) = (ref_y as usize, ref_x as usize);
        let bs = self.block_size;
        Some(reference.slice_move(s![ref_y..ref_y + bs, ref_x..ref_x + bs]))
    }

    /// Builds a prediction of the next frame from `reference` and a motion field.
    ///
    /// Each block is copied from the reference window its vector points to.
    /// Blocks whose window falls outside the frame, and pixels outside the
    /// block grid, stay zero.
    pub fn compensate(&self, reference: ArrayView2<u8>, field: &MotionField) -> Result<Frame> {
        let (rows, cols) = self.grid_shape(reference.dim());
        if field.dim() != (rows, cols) {
            return Err(Error::invalid_input(format!(
                "motion field {:?} does not match the {:?} block grid",
                field.dim(),
                (rows, cols)
            )));
        }

        let bs = self.block_size;
        let mut compensated = Frame::zeros(reference.dim());
        for ((block_row, block_col), &vector) in field.indexed_iter() {
            let (y, x) = (block_row * bs, block_col * bs);
            if let Some(source) = self.candidate(reference, y, x, vector) {
                compensated.slice_mut(s![y..y + bs, x..x + bs]).assign(&source);
            }
        }
        Ok(compensated)
    }
}

fn ssd(a: ArrayView2<u8>, b: ArrayView2<u8>) -> u64 {
    Zip::from(&a).and(&b).fold(0u64, |acc, &p, &q| {
        let d = p.abs_diff(q) as u64;
        acc + d * d
    })
}

/// Residual `current - predicted`, quantized by `step`.
///
/// With a step of 1 the residual is exact. Larger steps store
/// `round(r / step)`.
pub fn residual(
    current: ArrayView2<u8>,
    predicted: ArrayView2<u8>,
    step: u8,
) -> Result<Array2<i16>> {
    if current.dim() != predicted.dim() {
        return Err(Error::invalid_input(format!(
            "frame {:?} and prediction {:?} differ in shape",
            current.dim(),
            predicted.dim()
        )));
    }
    let step = step.max(1);
    Ok(Zip::from(&current).and(&predicted).map_collect(|&c, &p| {
        let r = c as i16 - p as i16;
        if step == 1 {
            r
        } else {
            (r as f64 / step as f64).round() as i16
        }
    }))
}

/// Adds a dequantized residual to a prediction, clipping to `0..=255`.
pub fn reconstruct(
    predicted: ArrayView2<u8>,
    residual: ArrayView2<i16>,
    step: u8,
) -> Result<Frame> {
    if predicted.dim() != residual.dim() {
        return Err(Error::invalid_input(format!(
            "prediction {:?} and residual {:?} differ in shape",
            predicted.dim(),
            residual.dim()
        )));
    }
    let step = step.max(1) as i32;
    Ok(Zip::from(&predicted)
        .and(&residual)
        .map_collect(|&p, &r| (p as i32 + r as i32 * step).clamp(0, 255) as u8))
}

/// Mean absolute error between each original frame and its decoded counterpart.
pub fn reconstruction_drift(original: &[Frame], decoded: &[Frame]) -> Result<Vec<f64>> {
    if original.len() != decoded.len() {
        return Err(Error::invalid_input(format!(
            "{} original frames but {} decoded frames",
            original.len(),
            decoded.len()
        )));
    }
    original
        .iter()
        .zip(decoded)
        .map(|(a, b)| {
            if a.dim() != b.dim() {
                return Err(Error::invalid_input(format!(
                    "frame shapes {:?} and {:?} differ",
                    a.dim(),
                    b.dim()
                )));
            }
            if a.is_empty() {
                return Ok(0.0);
            }
            let total = Zip::from(a)
                .and(b)
                .fold(0u64, |acc, &p, &q| acc + p.abs_diff(q) as u64);
            Ok(total as f64 / a.len() as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(height: usize, width: usize) -> Frame {
        Array2::from_shape_fn((height, width), |(y, x)| ((y * 7 + x * 3) % 256) as u8)
    }

    fn textured(height: usize, width: usize) -> Frame {
        Array2::from_shape_fn((height, width), |(y, x)| {
            ((y * 37 + x * 91 + (y * x) % 13) % 251) as u8
        })
    }

    #[test]
    fn test_identical_frames() {
        let search = MotionSearch::new(16, 8);
        let frame = gradient(32, 32);
        let field = search.estimate(frame.view(), frame.view()).unwrap();
        assert_eq!(field.dim(), (2, 2));
        assert!(field.iter().all(MotionVector::is_zero));

        let predicted = search.compensate(frame.view(), &field).unwrap();
        let r = residual(frame.view(), predicted.view(), 1).unwrap();
        assert!(r.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_uniform_frames_prefer_zero_vector() {
        // Every candidate ties; the zero vector must win.
        let search = MotionSearch::new(8, 4);
        let frame = Frame::from_elem((32, 32), 90);
        let field = search.estimate(frame.view(), frame.view()).unwrap();
        assert!(field.iter().all(MotionVector::is_zero));
    }

    #[test]
    fn test_detects_translation() {
        let search = MotionSearch::new(8, 4);
        let reference = textured(32, 32);
        // Content moves down by 2 and right by 3.
        let current = Array2::from_shape_fn((32, 32), |(y, x)| {
            if y >= 2 && x >= 3 {
                reference[[y - 2, x - 3]]
            } else {
                0
            }
        });
        let field = search.estimate(current.view(), reference.view()).unwrap();
        // Interior blocks whose source window is in bounds find the exact match.
        for block_row in 1..4 {
            for block_col in 1..4 {
                assert_eq!(field[[block_row, block_col]], MotionVector::new(-2, -3));
            }
        }
        let predicted = search.compensate(reference.view(), &field).unwrap();
        assert_eq!(
            predicted.slice(s![8.., 8..]),
            current.slice(s![8.., 8..])
        );
    }

    #[test]
    fn test_search_range_beyond_frame() {
        let reference = textured(16, 24);
        let current =
            Array2::from_shape_fn((16, 24), |(y, x)| reference[[(y + 3) % 16, (x + 5) % 24]]);
        let bounded = MotionSearch::new(8, 24).with_parallel(false);
        let unbounded = MotionSearch::new(8, usize::MAX).with_parallel(false);
        assert_eq!(
            unbounded.estimate(current.view(), reference.view()).unwrap(),
            bounded.estimate(current.view(), reference.view()).unwrap()
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let reference = textured(48, 64);
        let current =
            Array2::from_shape_fn((48, 64), |(y, x)| reference[[(y + 1) % 48, (x + 5) % 64]]);
        let parallel = MotionSearch::new(16, 6).with_parallel(true);
        let sequential = MotionSearch::new(16, 6).with_parallel(false);
        assert_eq!(
            parallel.estimate(current.view(), reference.view()).unwrap(),
            sequential.estimate(current.view(), reference.view()).unwrap()
        );
    }

    #[test]
    fn test_out_of_bounds_vector_leaves_block_empty() {
        let search = MotionSearch::new(4, 2);
        let reference = Frame::from_elem((8, 8), 200);
        let mut field = MotionField::from_elem((2, 2), MotionVector::ZERO);
        field[[0, 0]] = MotionVector::new(-1, 0);
        let predicted = search.compensate(reference.view(), &field).unwrap();
        assert!(predicted.slice(s![..4, ..4]).iter().all(|&p| p == 0));
        assert!(predicted.slice(s![4.., ..]).iter().all(|&p| p == 200));
    }

    #[test]
    fn test_mismatched_shapes_rejected() {
        let search = MotionSearch::new(4, 2);
        let a = Frame::zeros((8, 8));
        let b = Frame::zeros((8, 12));
        assert!(matches!(search.estimate(a.view(), b.view()), Err(Error::InvalidInput(_))));
        let field = MotionField::from_elem((1, 1), MotionVector::ZERO);
        assert!(matches!(search.compensate(a.view(), &field), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_crop() {
        let search = MotionSearch::new(16, 8);
        let frame = gradient(40, 50);
        assert_eq!(search.crop(frame.view()).unwrap().dim(), (32, 48));
        let tiny = gradient(10, 50);
        assert!(matches!(search.crop(tiny.view()), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_quantized_residual_error_is_bounded() {
        let current = textured(8, 8);
        let predicted = gradient(8, 8);
        for step in [1u8, 2, 5, 16] {
            let r = residual(current.view(), predicted.view(), step).unwrap();
            let restored = reconstruct(predicted.view(), r.view(), step).unwrap();
            let drift = reconstruction_drift(&[current.clone()], &[restored.clone()]).unwrap();
            assert!(drift[0] <= step as f64 / 2.0, "step {}", step);
            for (&a, &b) in current.iter().zip(restored.iter()) {
                assert!(a.abs_diff(b) as f64 <= step as f64 / 2.0);
            }
        }
    }

    #[test]
    fn test_reconstruct_clips() {
        let predicted = Frame::from_elem((2, 2), 250);
        let r = Array2::from_elem((2, 2), 3i16);
        let restored = reconstruct(predicted.view(), r.view(), 4).unwrap();
        assert!(restored.iter().all(|&p| p == 255));
    }
}
