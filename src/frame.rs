//! 2D frames cut from a [`Volume`] and windowed for display.

use image::{ImageBuffer, Luma};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};
use thiserror::Error;

use crate::enums::{Interpolation, Orientation};
use crate::interpolator::Interpolator;
use crate::transform::WindowLevel;
use crate::volume::Volume;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("{orientation} index {index} out of range 0..{extent}")]
    IndexOutOfRange {
        orientation: Orientation,
        index: usize,
        extent: usize,
    },
}

/// Windowed plane ready for a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub orientation: Orientation,
    pub index: usize,
    /// Normalized display values in `[0, 1]`, shaped (height, width).
    pub data: Array2<f32>,
    /// Physical size of one output pixel as (row spacing, column spacing)
    /// in millimeters, after any resampling.
    pub pixel_spacing: (f64, f64),
}

impl Frame {
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// 8-bit grayscale copy of the frame.
    pub fn to_image(&self) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let pixel_data: Vec<u8> = self
            .data
            .iter()
            .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        ImageBuffer::from_raw(self.width() as u32, self.height() as u32, pixel_data)
    }
}

/// Cut the plane at `index` along `orientation` and window it.
///
/// Axial frames keep the acquisition grid. Coronal and sagittal frames are
/// resampled along the slice axis so their pixels have the in-plane
/// spacing of the other frame axis.
///
/// # Errors
///
/// [`FrameError::IndexOutOfRange`] when `index` is not below
/// [`Volume::extent`] for `orientation`.
pub fn extract_frame(
    volume: &Volume,
    orientation: Orientation,
    index: usize,
    window: &WindowLevel,
    interpolation: Interpolation,
) -> Result<Frame, FrameError> {
    let plane = volume
        .get_slice_from_axis(index, orientation)
        .ok_or(FrameError::IndexOutOfRange {
            orientation,
            index,
            extent: volume.extent(orientation),
        })?;
    let (row_spacing, column_spacing, slice_spacing) = volume.spacing();
    let (source_height, width) = plane.dim();

    let (height, pixel_spacing) = match orientation {
        Orientation::Axial => (source_height, (row_spacing, column_spacing)),
        Orientation::Coronal | Orientation::Sagittal => {
            let in_plane = if orientation == Orientation::Coronal {
                column_spacing
            } else {
                row_spacing
            };
            let height = Interpolator::resampled_len(source_height, slice_spacing, in_plane);
            let resampled = source_height as f64 * slice_spacing / height as f64;
            (height, (resampled, in_plane))
        }
    };

    let mut data = Array2::<f32>::zeros((height, width));
    data.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            let src_y = Interpolator::source_coordinate(y, height, source_height);
            for (x, out) in row.iter_mut().enumerate() {
                let value = if height == source_height {
                    plane[[y, x]]
                } else {
                    Interpolator::sample(&plane, src_y, x, interpolation)
                };
                *out = window.apply(value as f64) as f32;
            }
        });

    Ok(Frame {
        orientation,
        index,
        data,
        pixel_spacing,
    })
}
