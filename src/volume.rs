use crate::enums::Orientation;
use crate::transform::WindowLevel;

use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;

/// Physical intensities of a series on a regular grid.
///
/// Data is laid out `[slice, row, column]`; slices are in ascending order
/// along the slice normal.
#[derive(Debug, Clone, Default)]
pub struct Volume {
    data: Array3<f32>,
    spacing: (f64, f64, f64),
    origin: [f64; 3],
    direction: Option<[f64; 6]>,
    default_window: Option<WindowLevel>,
    value_range: (f32, f32),
}

impl Volume {
    /// `spacing` is (row spacing, column spacing, slice spacing) in millimeters.
    pub fn new(data: Array3<f32>, spacing: (f64, f64, f64), origin: [f64; 3]) -> Self {
        let value_range = data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let value_range = if data.is_empty() {
            (0.0, 0.0)
        } else {
            value_range
        };
        Self {
            data,
            spacing,
            origin,
            direction: None,
            default_window: None,
            value_range,
        }
    }

    pub fn with_direction(mut self, direction: Option<[f64; 6]>) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_default_window(mut self, window: Option<WindowLevel>) -> Self {
        self.default_window = window;
        self
    }

    /// Get the dimensions as (rows, columns, slices)
    pub fn dimensions(&self) -> (usize, usize, usize) {
        let (depth, height, width) = self.data.dim();
        (height, width, depth)
    }

    /// Get the storage dimensions (slices, rows, columns)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// (row spacing, column spacing, slice spacing) in millimeters
    pub fn spacing(&self) -> (f64, f64, f64) {
        self.spacing
    }

    /// Patient position of the top-left pixel of the first slice
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Row and column direction cosines shared by every slice, if known
    pub fn direction(&self) -> Option<[f64; 6]> {
        self.direction
    }

    /// Window stored in the header of the first slice
    pub fn default_window(&self) -> Option<WindowLevel> {
        self.default_window
    }

    /// Smallest and largest physical value
    pub fn value_range(&self) -> (f32, f32) {
        self.value_range
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Number of frames available along `orientation`
    pub fn extent(&self, orientation: Orientation) -> usize {
        let (depth, height, width) = self.data.dim();
        match orientation {
            Orientation::Axial => depth,
            Orientation::Coronal => height,
            Orientation::Sagittal => width,
        }
    }

    /// Unresampled plane at `index`, `None` when out of range.
    ///
    /// Coronal planes are (slices, columns), sagittal planes (slices, rows).
    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ArrayView2<'_, f32>> {
        if index >= self.extent(orientation) {
            return None;
        }
        let slice_result = match orientation {
            Orientation::Axial => self.data.slice(s![index, .., ..]),
            Orientation::Coronal => self.data.slice(s![.., index, ..]),
            Orientation::Sagittal => self.data.slice(s![.., .., index]),
        };
        Some(slice_result)
    }
}
