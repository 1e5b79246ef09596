use ndarray::ArrayView2;

use crate::enums::Interpolation;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Number of output rows needed to cover `len` samples spaced `spacing`
    /// apart with pixels of `target_spacing`.
    pub(crate) fn resampled_len(len: usize, spacing: f64, target_spacing: f64) -> usize {
        if len == 0 || !(spacing > 0.0) || !(target_spacing > 0.0) {
            return len;
        }
        ((len as f64 * spacing / target_spacing).round() as usize).max(1)
    }

    /// Source row coordinate for output row `y`, pixel centers aligned.
    #[inline]
    pub(crate) fn source_coordinate(y: usize, output_len: usize, source_len: usize) -> f32 {
        if output_len == source_len {
            return y as f32;
        }
        let norm_y = (y as f32 + 0.5) / output_len as f32;
        let src_y = norm_y * source_len as f32 - 0.5;
        src_y.max(0.0).min((source_len - 1) as f32)
    }

    #[inline]
    pub(crate) fn sample(
        plane: &ArrayView2<f32>,
        y: f32,
        x: usize,
        interpolation: Interpolation,
    ) -> f32 {
        match interpolation {
            Interpolation::Nearest => {
                let (height, _) = plane.dim();
                let row = (y.round() as usize).min(height - 1);
                plane[[row, x]]
            }
            Interpolation::Linear => Self::bilinear_interpolate(plane, y, x as f32),
        }
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v00 = slice[[y0, x0]];
        let v01 = slice[[y0, x1]];
        let v10 = slice[[y1, x0]];
        let v11 = slice[[y1, x1]];

        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }
}
