use std::fmt;
use std::path::PathBuf;

use ndarray::parallel::prelude::*;
use ndarray::{Array3, Axis};
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::enums::SortBy;
use crate::metadata::MetadataIndex;
use crate::slice_reader::Slice;
use crate::volume::Volume;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("No slices to assemble")]
    Empty,

    #[error("Slices belong to {} different series: {}", .uids.len(), .uids.join(", "))]
    MixedSeries { uids: Vec<String> },

    #[error("{}: inconsistent geometry ({reason})", .path.display())]
    InconsistentGeometry { path: PathBuf, reason: String },

    #[error("Series load cancelled")]
    Cancelled,
}

/// Non-fatal findings of a series load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// Some slice gap deviates from the median by more than the tolerance.
    NonUniformSpacing { median: f64, min: f64, max: f64 },
    /// No PixelSpacing in the header, 1 mm assumed.
    MissingPixelSpacing,
    /// Positions or orientation unusable, slices ordered by InstanceNumber.
    OrderedByInstanceNumber,
    /// A file of the directory that did not make it into the volume.
    RejectedFile { path: PathBuf, reason: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::NonUniformSpacing { median, min, max } => write!(
                f,
                "non-uniform slice spacing: median {median:.3} mm, gaps from {min:.3} to {max:.3} mm"
            ),
            LoadWarning::MissingPixelSpacing => f.write_str("missing pixel spacing, 1 mm assumed"),
            LoadWarning::OrderedByInstanceNumber => {
                f.write_str("no usable slice positions, ordered by instance number")
            }
            LoadWarning::RejectedFile { path, reason } => {
                write!(f, "rejected {}: {reason}", path.display())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Allowed relative deviation of a slice gap from the median gap.
    pub spacing_tolerance: f64,
    /// Absolute tolerance for comparing spacing and direction cosines.
    pub geometry_tolerance: f64,
    pub cancel: Option<CancelToken>,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            spacing_tolerance: 0.05,
            geometry_tolerance: 1e-4,
            cancel: None,
        }
    }
}

impl AssembleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spacing_tolerance(mut self, tolerance: f64) -> Self {
        self.spacing_tolerance = tolerance;
        self
    }

    pub fn with_geometry_tolerance(mut self, tolerance: f64) -> Self {
        self.geometry_tolerance = tolerance;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Result of a successful series load.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub volume: Volume,
    pub metadata: MetadataIndex,
    pub sort_by: SortBy,
    pub warnings: Vec<LoadWarning>,
}

pub struct SeriesAssembler;

impl SeriesAssembler {
    /// Order the slices of one series and stack them into a volume.
    ///
    /// # Errors
    ///
    /// Fails when the input is empty, mixes series, has inconsistent
    /// geometry or the cancel token fires. Nothing is returned on failure.
    pub fn assemble(
        slices: Vec<Slice>,
        options: &AssembleOptions,
    ) -> Result<LoadedSeries, SeriesError> {
        let first = slices.first().ok_or(SeriesError::Empty)?;

        let mut uids: Vec<String> = Vec::new();
        for slice in &slices {
            if !uids.contains(&slice.series_instance_uid) {
                uids.push(slice.series_instance_uid.clone());
            }
        }
        if uids.len() > 1 {
            return Err(SeriesError::MixedSeries { uids });
        }

        Self::validate_geometry(&slices, options.geometry_tolerance)?;

        let mut warnings = Vec::new();
        let (rows, columns) = (first.rows, first.columns);
        let pixel_spacing = first.pixel_spacing.unwrap_or_else(|| {
            warnings.push(LoadWarning::MissingPixelSpacing);
            (1.0, 1.0)
        });
        let fallback_spacing = first
            .spacing_between_slices
            .or(first.slice_thickness)
            .filter(|s| *s > 0.0)
            .unwrap_or(1.0);

        let positions = Self::projected_positions(&slices);
        let sort_by = if positions.is_some() {
            SortBy::ImagePositionPatient
        } else {
            if slices.len() > 1 {
                warnings.push(LoadWarning::OrderedByInstanceNumber);
            }
            SortBy::InstanceNumber
        };
        let order = Self::sort_order(&slices, positions.as_deref());

        let slice_spacing = match &positions {
            Some(positions) => {
                let sorted: Vec<f64> = order.iter().map(|&i| positions[i]).collect();
                let (spacing, warning) =
                    Self::slice_spacing(&sorted, options.spacing_tolerance, fallback_spacing);
                warnings.extend(warning);
                spacing
            }
            None => fallback_spacing,
        };

        let ordered = Self::apply_order(slices, &order);
        let origin = ordered[0].image_position.unwrap_or_default();
        let direction = ordered[0].image_orientation;
        let default_window = ordered[0].default_window;

        let mut data = Array3::<f32>::zeros((ordered.len(), rows, columns));
        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(ordered.par_iter())
            .try_for_each(|(mut plane, slice)| {
                if options.is_cancelled() {
                    return Err(SeriesError::Cancelled);
                }
                plane.assign(&slice.physical());
                Ok(())
            })?;

        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        tracing::debug!(
            slices = ordered.len(),
            rows,
            columns,
            slice_spacing,
            ?sort_by,
            "assembled series"
        );

        let series_tags = ordered[0].tags.clone();
        let slice_tags = ordered.into_iter().map(|slice| slice.tags).collect();

        let volume = Volume::new(
            data,
            (pixel_spacing.0, pixel_spacing.1, slice_spacing),
            origin,
        )
        .with_direction(direction)
        .with_default_window(default_window);

        Ok(LoadedSeries {
            volume,
            metadata: MetadataIndex::new(series_tags, slice_tags),
            sort_by,
            warnings,
        })
    }

    fn validate_geometry(slices: &[Slice], tolerance: f64) -> Result<(), SeriesError> {
        for slice in slices {
            let (rows, columns) = slice.samples.dim();
            if (rows, columns) != (slice.rows, slice.columns) {
                return Err(SeriesError::InconsistentGeometry {
                    path: slice.path.clone(),
                    reason: format!(
                        "{rows}x{columns} samples for a {}x{} header",
                        slice.rows, slice.columns
                    ),
                });
            }
        }

        let close = |a: &[f64], b: &[f64]| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance);
        Self::check_shared(
            slices,
            "image size",
            |a, b| (a.rows, a.columns) == (b.rows, b.columns),
            |s| format!("{}x{}", s.rows, s.columns),
        )?;
        Self::check_shared(
            slices,
            "pixel spacing",
            |a, b| match (a.pixel_spacing, b.pixel_spacing) {
                (Some(a), Some(b)) => close(&[a.0, a.1], &[b.0, b.1]),
                (None, None) => true,
                _ => false,
            },
            |s| format!("{:?}", s.pixel_spacing),
        )?;
        Self::check_shared(
            slices,
            "orientation",
            |a, b| match (a.image_orientation, b.image_orientation) {
                (Some(a), Some(b)) => close(&a, &b),
                (None, None) => true,
                _ => false,
            },
            |s| format!("{:?}", s.image_orientation),
        )
    }

    /// Compare every slice against the value most slices agree on and
    /// blame the first one that differs.
    fn check_shared(
        slices: &[Slice],
        what: &str,
        same: impl Fn(&Slice, &Slice) -> bool,
        describe: impl Fn(&Slice) -> String,
    ) -> Result<(), SeriesError> {
        let mut reference = &slices[0];
        let mut votes = 0;
        for candidate in slices {
            let agreeing = slices.iter().filter(|s| same(candidate, s)).count();
            if agreeing > votes {
                reference = candidate;
                votes = agreeing;
            }
        }
        if votes == slices.len() {
            return Ok(());
        }

        match slices.iter().find(|s| !same(reference, s)) {
            Some(odd) => Err(SeriesError::InconsistentGeometry {
                path: odd.path.clone(),
                reason: format!(
                    "{what} {}, {} of {} slices (like {}) have {}",
                    describe(odd),
                    votes,
                    slices.len(),
                    reference.path.display(),
                    describe(reference)
                ),
            }),
            None => Ok(()),
        }
    }

    /// Position of every slice along the common normal, `None` when any
    /// slice lacks a position or the orientation is missing or degenerate.
    fn projected_positions(slices: &[Slice]) -> Option<Vec<f64>> {
        let normal = slice_normal(&slices[0].image_orientation?)?;
        slices
            .iter()
            .map(|slice| slice.image_position.map(|p| dot(&p, &normal)))
            .collect()
    }

    fn sort_order(slices: &[Slice], positions: Option<&[f64]>) -> Vec<usize> {
        let mut order: Vec<usize> = (0..slices.len()).collect();
        // stable: equal keys keep discovery order
        order.sort_by(|&a, &b| {
            let by_position = match positions {
                Some(p) => p[a].total_cmp(&p[b]),
                None => std::cmp::Ordering::Equal,
            };
            by_position.then_with(|| slices[a].instance_number.cmp(&slices[b].instance_number))
        });
        order
    }

    /// Median gap between consecutive positions, plus a warning when the
    /// gaps are not uniform.
    fn slice_spacing(
        sorted_positions: &[f64],
        tolerance: f64,
        fallback: f64,
    ) -> (f64, Option<LoadWarning>) {
        let mut gaps: Vec<f64> = sorted_positions.windows(2).map(|w| w[1] - w[0]).collect();
        if gaps.is_empty() {
            return (fallback, None);
        }
        let (min, max) = gaps
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &g| {
                (lo.min(g), hi.max(g))
            });
        gaps.sort_by(f64::total_cmp);
        let mid = gaps.len() / 2;
        let median = if gaps.len() % 2 == 0 {
            (gaps[mid - 1] + gaps[mid]) / 2.0
        } else {
            gaps[mid]
        };

        if median <= f64::EPSILON {
            let warning = LoadWarning::NonUniformSpacing { median, min, max };
            return (fallback, Some(warning));
        }
        let uniform = gaps
            .iter()
            .all(|g| (g - median).abs() <= tolerance * median);
        let warning = (!uniform).then_some(LoadWarning::NonUniformSpacing { median, min, max });
        (median, warning)
    }

    fn apply_order(slices: Vec<Slice>, order: &[usize]) -> Vec<Slice> {
        let mut slots: Vec<Option<Slice>> = slices.into_iter().map(Some).collect();
        order.iter().filter_map(|&i| slots[i].take()).collect()
    }
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Unit normal of the plane spanned by the row and column cosines.
fn slice_normal(orientation: &[f64; 6]) -> Option<[f64; 3]> {
    let (r, c) = (&orientation[..3], &orientation[3..]);
    let n = [
        r[1] * c[2] - r[2] * c[1],
        r[2] * c[0] - r[0] * c[2],
        r[0] * c[1] - r[1] * c[0],
    ];
    let norm = dot(&n, &n).sqrt();
    if norm < 1e-6 {
        return None;
    }
    Some([n[0] / norm, n[1] / norm, n[2] / norm])
}
