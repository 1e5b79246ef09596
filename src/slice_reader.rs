use std::path::{Path, PathBuf};

use dicom::core::Tag;
use dicom::core::value::Value;
use dicom::object::{DefaultDicomObject, open_file};
use dicom::pixeldata::{
    ConvertOptions, DecodedPixelData, ModalityLutOption, PixelDecoder, PixelRepresentation,
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, s};
use thiserror::Error;

use crate::metadata::{TagEntry, collect_tags};
use crate::transform::{WindowLevel, to_physical};

#[derive(Debug, Error)]
pub enum SliceError {
    #[error("{}: not a DICOM file ({reason})", .path.display())]
    NotDicom { path: PathBuf, reason: String },

    #[error("{}: no pixel data", .path.display())]
    MissingPixelData { path: PathBuf },

    #[error("{}: unsupported pixel encoding {transfer_syntax} ({reason})", .path.display())]
    UnsupportedEncoding {
        path: PathBuf,
        transfer_syntax: String,
        reason: String,
    },

    #[error("{}: {samples_per_pixel} samples per pixel, only grayscale is supported", .path.display())]
    UnsupportedPhotometric {
        path: PathBuf,
        samples_per_pixel: u16,
    },

    #[error("{}: multi-frame object with {frames} frames", .path.display())]
    MultiFrame { path: PathBuf, frames: u32 },

    #[error("{}: malformed image ({reason})", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SliceError {
    pub fn path(&self) -> &Path {
        match self {
            SliceError::NotDicom { path, .. }
            | SliceError::MissingPixelData { path }
            | SliceError::UnsupportedEncoding { path, .. }
            | SliceError::UnsupportedPhotometric { path, .. }
            | SliceError::MultiFrame { path, .. }
            | SliceError::Malformed { path, .. }
            | SliceError::Io { path, .. } => path,
        }
    }
}

/// Stored sample values of one image, in the type the header announces.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelSamples {
    U8(Array2<u8>),
    I8(Array2<i8>),
    U16(Array2<u16>),
    I16(Array2<i16>),
    U32(Array2<u32>),
    I32(Array2<i32>),
}

impl PixelSamples {
    /// (rows, columns)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            PixelSamples::U8(a) => a.dim(),
            PixelSamples::I8(a) => a.dim(),
            PixelSamples::U16(a) => a.dim(),
            PixelSamples::I16(a) => a.dim(),
            PixelSamples::U32(a) => a.dim(),
            PixelSamples::I32(a) => a.dim(),
        }
    }

    pub fn to_physical(&self, rescale_slope: f64, rescale_intercept: f64) -> Array2<f32> {
        let rescale = |v: f64| to_physical(v, rescale_slope, rescale_intercept) as f32;
        match self {
            PixelSamples::U8(a) => a.mapv(|v| rescale(v as f64)),
            PixelSamples::I8(a) => a.mapv(|v| rescale(v as f64)),
            PixelSamples::U16(a) => a.mapv(|v| rescale(v as f64)),
            PixelSamples::I16(a) => a.mapv(|v| rescale(v as f64)),
            PixelSamples::U32(a) => a.mapv(|v| rescale(v as f64)),
            PixelSamples::I32(a) => a.mapv(|v| rescale(v as f64)),
        }
    }
}

/// One image instance of a series.
#[derive(Debug, Clone)]
pub struct Slice {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub samples: PixelSamples,
    /// (row spacing, column spacing) in millimeters
    pub pixel_spacing: Option<(f64, f64)>,
    pub image_position: Option<[f64; 3]>,
    pub image_orientation: Option<[f64; 6]>,
    pub rescale_slope: f64,
    pub rescale_intercept: f64,
    pub instance_number: Option<i32>,
    pub series_instance_uid: String,
    pub study_instance_uid: String,
    pub slice_thickness: Option<f64>,
    pub spacing_between_slices: Option<f64>,
    pub default_window: Option<WindowLevel>,
    pub tags: Vec<TagEntry>,
}

impl Slice {
    pub fn physical(&self) -> Array2<f32> {
        self.samples
            .to_physical(self.rescale_slope, self.rescale_intercept)
    }
}

/// Read one DICOM file into a [`Slice`].
pub fn read_slice(path: impl AsRef<Path>) -> Result<Slice, SliceError> {
    let path = path.as_ref();
    std::fs::metadata(path).map_err(|source| SliceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let object = open_file(path).map_err(|err| SliceError::NotDicom {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    read_slice_from_object(path, &object)
}

/// Build a [`Slice`] from an already opened file object.
pub fn read_slice_from_object(
    path: impl AsRef<Path>,
    object: &DefaultDicomObject,
) -> Result<Slice, SliceError> {
    let path = path.as_ref();
    let malformed = |reason: String| SliceError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let pixel_data = object
        .element(tags::PIXEL_DATA)
        .map_err(|_| SliceError::MissingPixelData {
            path: path.to_path_buf(),
        })?;

    let rows = uint_value(object, tags::ROWS).ok_or_else(|| malformed("missing Rows".into()))?;
    let columns =
        uint_value(object, tags::COLUMNS).ok_or_else(|| malformed("missing Columns".into()))?;
    if rows == 0 || columns == 0 {
        return Err(malformed(format!("empty image {rows}x{columns}")));
    }

    let samples_per_pixel = uint_value(object, tags::SAMPLES_PER_PIXEL).unwrap_or(1);
    if samples_per_pixel != 1 {
        return Err(SliceError::UnsupportedPhotometric {
            path: path.to_path_buf(),
            samples_per_pixel: samples_per_pixel as u16,
        });
    }

    let frames = int_value(object, tags::NUMBER_OF_FRAMES).unwrap_or(1).max(1) as u32;
    if frames > 1 {
        return Err(SliceError::MultiFrame {
            path: path.to_path_buf(),
            frames,
        });
    }

    let transfer_syntax = object
        .meta()
        .transfer_syntax()
        .trim_end_matches('\0')
        .to_string();
    let encapsulated = matches!(pixel_data.value(), Value::PixelSequence(_));

    if !encapsulated {
        let bits_allocated = uint_value(object, tags::BITS_ALLOCATED)
            .ok_or_else(|| malformed("missing BitsAllocated".into()))?;
        let expected = rows * columns * (bits_allocated as usize).div_ceil(8);
        let actual = pixel_data
            .to_bytes()
            .map_err(|err| malformed(err.to_string()))?
            .len();
        if actual < expected {
            return Err(malformed(format!(
                "pixel data holds {actual} bytes, {rows}x{columns} image needs {expected}"
            )));
        }
    }

    let decoded = object.decode_pixel_data().map_err(|err| {
        if encapsulated {
            SliceError::UnsupportedEncoding {
                path: path.to_path_buf(),
                transfer_syntax: transfer_syntax.clone(),
                reason: err.to_string(),
            }
        } else {
            malformed(err.to_string())
        }
    })?;

    let samples = decode_samples(&decoded).map_err(malformed)?;
    if samples.dim() != (rows, columns) {
        let (r, c) = samples.dim();
        return Err(malformed(format!(
            "decoded {r}x{c} samples for a {rows}x{columns} header"
        )));
    }

    let pixel_spacing = float_values(object, tags::PIXEL_SPACING)
        .filter(|v| v.len() >= 2)
        .map(|v| (v[0], v[1]));
    let image_position = float_values(object, tags::IMAGE_POSITION_PATIENT)
        .and_then(|v| <[f64; 3]>::try_from(v.as_slice()).ok());
    let image_orientation = float_values(object, tags::IMAGE_ORIENTATION_PATIENT)
        .and_then(|v| <[f64; 6]>::try_from(v.as_slice()).ok());

    let default_window = match (
        first_float(object, tags::WINDOW_WIDTH),
        first_float(object, tags::WINDOW_CENTER),
    ) {
        (Some(width), Some(center)) => WindowLevel::new(width, center).ok(),
        _ => None,
    };

    Ok(Slice {
        path: path.to_path_buf(),
        rows,
        columns,
        samples,
        pixel_spacing,
        image_position,
        image_orientation,
        rescale_slope: first_float(object, tags::RESCALE_SLOPE).unwrap_or(1.0),
        rescale_intercept: first_float(object, tags::RESCALE_INTERCEPT).unwrap_or(0.0),
        instance_number: int_value(object, tags::INSTANCE_NUMBER),
        series_instance_uid: text_value(object, tags::SERIES_INSTANCE_UID).unwrap_or_default(),
        study_instance_uid: text_value(object, tags::STUDY_INSTANCE_UID).unwrap_or_default(),
        slice_thickness: first_float(object, tags::SLICE_THICKNESS),
        spacing_between_slices: first_float(object, tags::SPACING_BETWEEN_SLICES),
        default_window,
        tags: collect_tags(object),
    })
}

fn decode_samples(decoded: &DecodedPixelData<'_>) -> Result<PixelSamples, String> {
    let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
    let signed = decoded.pixel_representation() == PixelRepresentation::Signed;

    macro_rules! first_frame {
        ($ty:ty, $variant:ident) => {
            decoded
                .to_ndarray_with_options::<$ty>(&options)
                .map(|arr| PixelSamples::$variant(arr.slice_move(s![0, .., .., 0])))
                .map_err(|err| err.to_string())
        };
    }

    match (signed, decoded.bits_allocated()) {
        (false, 8) => first_frame!(u8, U8),
        (true, 8) => first_frame!(i8, I8),
        (false, 16) => first_frame!(u16, U16),
        (true, 16) => first_frame!(i16, I16),
        (false, 32) => first_frame!(u32, U32),
        (true, 32) => first_frame!(i32, I32),
        (_, bits) => Err(format!("{bits} bits allocated per sample")),
    }
}

fn text_value(object: &DefaultDicomObject, tag: Tag) -> Option<String> {
    object
        .element(tag)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim_end_matches(['\0', ' ']).trim().to_string())
        .filter(|s| !s.is_empty())
}

fn uint_value(object: &DefaultDicomObject, tag: Tag) -> Option<usize> {
    object.element(tag).ok()?.to_int::<u32>().ok().map(|v| v as usize)
}

fn int_value(object: &DefaultDicomObject, tag: Tag) -> Option<i32> {
    object.element(tag).ok()?.to_int::<i32>().ok()
}

fn float_values(object: &DefaultDicomObject, tag: Tag) -> Option<Vec<f64>> {
    object
        .element(tag)
        .ok()?
        .to_multi_float64()
        .ok()
        .filter(|v| !v.is_empty())
}

fn first_float(object: &DefaultDicomObject, tag: Tag) -> Option<f64> {
    float_values(object, tag).and_then(|v| v.first().copied())
}
