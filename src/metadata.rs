//! Header inspection: ordered tag listings per slice and per series.

use dicom::core::dictionary::DataDictionary;
use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::{Tag, VR};
use dicom::object::InMemDicomObject;
use dicom_dictionary_std::{StandardDataDictionary, tags};
use thiserror::Error;

const MAX_VALUE_LEN: usize = 120;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Slice {index} out of range, series has {count} slice(s)")]
    SliceOutOfRange { index: usize, count: usize },

    #[error("Tag {tag} not found in slice {index}")]
    NotFound { index: usize, tag: String },
}

/// One header attribute rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub tag: Tag,
    pub vr: VR,
    /// Dictionary keyword, or the hex tag for private and unknown attributes.
    pub name: String,
    pub value: String,
}

impl TagEntry {
    pub fn tag_text(&self) -> String {
        format_tag(self.tag)
    }
}

/// Collect the top-level attributes of a data set in encounter order.
pub fn collect_tags(object: &InMemDicomObject) -> Vec<TagEntry> {
    object
        .iter()
        .map(|element| {
            let tag = element.header().tag;
            let vr = element.header().vr;
            TagEntry {
                tag,
                vr,
                name: tag_name(tag),
                value: value_to_string(element.value(), vr),
            }
        })
        .collect()
}

pub fn format_tag(tag: Tag) -> String {
    format!("({:04X},{:04X})", tag.group(), tag.element())
}

pub fn tag_name(tag: Tag) -> String {
    if tag.group() % 2 == 1 {
        return format_tag(tag);
    }
    StandardDataDictionary
        .by_tag(tag)
        .map(|entry| entry.alias.to_string())
        .unwrap_or_else(|| format_tag(tag))
}

pub fn value_to_string<I, P>(value: &Value<I, P>, vr: VR) -> String {
    let rendered = match value {
        Value::Primitive(primitive) => format_primitive_value(primitive, vr),
        Value::Sequence(sequence) => {
            let count = sequence.items().len();
            let suffix = if count == 1 { "" } else { "s" };
            format!("Sequence ({count} item{suffix})")
        }
        Value::PixelSequence(sequence) => {
            let fragments = sequence.fragments().len();
            let suffix = if fragments == 1 { "" } else { "s" };
            format!("Encapsulated pixel data ({fragments} fragment{suffix})")
        }
    };

    if rendered.chars().count() > MAX_VALUE_LEN {
        let mut truncated = rendered.chars().take(MAX_VALUE_LEN).collect::<String>();
        truncated.push('…');
        truncated
    } else {
        rendered
    }
}

fn format_primitive_value(value: &PrimitiveValue, vr: VR) -> String {
    match value {
        PrimitiveValue::Empty => "(empty)".to_string(),
        PrimitiveValue::Tags(values) => values
            .iter()
            .map(|tag| format_tag(*tag))
            .collect::<Vec<_>>()
            .join("\\"),
        _ if is_binary_vr(vr) => {
            format!("Binary data ({} bytes)", value.calculate_byte_len())
        }
        _ => value
            .to_str()
            .trim_end_matches(['\0', ' '])
            .to_string(),
    }
}

fn is_binary_vr(vr: VR) -> bool {
    matches!(
        vr,
        VR::OB | VR::OD | VR::OF | VR::OL | VR::OV | VR::OW | VR::UN
    )
}

/// Tag listings of an assembled series, indexed by ordered slice position.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    series: Vec<TagEntry>,
    slices: Vec<Vec<TagEntry>>,
}

impl MetadataIndex {
    /// `series` is taken from the first ordered slice.
    pub fn new(series: Vec<TagEntry>, slices: Vec<Vec<TagEntry>>) -> Self {
        Self { series, slices }
    }

    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    pub fn series_tags(&self) -> &[TagEntry] {
        &self.series
    }

    pub fn all_tags(&self, slice_index: usize) -> Result<&[TagEntry], MetadataError> {
        self.slices
            .get(slice_index)
            .map(Vec::as_slice)
            .ok_or(MetadataError::SliceOutOfRange {
                index: slice_index,
                count: self.slices.len(),
            })
    }

    /// Name and value text of `tag` in the given slice.
    pub fn lookup(&self, slice_index: usize, tag: Tag) -> Result<(&str, &str), MetadataError> {
        self.all_tags(slice_index)?
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| (entry.name.as_str(), entry.value.as_str()))
            .ok_or_else(|| MetadataError::NotFound {
                index: slice_index,
                tag: format_tag(tag),
            })
    }

    pub fn patient(&self) -> PatientInfo {
        let text = |tag| find_text(&self.series, tag);
        PatientInfo {
            name: text(tags::PATIENT_NAME),
            id: text(tags::PATIENT_ID),
            birth_date: text(tags::PATIENT_BIRTH_DATE),
            sex: text(tags::PATIENT_SEX),
            age: text(tags::PATIENT_AGE),
            weight: text(tags::PATIENT_WEIGHT),
        }
    }

    pub fn study(&self) -> StudyInfo {
        let text = |tag| find_text(&self.series, tag);
        StudyInfo {
            study_instance_uid: text(tags::STUDY_INSTANCE_UID),
            date: text(tags::STUDY_DATE),
            time: text(tags::STUDY_TIME),
            description: text(tags::STUDY_DESCRIPTION),
            study_id: text(tags::STUDY_ID),
            accession_number: text(tags::ACCESSION_NUMBER),
            referring_physician: text(tags::REFERRING_PHYSICIAN_NAME),
        }
    }

    pub fn series_info(&self) -> SeriesInfo {
        let text = |tag| find_text(&self.series, tag);
        SeriesInfo {
            series_instance_uid: text(tags::SERIES_INSTANCE_UID),
            number: text(tags::SERIES_NUMBER),
            date: text(tags::SERIES_DATE),
            time: text(tags::SERIES_TIME),
            description: text(tags::SERIES_DESCRIPTION),
            modality: text(tags::MODALITY),
            body_part: text(tags::BODY_PART_EXAMINED),
            patient_position: text(tags::PATIENT_POSITION),
            protocol: text(tags::PROTOCOL_NAME),
            device: text(tags::MANUFACTURER_MODEL_NAME),
            device_serial_number: text(tags::DEVICE_SERIAL_NUMBER),
        }
    }

    pub fn image_info(&self, slice_index: usize) -> Result<ImageInfo, MetadataError> {
        let entries = self.all_tags(slice_index)?;
        let text = |tag| find_text(entries, tag);
        Ok(ImageInfo {
            sop_instance_uid: text(tags::SOP_INSTANCE_UID),
            instance_number: text(tags::INSTANCE_NUMBER),
            acquisition_number: text(tags::ACQUISITION_NUMBER),
            slice_location: text(tags::SLICE_LOCATION),
            slice_thickness: text(tags::SLICE_THICKNESS),
            window_center: text(tags::WINDOW_CENTER),
            window_width: text(tags::WINDOW_WIDTH),
            rows: text(tags::ROWS),
            columns: text(tags::COLUMNS),
            pixel_spacing: text(tags::PIXEL_SPACING),
        })
    }
}

fn find_text(entries: &[TagEntry], tag: Tag) -> Option<String> {
    entries
        .iter()
        .find(|entry| entry.tag == tag)
        .map(|entry| entry.value.trim().to_string())
        .filter(|value| !value.is_empty() && value != "(empty)")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientInfo {
    pub name: Option<String>,
    pub id: Option<String>,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
    pub age: Option<String>,
    pub weight: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyInfo {
    pub study_instance_uid: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub study_id: Option<String>,
    pub accession_number: Option<String>,
    pub referring_physician: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesInfo {
    pub series_instance_uid: Option<String>,
    pub number: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub modality: Option<String>,
    pub body_part: Option<String>,
    pub patient_position: Option<String>,
    pub protocol: Option<String>,
    pub device: Option<String>,
    pub device_serial_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInfo {
    pub sop_instance_uid: Option<String>,
    pub instance_number: Option<String>,
    pub acquisition_number: Option<String>,
    pub slice_location: Option<String>,
    pub slice_thickness: Option<String>,
    pub window_center: Option<String>,
    pub window_width: Option<String>,
    pub rows: Option<String>,
    pub columns: Option<String>,
    pub pixel_spacing: Option<String>,
}
