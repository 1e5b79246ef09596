//! Synthetic CT slices written to disk for the loading tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dicom::core::value::{PixelFragmentSequence, Value};
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::{EXPLICIT_VR_LITTLE_ENDIAN, JPEG_BASELINE};
use dicom_dictionary_std::tags;

pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
pub const SERIES_UID: &str = "1.2.826.0.1.3680043.2.1125.7.1";
pub const STUDY_UID: &str = "1.2.826.0.1.3680043.2.1125.7";

#[derive(Clone)]
pub enum Pixels {
    Unsigned(Vec<u16>),
    Signed(Vec<i16>),
    /// Encapsulated JPEG baseline fragment that does not decode.
    BrokenJpeg,
    Absent,
}

#[derive(Clone)]
pub struct TestSlice {
    pub rows: u16,
    pub columns: u16,
    pub z: f64,
    pub instance_number: i32,
    pub series_uid: String,
    pub pixel_spacing: (f64, f64),
    pub rescale_slope: f64,
    pub rescale_intercept: f64,
    pub frames: u32,
    pub pixels: Pixels,
}

impl TestSlice {
    /// Axial slice at height `z` whose stored values come from `value(row, column)`.
    pub fn axial(
        rows: u16,
        columns: u16,
        z: f64,
        instance_number: i32,
        value: impl Fn(usize, usize) -> u16,
    ) -> Self {
        let pixels = (0..rows as usize)
            .flat_map(|r| (0..columns as usize).map(move |c| (r, c)))
            .map(|(r, c)| value(r, c))
            .collect();
        Self {
            rows,
            columns,
            z,
            instance_number,
            series_uid: SERIES_UID.to_string(),
            pixel_spacing: (0.5, 0.5),
            rescale_slope: 1.0,
            rescale_intercept: -1024.0,
            frames: 1,
            pixels: Pixels::Unsigned(pixels),
        }
    }

    pub fn write(&self, path: &Path) {
        let sop_instance_uid = format!("{SERIES_UID}.{}", self.instance_number);
        let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);

        put_str(&mut obj, tags::SOP_CLASS_UID, VR::UI, CT_IMAGE_STORAGE);
        put_str(&mut obj, tags::SOP_INSTANCE_UID, VR::UI, &sop_instance_uid);
        put_str(&mut obj, tags::MODALITY, VR::CS, "CT");
        put_str(&mut obj, tags::PATIENT_NAME, VR::PN, "Test^Patient");
        put_str(&mut obj, tags::PATIENT_ID, VR::LO, "PAT123");
        put_str(&mut obj, tags::STUDY_DESCRIPTION, VR::LO, "Abdomen");
        put_str(&mut obj, tags::SERIES_DESCRIPTION, VR::LO, "Axial 1mm");
        put_str(&mut obj, tags::STUDY_INSTANCE_UID, VR::UI, STUDY_UID);
        put_str(&mut obj, tags::SERIES_INSTANCE_UID, VR::UI, &self.series_uid);
        put_str(
            &mut obj,
            tags::INSTANCE_NUMBER,
            VR::IS,
            &self.instance_number.to_string(),
        );
        put_strs(&mut obj, tags::IMAGE_POSITION_PATIENT, &[0.0, 0.0, self.z]);
        put_strs(
            &mut obj,
            tags::IMAGE_ORIENTATION_PATIENT,
            &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        );
        put_strs(
            &mut obj,
            tags::PIXEL_SPACING,
            &[self.pixel_spacing.0, self.pixel_spacing.1],
        );
        put_str(&mut obj, tags::SLICE_THICKNESS, VR::DS, "1.0");
        put_str(&mut obj, tags::RESCALE_SLOPE, VR::DS, &self.rescale_slope.to_string());
        put_str(
            &mut obj,
            tags::RESCALE_INTERCEPT,
            VR::DS,
            &self.rescale_intercept.to_string(),
        );
        put_str(&mut obj, tags::WINDOW_CENTER, VR::DS, "40");
        put_str(&mut obj, tags::WINDOW_WIDTH, VR::DS, "400");
        put_str(&mut obj, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
        if self.frames > 1 {
            put_str(&mut obj, tags::NUMBER_OF_FRAMES, VR::IS, &self.frames.to_string());
        }

        let signed = matches!(self.pixels, Pixels::Signed(_));
        put_u16(&mut obj, tags::SAMPLES_PER_PIXEL, 1);
        put_u16(&mut obj, tags::ROWS, self.rows);
        put_u16(&mut obj, tags::COLUMNS, self.columns);
        put_u16(&mut obj, tags::BITS_ALLOCATED, 16);
        put_u16(&mut obj, tags::BITS_STORED, 16);
        put_u16(&mut obj, tags::HIGH_BIT, 15);
        put_u16(&mut obj, tags::PIXEL_REPRESENTATION, signed as u16);

        let mut transfer_syntax = EXPLICIT_VR_LITTLE_ENDIAN.uid();
        match &self.pixels {
            Pixels::Unsigned(values) => obj.put(DataElement::new(
                tags::PIXEL_DATA,
                VR::OW,
                PrimitiveValue::U16(values.clone().into()),
            )),
            Pixels::Signed(values) => obj.put(DataElement::new(
                tags::PIXEL_DATA,
                VR::OW,
                PrimitiveValue::U16(values.iter().map(|&v| v as u16).collect::<Vec<_>>().into()),
            )),
            Pixels::BrokenJpeg => {
                transfer_syntax = JPEG_BASELINE.uid();
                let fragments = PixelFragmentSequence::new(
                    Vec::<u32>::new(),
                    vec![vec![0xFF_u8, 0xD8, 0x00, 0x00]],
                );
                obj.put(DataElement::new(
                    tags::PIXEL_DATA,
                    VR::OB,
                    Value::PixelSequence(fragments),
                ))
            }
            Pixels::Absent => None,
        };

        let meta = FileMetaTableBuilder::new()
            .transfer_syntax(transfer_syntax)
            .media_storage_sop_class_uid(CT_IMAGE_STORAGE)
            .media_storage_sop_instance_uid(sop_instance_uid.as_str())
            .build()
            .expect("meta");

        let mut file_obj =
            FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
        for elem in obj {
            file_obj.put(elem);
        }
        file_obj.write_to_file(path).expect("write test dicom");
    }
}

/// Write `slices` as `slice_<instance>.dcm` files into `dir`.
pub fn write_series(dir: &Path, slices: &[TestSlice]) -> Vec<PathBuf> {
    slices
        .iter()
        .map(|slice| {
            let path = dir.join(format!("slice_{:03}.dcm", slice.instance_number));
            slice.write(&path);
            path
        })
        .collect()
}

/// Stored value of the stepped test pattern.
pub fn pattern(z: usize, row: usize, column: usize) -> u16 {
    ((column + row * 3 + z * 7) % 2000) as u16
}

/// `count` axial slices 1 mm apart, stored values from [`pattern`].
pub fn stepped_series(count: usize, rows: u16, columns: u16) -> Vec<TestSlice> {
    (0..count)
        .map(|z| TestSlice::axial(rows, columns, z as f64, z as i32 + 1, move |r, c| pattern(z, r, c)))
        .collect()
}

fn put_str(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

fn put_strs(obj: &mut InMemDicomObject, tag: Tag, values: &[f64]) {
    let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    obj.put(DataElement::new(tag, VR::DS, PrimitiveValue::Strs(values.into())));
}

fn put_u16(obj: &mut InMemDicomObject, tag: Tag, value: u16) {
    obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
}
