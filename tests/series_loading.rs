mod common;

use std::fs;

use common::{Pixels, TestSlice, pattern, stepped_series, write_series};
use dicom_dictionary_std::tags;
use dicom_viewer_core::{
    CancelToken, FileLister, Interpolation, LoadOptions, LoadWarning, Orientation, PixelSamples,
    SeriesError, SliceError, SortBy, VolumeLoader, VolumeLoaderError, WindowLevel, apply_window,
    extract_frame, read_slice,
};
use tempfile::tempdir;

#[test]
fn ten_slice_series_has_expected_geometry_and_axial_frame() {
    let dir = tempdir().expect("tempdir");
    write_series(dir.path(), &stepped_series(10, 512, 512));

    let series = VolumeLoader::load_from_directory(dir.path(), &LoadOptions::default())
        .expect("load series");
    let volume = &series.volume;
    assert_eq!(volume.dimensions(), (512, 512, 10));
    assert_eq!(volume.spacing(), (0.5, 0.5, 1.0));
    assert_eq!(volume.origin(), [0.0, 0.0, 0.0]);
    assert_eq!(series.sort_by, SortBy::ImagePositionPatient);
    assert!(series.warnings.is_empty(), "{:?}", series.warnings);

    let window = WindowLevel::new(400.0, 40.0).unwrap();
    let frame = extract_frame(volume, Orientation::Axial, 5, &window, Interpolation::Linear)
        .expect("axial frame");
    assert_eq!((frame.height(), frame.width()), (512, 512));
    assert_eq!(frame.pixel_spacing, (0.5, 0.5));
    for ((row, column), &value) in frame.data.indexed_iter() {
        let physical = pattern(5, row, column) as f64 - 1024.0;
        let expected = apply_window(physical, 400.0, 40.0).unwrap() as f32;
        assert_eq!(value, expected, "pixel ({row}, {column})");
    }
}

#[test]
fn discovery_order_does_not_change_the_volume() {
    let dir = tempdir().expect("tempdir");
    // instance numbers deliberately disagree with positions
    let mut slices = stepped_series(6, 8, 6);
    for (slice, instance) in slices.iter_mut().zip([4, 2, 6, 1, 5, 3]) {
        slice.instance_number = instance;
    }
    let paths = write_series(dir.path(), &slices);

    let forward = VolumeLoader::load_from_file_paths(&paths, &LoadOptions::default()).unwrap();
    let shuffled_paths: Vec<_> = [3, 0, 5, 1, 4, 2].iter().map(|&i| paths[i].clone()).collect();
    let shuffled =
        VolumeLoader::load_from_file_paths(&shuffled_paths, &LoadOptions::default()).unwrap();

    assert_eq!(forward.volume.data(), shuffled.volume.data());
    assert_eq!(forward.volume.dimensions(), (8, 6, 6));
    for z in 0..6 {
        let expected = pattern(z, 2, 3) as f32 - 1024.0;
        assert_eq!(forward.volume.data()[[z, 2, 3]], expected);
    }
}

#[test]
fn rescale_is_applied_once_at_assembly() {
    let dir = tempdir().expect("tempdir");
    let mut slices = stepped_series(2, 4, 4);
    for slice in &mut slices {
        slice.rescale_slope = 2.0;
        slice.rescale_intercept = -100.0;
    }
    write_series(dir.path(), &slices);

    let series = VolumeLoader::load_from_directory(dir.path(), &LoadOptions::default()).unwrap();
    let raw = pattern(1, 3, 2) as f32;
    assert_eq!(series.volume.data()[[1, 3, 2]], raw * 2.0 - 100.0);
}

#[test]
fn signed_samples_keep_their_sign() {
    let dir = tempdir().expect("tempdir");
    let mut slice = TestSlice::axial(2, 2, 0.0, 1, |_, _| 0);
    slice.rescale_intercept = 0.0;
    slice.pixels = Pixels::Signed(vec![-1000, -1, 0, 1200]);
    let path = dir.path().join("signed.dcm");
    slice.write(&path);

    let read = read_slice(&path).expect("read signed slice");
    assert!(matches!(read.samples, PixelSamples::I16(_)));
    assert_eq!(
        read.physical().iter().copied().collect::<Vec<_>>(),
        [-1000.0, -1.0, 0.0, 1200.0]
    );
    assert_eq!(read.default_window, Some(WindowLevel::new(400.0, 40.0).unwrap()));
}

#[test]
fn mixed_series_produce_no_volume() {
    let dir = tempdir().expect("tempdir");
    let mut slices = stepped_series(2, 4, 4);
    slices[1].series_uid = "1.2.826.0.1.3680043.2.1125.8.1".to_string();
    write_series(dir.path(), &slices);

    let err = VolumeLoader::load_from_directory(dir.path(), &LoadOptions::default()).unwrap_err();
    match err {
        VolumeLoaderError::Series(SeriesError::MixedSeries { uids }) => assert_eq!(uids.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unreadable_files_are_reported_next_to_the_volume() {
    let dir = tempdir().expect("tempdir");
    write_series(dir.path(), &stepped_series(3, 4, 4));
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "not an image").unwrap();
    let mut header_only = TestSlice::axial(4, 4, 9.0, 9, |_, _| 0);
    header_only.pixels = Pixels::Absent;
    let header_only_path = dir.path().join("header_only.dcm");
    header_only.write(&header_only_path);

    let series = VolumeLoader::load_from_directory(dir.path(), &LoadOptions::default()).unwrap();
    assert_eq!(series.volume.dimensions(), (4, 4, 3));

    let rejected: Vec<_> = series
        .warnings
        .iter()
        .filter_map(|w| match w {
            LoadWarning::RejectedFile { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(rejected, [header_only_path, notes]);
}

#[test]
fn load_fails_listing_every_rejected_file() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    fs::write(dir.path().join("b.txt"), "b").unwrap();

    let err = VolumeLoader::load_from_directory(dir.path(), &LoadOptions::default()).unwrap_err();
    match &err {
        VolumeLoaderError::Rejected { rejected, cause } => {
            assert_eq!(rejected.len(), 2);
            assert!(cause.is_none());
            assert!(rejected.iter().all(|e| matches!(e, SliceError::NotDicom { .. })));
        }
        other => panic!("unexpected {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("a.txt") && message.contains("b.txt"), "{message}");
}

#[test]
fn inconsistent_remaining_slices_fail_with_summary() {
    let dir = tempdir().expect("tempdir");
    let mut slices = stepped_series(3, 4, 4);
    slices[2].pixel_spacing = (0.8, 0.8);
    write_series(dir.path(), &slices);
    fs::write(dir.path().join("readme.txt"), "scan notes").unwrap();

    let err = VolumeLoader::load_from_directory(dir.path(), &LoadOptions::default()).unwrap_err();
    match err {
        VolumeLoaderError::Rejected {
            rejected,
            cause: Some(SeriesError::InconsistentGeometry { path, .. }),
        } => {
            assert_eq!(rejected.len(), 1);
            assert!(path.ends_with("slice_003.dcm"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn slice_reader_classifies_bad_files() {
    let dir = tempdir().expect("tempdir");

    let text = dir.path().join("plain.txt");
    fs::write(&text, "hello").unwrap();
    assert!(matches!(read_slice(&text), Err(SliceError::NotDicom { .. })));

    assert!(matches!(
        read_slice(dir.path().join("missing.dcm")),
        Err(SliceError::Io { .. })
    ));

    let mut no_pixels = TestSlice::axial(4, 4, 0.0, 1, |_, _| 0);
    no_pixels.pixels = Pixels::Absent;
    let path = dir.path().join("no_pixels.dcm");
    no_pixels.write(&path);
    assert!(matches!(read_slice(&path), Err(SliceError::MissingPixelData { .. })));

    let mut short = TestSlice::axial(4, 4, 0.0, 2, |_, _| 0);
    short.pixels = Pixels::Unsigned(vec![0; 8]);
    let path = dir.path().join("short.dcm");
    short.write(&path);
    assert!(matches!(read_slice(&path), Err(SliceError::Malformed { .. })));

    let mut multi = TestSlice::axial(2, 2, 0.0, 3, |_, _| 0);
    multi.frames = 2;
    multi.pixels = Pixels::Unsigned(vec![0; 8]);
    let path = dir.path().join("multi.dcm");
    multi.write(&path);
    assert!(matches!(
        read_slice(&path),
        Err(SliceError::MultiFrame { frames: 2, .. })
    ));

    let mut jpeg = TestSlice::axial(2, 2, 0.0, 4, |_, _| 0);
    jpeg.pixels = Pixels::BrokenJpeg;
    let path = dir.path().join("jpeg.dcm");
    jpeg.write(&path);
    assert!(matches!(
        read_slice(&path),
        Err(SliceError::UnsupportedEncoding { .. })
    ));
}

#[test]
fn metadata_follows_the_slice_order() {
    let dir = tempdir().expect("tempdir");
    let mut slices = stepped_series(3, 4, 4);
    // written in reverse spatial order
    for (slice, z) in slices.iter_mut().zip([2.0, 1.0, 0.0]) {
        slice.z = z;
    }
    write_series(dir.path(), &slices);

    let series = VolumeLoader::load_from_directory(dir.path(), &LoadOptions::default()).unwrap();
    let metadata = &series.metadata;
    assert_eq!(metadata.slice_count(), 3);
    assert_eq!(
        metadata.lookup(0, tags::INSTANCE_NUMBER).unwrap(),
        ("InstanceNumber", "3")
    );
    assert_eq!(
        metadata.lookup(2, tags::PATIENT_NAME).unwrap(),
        ("PatientName", "Test^Patient")
    );
    assert!(metadata.lookup(5, tags::PATIENT_NAME).is_err());
    assert!(metadata.lookup(0, tags::CONTRAST_BOLUS_AGENT).is_err());

    let listed: Vec<_> = metadata.all_tags(1).unwrap().iter().map(|e| e.tag).collect();
    let mut sorted = listed.clone();
    sorted.sort();
    assert_eq!(listed, sorted);

    assert_eq!(metadata.series_info().modality.as_deref(), Some("CT"));
    assert_eq!(metadata.study().description.as_deref(), Some("Abdomen"));
    assert_eq!(metadata.patient().id.as_deref(), Some("PAT123"));
    let image = metadata.image_info(1).unwrap();
    assert_eq!(image.instance_number.as_deref(), Some("2"));
    assert_eq!(image.window_width.as_deref(), Some("400"));
}

#[test]
fn cancelled_load_returns_no_series() {
    let dir = tempdir().expect("tempdir");
    write_series(dir.path(), &stepped_series(3, 4, 4));

    let token = CancelToken::new();
    token.cancel();
    let options = LoadOptions::default().with_cancel_token(token);
    let err = VolumeLoader::load_from_directory(dir.path(), &options).unwrap_err();
    assert!(err.is_cancelled(), "{err:?}");
}

#[test]
fn caller_supplied_listing_is_used() {
    struct Only(Vec<std::path::PathBuf>);
    impl FileLister for Only {
        fn list(&self, _dir: &std::path::Path) -> std::io::Result<Vec<std::path::PathBuf>> {
            Ok(self.0.clone())
        }
    }

    let dir = tempdir().expect("tempdir");
    let paths = write_series(dir.path(), &stepped_series(4, 4, 4));
    let lister = Only(paths[..2].to_vec());

    let series =
        VolumeLoader::load_from_directory_with(dir.path(), &lister, &LoadOptions::default())
            .unwrap();
    assert_eq!(series.volume.dimensions(), (4, 4, 2));
}

#[test]
fn extension_filter_and_empty_directories() {
    let dir = tempdir().expect("tempdir");
    write_series(dir.path(), &stepped_series(2, 4, 4));
    fs::write(dir.path().join("notes.txt"), "x").unwrap();

    let options = LoadOptions::default().with_extensions(["DCM"]);
    let series = VolumeLoader::load_from_directory(dir.path(), &options).unwrap();
    assert!(series.warnings.is_empty());

    let empty = tempdir().expect("tempdir");
    assert!(matches!(
        VolumeLoader::load_from_directory(empty.path(), &LoadOptions::default()),
        Err(VolumeLoaderError::NoFiles { .. })
    ));
}

#[test]
fn reformatted_frames_use_the_physical_aspect_ratio() {
    let dir = tempdir().expect("tempdir");
    write_series(dir.path(), &stepped_series(5, 6, 8));
    let series = VolumeLoader::load_from_directory(dir.path(), &LoadOptions::default()).unwrap();
    let window = series.volume.default_window().expect("header window");

    let coronal = extract_frame(
        &series.volume,
        Orientation::Coronal,
        3,
        &window,
        Interpolation::Nearest,
    )
    .unwrap();
    // 5 slices 1 mm apart shown with 0.5 mm pixels
    assert_eq!((coronal.height(), coronal.width()), (10, 8));
    assert_eq!(coronal.pixel_spacing, (0.5, 0.5));

    let err = extract_frame(
        &series.volume,
        Orientation::Coronal,
        6,
        &window,
        Interpolation::Linear,
    )
    .unwrap_err();
    assert!(err.to_string().contains("out of range"));
}
