//! # DICOM viewer core
//!
//! Turns a folder of single-series DICOM slices into a volume a viewer can
//! display and inspect.
//!
//! Built on the dicom-rs ecosystem. Each file is parsed into a [`Slice`]
//! (in parallel with rayon), the slices are validated as one series,
//! ordered along the slice normal and stacked into a [`Volume`] of physical
//! values (rescale slope and intercept applied once). The header of every
//! slice is kept in a [`MetadataIndex`] for inspection. Frames can then be
//! cut along the three medical axes:
//!  - Axial
//!  - Coronal
//!  - Sagittal
//!
//!  Coronal and sagittal frames are resampled along the slice axis, with
//!  nearest or linear interpolation, so their pixels keep the physical
//!  aspect ratio. DICOM files are assumed to have the following attributes:
//!   - One image per file (multi-frame objects are rejected)
//!   - Grayscale, one sample per pixel
//!   - Images from the same series (Series Instance UID)
//!
//! Files that cannot be read are reported with the reason, never silently
//! dropped: either they appear as [`LoadWarning::RejectedFile`] next to a
//! volume built from the remaining slices, or the load fails listing them.
//!
//! # Examples
//!
//! ## Reading a directory and displaying a frame
//!
//! ```no_run
//! # use dicom_viewer_core::{VolumeLoader, LoadOptions, Orientation, Interpolation, WindowLevel, extract_frame};
//! let series = VolumeLoader::load_from_directory("dicom", &LoadOptions::default())
//!     .expect("should have loaded files from directory");
//! let volume = &series.volume;
//! let window = WindowLevel::new(400.0, 40.0).expect("valid window");
//! let frame = extract_frame(
//!     volume,
//!     Orientation::Sagittal,
//!     volume.extent(Orientation::Sagittal) / 2,
//!     &window,
//!     Interpolation::Linear,
//! )
//! .expect("should have returned frame at center of volume");
//! frame.to_image().expect("frame buffer").save("result.png").ok();
//! ```
//!
//! ## Inspecting header metadata
//!
//! ```no_run
//! # use dicom_viewer_core::{VolumeLoader, LoadOptions};
//! # use dicom_dictionary_std::tags;
//! let series = VolumeLoader::load_from_directory("dicom", &LoadOptions::default()).unwrap();
//! let (name, value) = series.metadata.lookup(0, tags::SLICE_LOCATION).unwrap();
//! println!("{name}: {value}");
//! for entry in series.metadata.all_tags(0).unwrap() {
//!     println!("{} {} {}", entry.tag_text(), entry.name, entry.value);
//! }
//! ```

pub mod cancel;
pub mod enums;
pub mod frame;
mod interpolator;
pub mod metadata;
pub mod series;
pub mod slice_reader;
pub mod slot;
pub mod transform;
pub mod volume;
pub mod volume_loader;

pub use cancel::CancelToken;
pub use enums::{Interpolation, Orientation, SortBy};
pub use frame::{Frame, FrameError, extract_frame};
pub use metadata::{MetadataError, MetadataIndex, TagEntry};
pub use series::{AssembleOptions, LoadWarning, LoadedSeries, SeriesAssembler, SeriesError};
pub use slice_reader::{PixelSamples, Slice, SliceError, read_slice};
pub use slot::SeriesSlot;
pub use transform::{WindowError, WindowLevel, apply_window, from_physical, to_physical};
pub use volume::Volume;
pub use volume_loader::{DirectoryLister, FileLister, LoadOptions, VolumeLoader, VolumeLoaderError};
