use crate::cancel::CancelToken;
use crate::series::{AssembleOptions, LoadWarning, LoadedSeries, SeriesAssembler, SeriesError};
use crate::slice_reader::{Slice, SliceError, read_slice, read_slice_from_object};

use dicom::object::DefaultDicomObject;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use web_time::Instant;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("Cannot list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No files found in {}", .path.display())]
    NoFiles { path: PathBuf },

    #[error("{}", rejected_summary(.rejected, .cause))]
    Rejected {
        rejected: Vec<SliceError>,
        cause: Option<SeriesError>,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

impl VolumeLoaderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            VolumeLoaderError::Series(SeriesError::Cancelled)
                | VolumeLoaderError::Rejected {
                    cause: Some(SeriesError::Cancelled),
                    ..
                }
        )
    }
}

fn rejected_summary(rejected: &[SliceError], cause: &Option<SeriesError>) -> String {
    let mut summary = match cause {
        Some(cause) => format!("Series could not be assembled: {cause}"),
        None => "No valid DICOM images found".to_string(),
    };
    summary.push_str(&format!("; {} file(s) rejected:", rejected.len()));
    for err in rejected {
        summary.push_str("\n  ");
        summary.push_str(&err.to_string());
    }
    summary
}

/// Enumerates the candidate files of a directory.
///
/// The viewer shell may supply its own listing (for instance one driven by
/// a file dialog selection); [`DirectoryLister`] walks the filesystem.
pub trait FileLister {
    fn list(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>>;
}

/// Walks a directory, skipping hidden entries, in sorted path order.
#[derive(Debug, Clone)]
pub struct DirectoryLister {
    pub recursive: bool,
    /// Case-insensitive extension filter; `None` keeps every file since
    /// DICOM files often carry no extension.
    pub extensions: Option<Vec<String>>,
}

impl Default for DirectoryLister {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: None,
        }
    }
}

impl FileLister for DirectoryLister {
    fn list(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        {
            let entry = entry?;
            if entry.file_type().is_file() && self.accepts(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl DirectoryLister {
    fn accepts(&self, path: &Path) -> bool {
        match &self.extensions {
            None => true,
            Some(extensions) => path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))),
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub assemble: AssembleOptions,
    pub lister: DirectoryLister,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.assemble.cancel = Some(token);
        self
    }

    pub fn with_spacing_tolerance(mut self, tolerance: f64) -> Self {
        self.assemble.spacing_tolerance = tolerance;
        self
    }

    pub fn with_extensions<S: Into<String>>(
        mut self,
        extensions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.lister.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.lister.recursive = recursive;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.assemble.is_cancelled()
    }
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load the series stored in a directory
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed, holds no files,
    /// or the readable files do not form one consistent series.
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<LoadedSeries, VolumeLoaderError> {
        Self::load_from_directory_with(path, &options.lister, options)
    }

    /// Load a directory through a caller supplied file listing
    pub fn load_from_directory_with(
        path: impl AsRef<Path>,
        lister: &dyn FileLister,
        options: &LoadOptions,
    ) -> Result<LoadedSeries, VolumeLoaderError> {
        let path = path.as_ref();
        tracing::info!("Loading DICOM series from {}", path.display());
        let paths = lister.list(path).map_err(|source| VolumeLoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoFiles {
                path: path.to_path_buf(),
            });
        }

        Self::load_from_file_paths(&paths, options)
    }

    /// Load a series from file paths, in discovery order
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        options: &LoadOptions,
    ) -> Result<LoadedSeries, VolumeLoaderError> {
        let started = Instant::now();
        let results: Vec<Option<Result<Slice, SliceError>>> = paths
            .par_iter()
            .map(|path| {
                if options.is_cancelled() {
                    return None;
                }
                tracing::debug!("Reading {}", path.as_ref().display());
                Some(read_slice(path))
            })
            .collect();

        if options.is_cancelled() {
            return Err(SeriesError::Cancelled.into());
        }

        let series = Self::assemble(results.into_iter().flatten(), options)?;
        tracing::info!(
            files = paths.len(),
            slices = series.metadata.slice_count(),
            warnings = series.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded DICOM series"
        );
        Ok(series)
    }

    /// Load a series from DICOM objects that are already open
    pub fn load_from_dicom_objects(
        dicom_objects: &[(PathBuf, DefaultDicomObject)],
        options: &LoadOptions,
    ) -> Result<LoadedSeries, VolumeLoaderError> {
        let results = dicom_objects
            .iter()
            .map(|(path, object)| read_slice_from_object(path, object))
            .collect::<Vec<_>>();
        Self::assemble(results, options)
    }

    fn assemble(
        results: impl IntoIterator<Item = Result<Slice, SliceError>>,
        options: &LoadOptions,
    ) -> Result<LoadedSeries, VolumeLoaderError> {
        let (slices, rejected): (Vec<_>, Vec<_>) =
            results.into_iter().partition(Result::is_ok);
        let slices: Vec<Slice> = slices.into_iter().filter_map(Result::ok).collect();
        let rejected: Vec<SliceError> = rejected.into_iter().filter_map(Result::err).collect();

        for err in &rejected {
            tracing::warn!("Rejected {err}");
        }

        if slices.is_empty() {
            return Err(VolumeLoaderError::Rejected {
                rejected,
                cause: None,
            });
        }

        match SeriesAssembler::assemble(slices, &options.assemble) {
            Ok(mut series) => {
                series
                    .warnings
                    .extend(rejected.into_iter().map(|err| LoadWarning::RejectedFile {
                        path: err.path().to_path_buf(),
                        reason: err.to_string(),
                    }));
                Ok(series)
            }
            Err(cause) if rejected.is_empty() => Err(cause.into()),
            Err(cause) => Err(VolumeLoaderError::Rejected {
                rejected,
                cause: Some(cause),
            }),
        }
    }
}
