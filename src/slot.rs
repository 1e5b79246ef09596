use std::sync::{Arc, PoisonError, RwLock};

use crate::series::LoadedSeries;

/// The series currently open in a viewer.
///
/// Readers take an `Arc` of the current series and keep using it while a
/// new series is swapped in; the old one is freed when the last reader
/// drops its handle.
#[derive(Debug, Default)]
pub struct SeriesSlot {
    current: RwLock<Option<Arc<LoadedSeries>>>,
}

impl SeriesSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<LoadedSeries>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make `series` current and return the handle it replaces.
    pub fn replace(&self, series: LoadedSeries) -> Option<Arc<LoadedSeries>> {
        let series = Arc::new(series);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        current.replace(series)
    }

    pub fn clear(&self) -> Option<Arc<LoadedSeries>> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
