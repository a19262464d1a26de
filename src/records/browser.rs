//! Record browser: the loaded attendance page plus filter and export.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;

use super::export::{export_csv, CsvStyle, ExportError};
use super::filter::{distinct_branches, filter_records, FilterCriteria};
use crate::models::AttendanceRecord;
use crate::services::RecordStore;
use crate::store::{StoreError, DEFAULT_PAGE_SIZE};

/// Shared view of whether a load is in flight.
///
/// Clones observe the same flag, so a display can watch it while
/// [`RecordBrowser::load`] is awaiting the store.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn raise(&self) -> LoadingGuard<'_> {
        self.0.store(true, Ordering::SeqCst);
        LoadingGuard(self)
    }
}

/// Lowers the flag when the load finishes or is dropped mid-request.
struct LoadingGuard<'a>(&'a LoadingFlag);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::SeqCst);
    }
}

/// Holds the most recent page of attendance records.
pub struct RecordBrowser {
    store: Arc<dyn RecordStore>,
    page_size: usize,
    records: Vec<AttendanceRecord>,
    loading: LoadingFlag,
    error: Option<String>,
}

impl std::fmt::Debug for RecordBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBrowser")
            .field("page_size", &self.page_size)
            .field("records", &self.records.len())
            .field("loading", &self.loading.is_set())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl RecordBrowser {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(store: Arc<dyn RecordStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            records: Vec::new(),
            loading: LoadingFlag::default(),
            error: None,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Loaded records, newest first.
    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    /// Handle for watching the loading state from elsewhere.
    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Message from the last failed load.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the loaded set with the newest page from the store.
    ///
    /// On failure the set is emptied and the error kept for display.
    pub async fn load(&mut self) -> Result<usize, StoreError> {
        let result = {
            let _loading = self.loading.raise();
            self.store.list_attendance(self.page_size).await
        };

        match result {
            Ok(records) => {
                self.records = records;
                self.error = None;
                Ok(self.records.len())
            }
            Err(e) => {
                log::error!("Failed to load attendance records: {}", e);
                self.records.clear();
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<&AttendanceRecord> {
        filter_records(&self.records, criteria)
    }

    /// Branches present in the unfiltered set.
    pub fn distinct_branches(&self) -> Vec<String> {
        distinct_branches(&self.records)
    }

    /// Export the records matching `criteria`. `Ok(None)` when none match.
    pub fn export_csv(
        &self,
        criteria: &FilterCriteria,
        dir: &Path,
        date: NaiveDate,
        style: CsvStyle,
    ) -> Result<Option<std::path::PathBuf>, ExportError> {
        export_csv(&self.filter(criteria), dir, date, style)
    }
}
