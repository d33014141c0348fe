use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::database::repo::{LoadCounts, LoadError, LocalStore};
use crate::ingest::client::{pages, ArtifactSource, FetchError, ALL_CLASSIFICATIONS};
use crate::ingest::flatten::{flatten_pages, Flattened};
use crate::ingest::types::{Classification, FetchedPage, PageRange, RangeError};

/// Offered when the live classification list has never been loaded.
pub const STATIC_CLASSIFICATIONS: [&str; 15] = [
    "Coins",
    "Paintings",
    "Sculpture",
    "Furniture",
    "Drawings",
    "Accessories",
    "Prints",
    "Vessels",
    "Textile Arts",
    "Archival Material",
    "Fragments",
    "Manuscripts",
    "Seals",
    "Straus Materials",
    ALL_CLASSIFICATIONS,
];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("nothing fetched yet, run `fetch` first")]
    NothingFetched,
    #[error("the last fetch returned no rows, nothing to insert")]
    EmptyFetch,
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Rows fetched for one classification and page range, not yet loaded.
#[derive(Debug, Clone)]
pub struct FetchedBatch {
    pub classification: String,
    pub range: PageRange,
    pub pages_fetched: u32,
    pub flattened: Flattened,
}

#[derive(Debug)]
pub struct FetchSummary {
    pub pages_fetched: u32,
    /// Matching records on the museum side, as reported by the first page.
    pub total_records: u64,
    pub records: usize,
    pub warnings: usize,
    pub error: Option<FetchError>,
}

/// Where the classification selector's choices came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSource {
    Live,
    Cached,
    Static,
}

/// Per-user state of the dashboard. Every operation takes it explicitly.
#[derive(Debug)]
pub struct Session {
    classification: String,
    range: PageRange,
    fetched: Option<FetchedBatch>,
    last_good_classifications: Option<Vec<Classification>>,
    classifications_live: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            classification: ALL_CLASSIFICATIONS.to_string(),
            range: PageRange::default(),
            fetched: None,
            last_good_classifications: None,
            classifications_live: false,
        }
    }

    pub fn classification(&self) -> &str {
        &self.classification
    }

    pub fn range(&self) -> PageRange {
        self.range
    }

    pub fn fetched(&self) -> Option<&FetchedBatch> {
        self.fetched.as_ref()
    }

    pub fn set_classification(&mut self, name: &str) {
        let name = name.trim();
        self.classification = if name.is_empty() {
            ALL_CLASSIFICATIONS.to_string()
        } else {
            name.to_string()
        };
    }

    pub fn set_range(&mut self, start: u32, end: u32) -> Result<PageRange, RangeError> {
        self.range = PageRange::new(start, end)?;
        Ok(self.range)
    }

    /// Fetches the selected page range and flattens it into the session,
    /// replacing whatever was fetched before. A failing page ends the fetch;
    /// the pages before it are kept.
    pub fn fetch<S: ArtifactSource + ?Sized>(&mut self, source: &S, progress: &ProgressBar) -> FetchSummary {
        info!(
            classification = %self.classification,
            start = self.range.start(),
            end = self.range.end(),
            "Fetching"
        );
        progress.set_length(self.range.len() as u64);
        progress.set_position(0);

        let mut fetched: Vec<FetchedPage> = Vec::new();
        let mut failure = None;
        for page in pages(source, &self.classification, self.range) {
            match page {
                Ok(page) => {
                    progress.set_message(format!("page {}", page.number));
                    fetched.push(page);
                    progress.inc(1);
                }
                Err(e) => {
                    error!("{}", e);
                    failure = Some(e);
                }
            }
        }
        progress.finish_and_clear();

        let flattened = flatten_pages(&fetched);
        let summary = FetchSummary {
            pages_fetched: fetched.len() as u32,
            total_records: fetched.first().map(|p| p.body.info.totalrecords).unwrap_or(0),
            records: flattened.records_seen,
            warnings: flattened.warnings.len(),
            error: failure,
        };
        self.fetched = Some(FetchedBatch {
            classification: self.classification.clone(),
            range: self.range,
            pages_fetched: summary.pages_fetched,
            flattened,
        });
        summary
    }

    /// Loads the fetched rows. They stay in the session so a repeat insert is
    /// a harmless no-op.
    pub fn insert(&self, store: &mut LocalStore) -> Result<LoadCounts, SessionError> {
        let batch = &self.fetched.as_ref().ok_or(SessionError::NothingFetched)?.flattened.batch;
        if batch.is_empty() {
            return Err(SessionError::EmptyFetch);
        }
        Ok(store.load(&batch.metadata, &batch.media, &batch.colors)?)
    }

    /// Re-reads the live classification list. On failure the last good list
    /// stays in place and the error is returned for display.
    pub fn refresh_classifications<S: ArtifactSource + ?Sized>(&mut self, source: &S) -> Result<usize, FetchError> {
        match source.fetch_classifications() {
            Ok(list) => {
                let n = list.len();
                self.last_good_classifications = Some(list);
                self.classifications_live = true;
                Ok(n)
            }
            Err(e) => {
                warn!("Classification refresh failed, keeping previous list: {}", e);
                self.classifications_live = false;
                Err(e)
            }
        }
    }

    /// Selector choices with live object counts when known. "All" is always offered.
    pub fn classification_choices(&self) -> (ChoiceSource, Vec<(String, Option<u64>)>) {
        match &self.last_good_classifications {
            Some(list) if !list.is_empty() => {
                let mut choices: Vec<(String, Option<u64>)> =
                    list.iter().map(|c| (c.name.clone(), Some(c.objectcount))).collect();
                choices.push((ALL_CLASSIFICATIONS.to_string(), None));
                let origin = if self.classifications_live {
                    ChoiceSource::Live
                } else {
                    ChoiceSource::Cached
                };
                (origin, choices)
            }
            _ => (
                ChoiceSource::Static,
                STATIC_CLASSIFICATIONS.iter().map(|c| (c.to_string(), None)).collect(),
            ),
        }
    }
}
