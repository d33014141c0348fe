use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::ingest::types::{Classification, ClassificationPage, FetchedPage, ObjectPage, PageRange};
use crate::utils::config::Config;

pub const ALL_CLASSIFICATIONS: &str = "All";
const USER_AGENT: &str = concat!("harvard-artifacts/", env!("CARGO_PKG_VERSION"));
// The museum API caps page size at 100; every classification fits in one page.
const CLASSIFICATION_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("malformed JSON: {0}")]
    Json(String),
}

/// Failure of a single page request. Ends the fetch it belongs to.
#[derive(Debug, Error)]
#[error("failed to fetch page {page}: {cause}")]
pub struct FetchError {
    pub page: u32,
    #[source]
    pub cause: FetchCause,
}

/// Anything that can serve museum pages. The HTTP client is the real one;
/// tests plug in canned sources.
pub trait ArtifactSource {
    fn fetch_page(&self, classification: &str, page: u32) -> Result<ObjectPage, FetchError>;

    fn fetch_classifications(&self) -> Result<Vec<Classification>, FetchError>;
}

/// Lazy, ascending walk over a page range. Stops for good after the first error.
pub struct Pages<'a, S: ?Sized> {
    source: &'a S,
    classification: String,
    /// Next page to request; `None` once the cursor has passed `u32::MAX`.
    next: Option<u32>,
    end: u32,
    failed: bool,
}

impl<'a, S: ArtifactSource + ?Sized> Iterator for Pages<'a, S> {
    type Item = Result<FetchedPage, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let number = self.next.filter(|n| *n <= self.end)?;
        self.next = number.checked_add(1);

        match self.source.fetch_page(&self.classification, number) {
            Ok(body) => Some(Ok(FetchedPage { number, body })),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(n) if !self.failed && n <= self.end => (0, Some((self.end - n) as usize + 1)),
            _ => (0, Some(0)),
        }
    }
}

pub fn pages<'a, S: ArtifactSource + ?Sized>(
    source: &'a S,
    classification: &str,
    range: PageRange,
) -> Pages<'a, S> {
    Pages {
        source,
        classification: classification.to_string(),
        next: Some(range.start()),
        end: range.end(),
        failed: false,
    }
}

/// Blocking client for the Harvard Art Museums API.
pub struct HarvardClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl HarvardClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("No API key configured. Set HARVARD_API_KEY or run `setup --api-key <KEY>`"))?;

        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            page_size: config.page_size,
        })
    }

    /// Query parameters for one `/object` page. "All" (or blank) drops the filter.
    pub fn object_params(&self, classification: &str, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("apikey", self.api_key.clone()),
            ("size", self.page_size.to_string()),
            ("page", page.to_string()),
        ];
        let classification = classification.trim();
        if !classification.is_empty() && classification != ALL_CLASSIFICATIONS {
            params.push(("classification", classification.to_string()));
        }
        params
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
        page: u32,
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, page, "GET");

        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .map_err(|e| FetchError { page, cause: FetchCause::Network(e.to_string()) })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError { page, cause: FetchCause::Status(status.as_u16()) });
        }

        let body = response
            .text()
            .map_err(|e| FetchError { page, cause: FetchCause::Network(e.to_string()) })?;
        serde_json::from_str(&body).map_err(|e| FetchError { page, cause: FetchCause::Json(e.to_string()) })
    }
}

impl ArtifactSource for HarvardClient {
    fn fetch_page(&self, classification: &str, page: u32) -> Result<ObjectPage, FetchError> {
        let params = self.object_params(classification, page);
        let body: ObjectPage = self.get_json("object", &params, page)?;
        info!(page, records = body.records.len(), "Fetched page");
        Ok(body)
    }

    fn fetch_classifications(&self) -> Result<Vec<Classification>, FetchError> {
        let params = [
            ("apikey", self.api_key.clone()),
            ("size", CLASSIFICATION_PAGE_SIZE.to_string()),
        ];
        let body: ClassificationPage = self.get_json("classification", &params, 1)?;
        let mut list = body.records;
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Canned source: `failing` pages answer with a 500, every other page
    /// holds `records_per_page` records with `colors_per_record` colors.
    pub(crate) struct FakeSource {
        pub records_per_page: usize,
        pub colors_per_record: usize,
        pub failing: Vec<u32>,
        pub classifications: Option<Vec<Classification>>,
        pub requested: RefCell<Vec<(String, u32)>>,
    }

    impl FakeSource {
        pub(crate) fn new(records_per_page: usize, colors_per_record: usize) -> Self {
            Self {
                records_per_page,
                colors_per_record,
                failing: Vec::new(),
                classifications: None,
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    pub(crate) fn fake_record(id: i64, department: &str, colors: usize) -> serde_json::Value {
        let colors: Vec<_> = (0..colors)
            .map(|c| {
                json!({
                    "color": format!("#00000{}", c),
                    "spectrum": "#1eb264",
                    "hue": if c % 2 == 0 { "Grey" } else { "Brown" },
                    "percent": 0.25 + c as f64 / 10.0,
                    "css3": "#000000"
                })
            })
            .collect();
        json!({
            "id": id,
            "objectid": id,
            "title": format!("Object {}", id),
            "culture": "Byzantine",
            "century": "11th century",
            "department": department,
            "classification": "Paintings",
            "imagecount": 1,
            "mediacount": 2,
            "colorcount": colors.len(),
            "rank": id,
            "datebegin": 1500,
            "dateend": 1550,
            "colors": colors
        })
    }

    impl ArtifactSource for FakeSource {
        fn fetch_page(&self, classification: &str, page: u32) -> Result<ObjectPage, FetchError> {
            self.requested.borrow_mut().push((classification.to_string(), page));
            if self.failing.contains(&page) {
                return Err(FetchError { page, cause: FetchCause::Status(500) });
            }
            let base = (page as i64 - 1) * self.records_per_page as i64;
            let records = (0..self.records_per_page as i64)
                .map(|i| fake_record(base + i + 1, "Paintings", self.colors_per_record))
                .collect();
            Ok(ObjectPage { info: Default::default(), records })
        }

        fn fetch_classifications(&self) -> Result<Vec<Classification>, FetchError> {
            self.classifications
                .clone()
                .ok_or(FetchError { page: 1, cause: FetchCause::Network("offline".to_string()) })
        }
    }

    fn test_config(api_key: Option<&str>) -> Config {
        Config {
            api_key: api_key.map(str::to_string),
            base_url: "https://api.example.org/".to_string(),
            page_size: 100,
            db_path: PathBuf::from("unused.sqlite3"),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_pages_yield_every_page_in_order() {
        let source = FakeSource::new(3, 0);
        let range = PageRange::new(2, 5).unwrap();
        let numbers: Vec<u32> = pages(&source, "Coins", range).map(|p| p.unwrap().number).collect();
        assert_eq!(numbers, vec![2, 3, 4, 5]);
        assert!(source.requested.borrow().iter().all(|(c, _)| c == "Coins"));
    }

    #[test]
    fn test_pages_stop_at_first_failure() {
        let mut source = FakeSource::new(1, 0);
        source.failing = vec![3, 4];
        let results: Vec<_> = pages(&source, "All", PageRange::new(1, 5).unwrap()).collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.page, 3);
        // Page 4 and 5 were never requested.
        let requested: Vec<u32> = source.requested.borrow().iter().map(|(_, p)| *p).collect();
        assert_eq!(requested, vec![1, 2, 3]);
    }

    #[test]
    fn test_pages_end_at_last_representable_page() {
        let source = FakeSource::new(1, 0);
        let range = PageRange::new(u32::MAX - 1, u32::MAX).unwrap();
        let mut walk = pages(&source, "All", range);
        assert_eq!(walk.size_hint(), (0, Some(2)));

        let numbers: Vec<u32> = walk.by_ref().map(|p| p.unwrap().number).collect();
        assert_eq!(numbers, vec![u32::MAX - 1, u32::MAX]);
        assert!(walk.next().is_none());
        assert_eq!(walk.size_hint(), (0, Some(0)));
        assert_eq!(source.requested.borrow().len(), 2);

        let single = PageRange::new(u32::MAX, u32::MAX).unwrap();
        assert_eq!(pages(&source, "All", single).count(), 1);
    }

    #[test]
    fn test_object_params_drop_all_filter() {
        let client = HarvardClient::new(&test_config(Some("key"))).unwrap();
        let all = client.object_params("All", 3);
        assert!(all.iter().all(|(k, _)| *k != "classification"));
        assert!(all.contains(&("page", "3".to_string())));
        assert!(all.contains(&("apikey", "key".to_string())));

        let blank = client.object_params("  ", 1);
        assert!(blank.iter().all(|(k, _)| *k != "classification"));

        let coins = client.object_params("Coins", 1);
        assert!(coins.contains(&("classification", "Coins".to_string())));
        assert!(coins.contains(&("size", "100".to_string())));
    }

    #[test]
    fn test_client_requires_api_key() {
        assert!(HarvardClient::new(&test_config(None)).is_err());
        assert!(HarvardClient::new(&test_config(Some("   "))).is_err());
    }

    #[test]
    fn test_fetch_error_names_page() {
        let err = FetchError { page: 7, cause: FetchCause::Status(401) };
        assert_eq!(err.to_string(), "failed to fetch page 7: HTTP status 401");
    }
}
