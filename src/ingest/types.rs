use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Pagination block returned with every `/object` and `/classification` page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PageInfo {
    #[serde(default)]
    pub totalrecords: u64,
    #[serde(default)]
    pub totalrecordsperquery: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub page: u32,
}

/// Raw body of one `/object` page. Records stay untyped so a single odd
/// record can be skipped during flattening instead of failing the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectPage {
    #[serde(default)]
    pub info: PageInfo,
    #[serde(default)]
    pub records: Vec<Value>,
}

/// A page body tagged with the page number that was requested.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub number: u32,
    pub body: ObjectPage,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Classification {
    pub name: String,
    #[serde(default)]
    pub objectcount: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassificationPage {
    #[serde(default)]
    pub records: Vec<Classification>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid page range {start}..={end}: pages start at 1 and the start page may not exceed the end page")]
pub struct RangeError {
    pub start: u32,
    pub end: u32,
}

/// Inclusive, validated page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self, RangeError> {
        if start == 0 || start > end {
            return Err(RangeError { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self { start: 1, end: 1 }
    }
}
