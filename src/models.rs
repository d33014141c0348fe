use serde::Serialize;

/// One row of `artifact_metadata`, keyed by the museum object id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRow {
    pub id: i64,
    pub title: String,
    pub culture: String,
    pub period: String,
    pub century: String,
    pub medium: String,
    pub dimensions: String,
    pub description: String,
    pub department: String,
    pub classification: String,
    pub dated: String,
    pub accessionyear: i64,
    pub accessionmethod: String,
}

/// One row of `artifact_media`. At most one per object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRow {
    pub objectid: i64,
    pub imagecount: i64,
    pub mediacount: i64,
    pub colorcount: i64,
    pub rank: i64,
    pub datebegin: i64,
    pub dateend: i64,
}

/// One row of `artifact_colors`. An object may carry any number of these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorRow {
    pub objectid: i64,
    pub color: String,
    pub spectrum: String,
    pub hue: String,
    pub percent: f64,
    pub css3: String,
}

/// The three flattened tables held in a session until they are loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactBatch {
    pub metadata: Vec<MetadataRow>,
    pub media: Vec<MediaRow>,
    pub colors: Vec<ColorRow>,
}

impl ArtifactBatch {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.media.is_empty() && self.colors.is_empty()
    }
}
