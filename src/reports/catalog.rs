//! Fixed report catalog. Each entry is plain data: the SQL, the parameters it
//! binds, the columns it returns and an optional chart hint. Adding a report
//! means adding an entry here, nothing else.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportGroup {
    Metadata,
    Media,
    Color,
    Join,
    Chart,
}

impl ReportGroup {
    pub fn label(&self) -> &'static str {
        match self {
            ReportGroup::Metadata => "Artifact Metadata Report",
            ReportGroup::Media => "Artifact Media Report",
            ReportGroup::Color => "Artifact Color Report",
            ReportGroup::Join => "Join-Based Queries",
            ReportGroup::Chart => "Charts",
        }
    }

    pub const ALL: [ReportGroup; 5] = [
        ReportGroup::Metadata,
        ReportGroup::Media,
        ReportGroup::Color,
        ReportGroup::Join,
        ReportGroup::Chart,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Integer,
}

/// A named SQL parameter (`:name` in the query) and its default value.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: &'static str,
}

impl ParamSpec {
    const fn text(name: &'static str, default: &'static str) -> Self {
        Self { name, kind: ParamKind::Text, default }
    }

    const fn integer(name: &'static str, default: &'static str) -> Self {
        Self { name, kind: ParamKind::Integer, default }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Real => "real",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, kind: ColumnKind::Text }
}

const fn integer(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, kind: ColumnKind::Integer }
}

const fn real(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, kind: ColumnKind::Real }
}

/// Bar chart of `value` per `label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartHint {
    pub label: &'static str,
    pub value: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ReportDefinition {
    pub id: &'static str,
    pub group: ReportGroup,
    pub title: &'static str,
    pub sql: &'static str,
    pub params: &'static [ParamSpec],
    pub columns: &'static [ColumnSpec],
    pub chart: Option<ChartHint>,
}

const METADATA_COLUMNS: &[ColumnSpec] = &[
    integer("id"),
    text("title"),
    text("culture"),
    text("period"),
    text("century"),
    text("medium"),
    text("department"),
    text("classification"),
    text("dated"),
    integer("accessionyear"),
];

pub static CATALOG: &[ReportDefinition] = &[
    // Metadata
    ReportDefinition {
        id: "byzantine-11th-century",
        group: ReportGroup::Metadata,
        title: "Byzantine Artifacts (11th Century)",
        sql: "SELECT id, title, culture, period, century, medium, department, classification, dated, accessionyear
              FROM artifact_metadata
              WHERE century LIKE :century || '%' AND culture = :culture
              ORDER BY id",
        params: &[ParamSpec::text("culture", "Byzantine"), ParamSpec::text("century", "11th")],
        columns: METADATA_COLUMNS,
        chart: None,
    },
    ReportDefinition {
        id: "unique-cultures",
        group: ReportGroup::Metadata,
        title: "Unique Cultures Represented",
        sql: "SELECT DISTINCT culture FROM artifact_metadata WHERE culture <> '' ORDER BY culture",
        params: &[],
        columns: &[text("culture")],
        chart: None,
    },
    ReportDefinition {
        id: "archaic-period",
        group: ReportGroup::Metadata,
        title: "Archaic Period Artifacts",
        sql: "SELECT id, title, culture, period, century, medium, department, classification, dated, accessionyear
              FROM artifact_metadata
              WHERE period = :period
              ORDER BY id",
        params: &[ParamSpec::text("period", "Archaic period")],
        columns: METADATA_COLUMNS,
        chart: None,
    },
    ReportDefinition {
        id: "titles-by-accession-year",
        group: ReportGroup::Metadata,
        title: "Artifacts by Title (Sorted by Accession Year, Descending)",
        sql: "SELECT title, accessionyear FROM artifact_metadata ORDER BY accessionyear DESC, title",
        params: &[],
        columns: &[text("title"), integer("accessionyear")],
        chart: None,
    },
    ReportDefinition {
        id: "department-counts",
        group: ReportGroup::Metadata,
        title: "Department-wise Artifact Counts",
        sql: "SELECT department, COUNT(*) AS artifact_count
              FROM artifact_metadata
              GROUP BY department
              ORDER BY artifact_count DESC, department",
        params: &[],
        columns: &[text("department"), integer("artifact_count")],
        chart: Some(ChartHint { label: "department", value: "artifact_count" }),
    },
    // Media
    ReportDefinition {
        id: "multi-image",
        group: ReportGroup::Media,
        title: "Artifacts with More Than One Image",
        sql: "SELECT objectid, imagecount, mediacount, colorcount, rank, datebegin, dateend
              FROM artifact_media
              WHERE imagecount > :min_images
              ORDER BY imagecount DESC, objectid",
        params: &[ParamSpec::integer("min_images", "1")],
        columns: &[
            integer("objectid"),
            integer("imagecount"),
            integer("mediacount"),
            integer("colorcount"),
            integer("rank"),
            integer("datebegin"),
            integer("dateend"),
        ],
        chart: None,
    },
    ReportDefinition {
        id: "average-rank",
        group: ReportGroup::Media,
        title: "Average Rank of Artifacts",
        sql: "SELECT ROUND(AVG(rank), 2) AS avg_rank, SUM(rank) AS total_ranks, COUNT(rank) AS no_of_ranks
              FROM artifact_media
              WHERE rank > 0",
        params: &[],
        columns: &[real("avg_rank"), integer("total_ranks"), integer("no_of_ranks")],
        chart: None,
    },
    ReportDefinition {
        id: "colors-exceed-media",
        group: ReportGroup::Media,
        title: "Higher Color Count than Media Count",
        sql: "SELECT objectid, colorcount, mediacount
              FROM artifact_media
              WHERE colorcount > mediacount
              ORDER BY objectid",
        params: &[],
        columns: &[integer("objectid"), integer("colorcount"), integer("mediacount")],
        chart: None,
    },
    ReportDefinition {
        id: "created-between",
        group: ReportGroup::Media,
        title: "Artifacts Created Between Two Years",
        sql: "SELECT a.objectid, m.title, m.culture, a.datebegin, a.dateend
              FROM artifact_media a
              JOIN artifact_metadata m ON a.objectid = m.id
              WHERE a.datebegin >= :from_year AND a.dateend <= :to_year
              ORDER BY a.datebegin, a.objectid",
        params: &[ParamSpec::integer("from_year", "1500"), ParamSpec::integer("to_year", "1600")],
        columns: &[
            integer("objectid"),
            text("title"),
            text("culture"),
            integer("datebegin"),
            integer("dateend"),
        ],
        chart: None,
    },
    ReportDefinition {
        id: "no-media",
        group: ReportGroup::Media,
        title: "Artifacts Without Media Files",
        sql: "SELECT COUNT(*) AS artifacts_without_media FROM artifact_media WHERE imagecount = 0",
        params: &[],
        columns: &[integer("artifacts_without_media")],
        chart: None,
    },
    // Colors
    ReportDefinition {
        id: "unique-hues",
        group: ReportGroup::Color,
        title: "Unique Hues",
        sql: "SELECT DISTINCT hue FROM artifact_colors WHERE hue <> '' ORDER BY hue",
        params: &[],
        columns: &[text("hue")],
        chart: None,
    },
    ReportDefinition {
        id: "top-colors",
        group: ReportGroup::Color,
        title: "Most Used Colors by Frequency",
        sql: "SELECT color, MAX(hue) AS hue, COUNT(*) AS frequency
              FROM artifact_colors
              GROUP BY color
              ORDER BY frequency DESC, color
              LIMIT :limit",
        params: &[ParamSpec::integer("limit", "5")],
        columns: &[text("color"), text("hue"), integer("frequency")],
        chart: Some(ChartHint { label: "color", value: "frequency" }),
    },
    ReportDefinition {
        id: "hue-coverage",
        group: ReportGroup::Color,
        title: "Average Coverage Percentage per Hue",
        sql: "SELECT hue, ROUND(AVG(percent), 2) AS avg_coverage
              FROM artifact_colors
              WHERE hue <> '' AND percent > 0
              GROUP BY hue
              ORDER BY avg_coverage DESC, hue",
        params: &[],
        columns: &[text("hue"), real("avg_coverage")],
        chart: Some(ChartHint { label: "hue", value: "avg_coverage" }),
    },
    ReportDefinition {
        id: "colors-by-artifact",
        group: ReportGroup::Color,
        title: "All Colors by Artifact",
        sql: "SELECT objectid, color, hue, spectrum, percent, css3
              FROM artifact_colors
              ORDER BY objectid, percent DESC",
        params: &[],
        columns: &[
            integer("objectid"),
            text("color"),
            text("hue"),
            text("spectrum"),
            real("percent"),
            text("css3"),
        ],
        chart: None,
    },
    ReportDefinition {
        id: "total-colors",
        group: ReportGroup::Color,
        title: "Total Color Entries",
        sql: "SELECT COUNT(*) AS total_color_entries FROM artifact_colors",
        params: &[],
        columns: &[integer("total_color_entries")],
        chart: None,
    },
    // Joins
    ReportDefinition {
        id: "byzantine-hues",
        group: ReportGroup::Join,
        title: "Byzantine Artifacts and Their Color Hues",
        sql: "SELECT m.title, c.hue
              FROM artifact_metadata m
              JOIN artifact_colors c ON m.id = c.objectid
              WHERE m.culture = :culture
              ORDER BY m.title, c.hue",
        params: &[ParamSpec::text("culture", "Byzantine")],
        columns: &[text("title"), text("hue")],
        chart: None,
    },
    ReportDefinition {
        id: "color-mapping",
        group: ReportGroup::Join,
        title: "Artifact Titles and Their Color Hues",
        sql: "SELECT m.title, c.hue
              FROM artifact_metadata m
              JOIN artifact_colors c ON m.id = c.objectid
              ORDER BY m.title, c.hue",
        params: &[],
        columns: &[text("title"), text("hue")],
        chart: None,
    },
    ReportDefinition {
        id: "period-media-rank",
        group: ReportGroup::Join,
        title: "Artifacts by Period with Media Rank",
        sql: "SELECT m.title, m.culture, m.period, a.rank
              FROM artifact_metadata m
              JOIN artifact_media a ON m.id = a.objectid
              WHERE m.period <> ''
              ORDER BY m.title",
        params: &[],
        columns: &[text("title"), text("culture"), text("period"), integer("rank")],
        chart: None,
    },
    ReportDefinition {
        id: "grey-top-ranked",
        group: ReportGroup::Join,
        title: "Top Ranked Artifacts with Grey Colors",
        sql: "SELECT m.title, a.rank, c.hue
              FROM artifact_metadata m
              JOIN artifact_media a ON m.id = a.objectid
              JOIN artifact_colors c ON m.id = c.objectid
              WHERE c.hue = :hue
              ORDER BY a.rank ASC, m.title
              LIMIT :limit",
        params: &[ParamSpec::text("hue", "Grey"), ParamSpec::integer("limit", "10")],
        columns: &[text("title"), integer("rank"), text("hue")],
        chart: None,
    },
    ReportDefinition {
        id: "classification-media-overview",
        group: ReportGroup::Join,
        title: "Artifacts per Classification and Media Overview",
        sql: "SELECT m.classification, COUNT(*) AS artifact_count, ROUND(AVG(a.mediacount), 2) AS avg_media_count
              FROM artifact_metadata m
              JOIN artifact_media a ON m.id = a.objectid
              GROUP BY m.classification
              ORDER BY artifact_count DESC, m.classification",
        params: &[],
        columns: &[text("classification"), integer("artifact_count"), real("avg_media_count")],
        chart: None,
    },
    // Charts
    ReportDefinition {
        id: "century-chart",
        group: ReportGroup::Chart,
        title: "Century-wise Collection",
        sql: "SELECT century, COUNT(*) AS total FROM artifact_metadata GROUP BY century ORDER BY century",
        params: &[],
        columns: &[text("century"), integer("total")],
        chart: Some(ChartHint { label: "century", value: "total" }),
    },
    ReportDefinition {
        id: "classification-chart",
        group: ReportGroup::Chart,
        title: "Classification Counts",
        sql: "SELECT classification, COUNT(*) AS total_count
              FROM artifact_metadata
              GROUP BY classification
              ORDER BY total_count DESC, classification",
        params: &[],
        columns: &[text("classification"), integer("total_count")],
        chart: Some(ChartHint { label: "classification", value: "total_count" }),
    },
    ReportDefinition {
        id: "classification-color-chart",
        group: ReportGroup::Chart,
        title: "Classification vs Average Color Coverage",
        sql: "SELECT m.classification, ROUND(AVG(c.percent), 2) AS avg_color_coverage
              FROM artifact_metadata m
              JOIN artifact_colors c ON m.id = c.objectid
              WHERE c.percent > 0
              GROUP BY m.classification
              ORDER BY avg_color_coverage DESC, m.classification",
        params: &[],
        columns: &[text("classification"), real("avg_color_coverage")],
        chart: Some(ChartHint { label: "classification", value: "avg_color_coverage" }),
    },
];
