pub const METADATA_TABLE: &str = "artifact_metadata";
pub const MEDIA_TABLE: &str = "artifact_media";
pub const COLORS_TABLE: &str = "artifact_colors";

pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS artifact_metadata (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL DEFAULT '',
        culture TEXT NOT NULL DEFAULT '',
        period TEXT NOT NULL DEFAULT '',
        century TEXT NOT NULL DEFAULT '',
        medium TEXT NOT NULL DEFAULT '',
        dimensions TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        department TEXT NOT NULL DEFAULT '',
        classification TEXT NOT NULL DEFAULT '',
        dated TEXT NOT NULL DEFAULT '',
        accessionyear INTEGER NOT NULL DEFAULT 0,
        accessionmethod TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS artifact_media (
        objectid INTEGER PRIMARY KEY,
        imagecount INTEGER NOT NULL DEFAULT 0,
        mediacount INTEGER NOT NULL DEFAULT 0,
        colorcount INTEGER NOT NULL DEFAULT 0,
        rank INTEGER NOT NULL DEFAULT 0,
        datebegin INTEGER NOT NULL DEFAULT 0,
        dateend INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY(objectid) REFERENCES artifact_metadata(id)
    );

    CREATE TABLE IF NOT EXISTS artifact_colors (
        objectid INTEGER NOT NULL,
        color TEXT NOT NULL DEFAULT '',
        spectrum TEXT NOT NULL DEFAULT '',
        hue TEXT NOT NULL DEFAULT '',
        percent REAL NOT NULL DEFAULT 0,
        css3 TEXT NOT NULL DEFAULT '',
        FOREIGN KEY(objectid) REFERENCES artifact_metadata(id),
        UNIQUE(objectid, color, spectrum, hue, percent, css3)
    );
";
