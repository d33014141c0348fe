use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

pub const ENV_FILE: &str = ".env";
pub const API_KEY_VAR: &str = "HARVARD_API_KEY";
pub const DB_PATH_VAR: &str = "HARVARD_DB_PATH";
pub const BASE_URL_VAR: &str = "HARVARD_API_URL";

pub const DEFAULT_BASE_URL: &str = "https://api.harvardartmuseums.org";
pub const DEFAULT_DB_PATH: &str = "harvard_db.sqlite3";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub page_size: u32,
    pub db_path: PathBuf,
    pub timeout_secs: u64,
}

/// Values given on the command line. They beat everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub db_path: Option<PathBuf>,
    pub page_size: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Main entry point to get the configuration.
/// Command line first, then the process environment, then `.env`, then defaults.
pub fn load(overrides: &Overrides) -> Result<Config> {
    resolve(overrides, Path::new(ENV_FILE), |key| std::env::var(key).ok())
}

fn resolve<F>(overrides: &Overrides, env_path: &Path, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let file_values = if env_path.exists() {
        let values = load_from_env(env_path)?;
        debug!("Loaded {} value(s) from {:?}", values.len(), env_path);
        values
    } else {
        HashMap::new()
    };

    let setting = |key: &str| {
        lookup(key)
            .or_else(|| file_values.get(key).cloned())
            .filter(|v| !v.trim().is_empty())
    };

    let page_size = overrides.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    anyhow::ensure!((1..=100).contains(&page_size), "page size must be between 1 and 100, got {}", page_size);

    Ok(Config {
        api_key: overrides.api_key.clone().or_else(|| setting(API_KEY_VAR)),
        base_url: setting(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        page_size,
        db_path: overrides
            .db_path
            .clone()
            .or_else(|| setting(DB_PATH_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
        timeout_secs: overrides.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
    })
}

fn load_from_env(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);

    let mut values = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            values.insert(key.trim().to_string(), value.to_string());
        }
    }
    Ok(values)
}

/// Writes `key=value` into the env file, replacing an existing entry and
/// keeping every other line as it was.
pub fn save_to_env(path: &Path, key: &str, value: &str) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?
    } else {
        String::new()
    };

    let mut replaced = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| match line.split_once('=') {
            Some((k, _)) if k.trim() == key => {
                replaced = true;
                format!("{}={}", key, value)
            }
            _ => line.to_string(),
        })
        .collect();
    if !replaced {
        lines.push(format!("{}={}", key, value));
    }

    let mut file = File::create(path).context("Failed to create .env file")?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    info!("Saved {} to {:?}", key, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_save_and_load_env() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".env");
        fs::write(&path, "# local settings\nHARVARD_DB_PATH=old.sqlite3\nOTHER=1\n")?;

        save_to_env(&path, API_KEY_VAR, "abc-123")?;
        save_to_env(&path, DB_PATH_VAR, "new.sqlite3")?;

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("# local settings"));
        assert!(content.contains("OTHER=1"));
        assert!(!content.contains("old.sqlite3"));

        let loaded = load_from_env(&path)?;
        assert_eq!(loaded.get(API_KEY_VAR).map(String::as_str), Some("abc-123"));
        assert_eq!(loaded.get(DB_PATH_VAR).map(String::as_str), Some("new.sqlite3"));
        Ok(())
    }

    #[test]
    fn test_defaults_without_any_source() -> Result<()> {
        let dir = tempdir()?;
        let config = resolve(&Overrides::default(), &dir.path().join(".env"), no_env)?;
        assert_eq!(config.api_key, None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        Ok(())
    }

    #[test]
    fn test_precedence_flag_then_env_then_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".env");
        fs::write(&path, "HARVARD_API_KEY=\"from-file\"\nHARVARD_DB_PATH=file.sqlite3\n")?;

        let from_file = resolve(&Overrides::default(), &path, no_env)?;
        assert_eq!(from_file.api_key.as_deref(), Some("from-file"));
        assert_eq!(from_file.db_path, PathBuf::from("file.sqlite3"));

        let from_env = resolve(&Overrides::default(), &path, |k| {
            (k == API_KEY_VAR).then(|| "from-env".to_string())
        })?;
        assert_eq!(from_env.api_key.as_deref(), Some("from-env"));

        let flags = Overrides {
            api_key: Some("from-flag".to_string()),
            db_path: Some(PathBuf::from("flag.sqlite3")),
            ..Default::default()
        };
        let from_flag = resolve(&flags, &path, |_| Some("from-env".to_string()))?;
        assert_eq!(from_flag.api_key.as_deref(), Some("from-flag"));
        assert_eq!(from_flag.db_path, PathBuf::from("flag.sqlite3"));
        Ok(())
    }

    #[test]
    fn test_rejects_oversized_pages() {
        let dir = tempdir().unwrap();
        let overrides = Overrides { page_size: Some(500), ..Default::default() };
        assert!(resolve(&overrides, &dir.path().join(".env"), no_env).is_err());
    }
}
