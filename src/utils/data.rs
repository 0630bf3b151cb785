use crate::utils::dates::{parse_date, DATE_FORMAT};
use crate::utils::grouping::{DomesticFixtures, GroupedFixtures, InternationalFixtures};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DOMESTIC_PREFIX: &str = "domestic_fixtures_";
pub const INTERNATIONAL_PREFIX: &str = "international_fixtures_";

/// Paths written by one run
#[derive(Debug, Clone, PartialEq)]
pub struct SavedFiles {
    pub domestic: PathBuf,
    pub international: PathBuf,
}

/// `<data_dir>/<prefix><YYYY-MM-DD>.json`
pub fn fixture_file_path(data_dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    data_dir.join(format!("{}{}.json", prefix, date.format(DATE_FORMAT)))
}

fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize fixture data")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write fixture file {}", path.display()))?;
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture file {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to deserialize fixture file {}", path.display()))
}

/// Write both collections for `date`. A second run on the same date overwrites.
pub fn save_grouped_fixtures(
    groups: &GroupedFixtures,
    data_dir: &Path,
    date: NaiveDate,
) -> Result<SavedFiles> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let files = SavedFiles {
        domestic: fixture_file_path(data_dir, DOMESTIC_PREFIX, date),
        international: fixture_file_path(data_dir, INTERNATIONAL_PREFIX, date),
    };
    save_json(&groups.domestic, &files.domestic)?;
    save_json(&groups.international, &files.international)?;
    Ok(files)
}

pub fn load_domestic_fixtures(data_dir: &Path, date: NaiveDate) -> Result<DomesticFixtures> {
    load_json(&fixture_file_path(data_dir, DOMESTIC_PREFIX, date))
}

pub fn load_international_fixtures(
    data_dir: &Path,
    date: NaiveDate,
) -> Result<InternationalFixtures> {
    load_json(&fixture_file_path(data_dir, INTERNATIONAL_PREFIX, date))
}

fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".json")?;
    let date = stem
        .strip_prefix(DOMESTIC_PREFIX)
        .or_else(|| stem.strip_prefix(INTERNATIONAL_PREFIX))?;
    parse_date(date)
}

/// Most recent date with at least one fixture file, if any
pub fn latest_fixture_date(data_dir: &Path) -> Result<Option<NaiveDate>> {
    if !data_dir.exists() {
        return Ok(None);
    }

    let entries = std::fs::read_dir(data_dir)
        .with_context(|| format!("Failed to list data directory {}", data_dir.display()))?;

    let mut latest = None;
    for entry in entries {
        let entry = entry.context("Failed to read data directory entry")?;
        let name = entry.file_name();
        if let Some(date) = name.to_str().and_then(date_from_file_name) {
            latest = latest.max(Some(date));
        }
    }
    Ok(latest)
}

/// Load the newest pair of fixture files. A missing half of the pair loads as empty.
pub fn load_latest_fixtures(data_dir: &Path) -> Result<Option<(NaiveDate, GroupedFixtures)>> {
    let Some(date) = latest_fixture_date(data_dir)? else {
        return Ok(None);
    };

    let domestic_path = fixture_file_path(data_dir, DOMESTIC_PREFIX, date);
    let international_path = fixture_file_path(data_dir, INTERNATIONAL_PREFIX, date);

    let groups = GroupedFixtures {
        domestic: if domestic_path.exists() {
            load_json(&domestic_path)?
        } else {
            DomesticFixtures::new()
        },
        international: if international_path.exists() {
            load_json(&international_path)?
        } else {
            InternationalFixtures::new()
        },
    };
    Ok(Some((date, groups)))
}
