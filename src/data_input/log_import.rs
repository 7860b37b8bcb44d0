// src/data_input/log_import.rs

//! Copies `.ulg` files off an SD card (or any directory tree) into a working directory,
//! renaming them after the flight date and time encoded in PX4's log layout.

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AnalysisResult;

const ULOG_EXTENSION: &str = "ulg";

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Prepended to every imported file name.
    pub prefix: String,
    /// Replace files that already exist in the destination.
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedLog {
    pub source: PathBuf,
    pub destination: PathBuf,
}

fn is_ulog(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ULOG_EXTENSION))
}

/// All `.ulg` files below `dir`, sorted by path.
pub fn find_ulog_files(dir: &Path) -> AnalysisResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_ulog(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn is_date_dir(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

fn is_time_stem(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    bytes.len() == 8
        && bytes[2] == b'_'
        && bytes[5] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit())
}

/// `log/2024-05-01/13_45_10.ulg` becomes `<prefix>2024-05-01_13-45-10.ulg`;
/// files outside that layout keep their stem.
pub fn imported_file_name(path: &Path, prefix: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let date_dir = path
        .parent()
        .and_then(Path::file_name)
        .map(|d| d.to_string_lossy().to_string());

    match date_dir {
        Some(date) if is_date_dir(&date) && is_time_stem(&stem) => {
            format!("{prefix}{date}_{}.{ULOG_EXTENSION}", stem.replace('_', "-"))
        }
        _ => format!("{prefix}{stem}.{ULOG_EXTENSION}"),
    }
}

/// Copies every log found below `source_dir` into `dest_dir`. Existing files are left
/// alone unless `overwrite` is set. Returns the logs actually copied.
pub fn import_logs(source_dir: &Path, dest_dir: &Path, options: &ImportOptions) -> AnalysisResult<Vec<ImportedLog>> {
    let sources = find_ulog_files(source_dir)?;
    info!("Found {} log(s) in '{}'", sources.len(), source_dir.display());
    fs::create_dir_all(dest_dir)?;

    let mut imported = Vec::new();
    for source in sources {
        let destination = dest_dir.join(imported_file_name(&source, &options.prefix));
        if destination.exists() && !options.overwrite {
            info!("Skipping '{}': '{}' already exists", source.display(), destination.display());
            continue;
        }
        fs::copy(&source, &destination)?;
        debug!("Copied '{}' -> '{}'", source.display(), destination.display());
        imported.push(ImportedLog { source, destination });
    }
    Ok(imported)
}
