// src/data_input/csv_export.rs

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::data_input::log_data::{FlightLog, TimeSeries};
use crate::error::AnalysisResult;

/// Column headers: `timestamp`, `elapsed_s` when present, then one column per field
/// element (`x`, `q[0]` ... `q[3]`).
pub fn csv_header(series: &TimeSeries) -> Vec<String> {
    let mut header = vec!["timestamp".to_string()];
    if series.elapsed_s.is_some() {
        header.push("elapsed_s".to_string());
    }
    for column in &series.fields {
        if column.width() == 1 {
            header.push(column.name.clone());
        } else {
            header.extend((0..column.width()).map(|i| format!("{}[{}]", column.name, i)));
        }
    }
    header
}

pub fn write_series_csv(series: &TimeSeries, path: &Path) -> AnalysisResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(csv_header(series))?;
    for row in 0..series.len() {
        let mut record = vec![series.timestamps_us[row].to_string()];
        if let Some(elapsed) = &series.elapsed_s {
            record.push(elapsed[row].to_string());
        }
        for column in &series.fields {
            record.extend(column.values.row(row).iter().map(|v| v.to_string()));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes one `<log>_<series>.csv` per series into `dir`. Returns the files written.
pub fn export_log_to_csv(log: &FlightLog, dir: &Path) -> AnalysisResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(log.series.len());
    for (key, series) in &log.series {
        let path = dir.join(format!("{}_{}.csv", log.name, key));
        write_series_csv(series, &path)?;
        written.push(path);
    }
    info!("Exported {} series of '{}' to '{}'", written.len(), log.name, dir.display());
    Ok(written)
}
