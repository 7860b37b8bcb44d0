// src/main.rs

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use px4_hover_analysis::config::AnalysisConfig;
use px4_hover_analysis::data_analysis::crop::{crop_log_group, default_mode_signal};
use px4_hover_analysis::data_analysis::group_summary::{summarize_group, GroupSummary};
use px4_hover_analysis::data_analysis::hover_metrics::{calculate_hover_metrics, HoverMetrics};
use px4_hover_analysis::data_input::csv_export::export_log_to_csv;
use px4_hover_analysis::constants::MICROS_PER_SECOND;
use px4_hover_analysis::data_input::log_data::{FieldRef, FlightLog, LogGroup};
use px4_hover_analysis::data_input::log_import::{import_logs, ImportOptions};
use px4_hover_analysis::data_input::log_parser::parse_log_group;
use px4_hover_analysis::plot_functions::plot_attitude_tracking::plot_attitude_tracking;
use px4_hover_analysis::plot_functions::plot_compare_flights::plot_compare_flights;
use px4_hover_analysis::plot_functions::plot_compare_groups::plot_compare_groups;
use px4_hover_analysis::plot_functions::plot_hover_error::plot_hover_error;
use px4_hover_analysis::plot_functions::plot_position_tracking::plot_position_tracking;
use px4_hover_analysis::report::{print_group_table, print_metrics_table, write_report};
use px4_hover_analysis::crate_version;

#[derive(Parser, Debug)]
#[command(name = "px4-hover-analysis")]
#[command(about = "Post-flight hover analysis for PX4 ULog flight logs")]
#[command(version)]
struct Cli {
    /// Debug logging (RUST_LOG is used otherwise)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy .ulg files off an SD card, renamed after flight date and time
    Import {
        /// SD card root or any directory containing logs
        source: PathBuf,
        /// Destination directory
        dest: PathBuf,
        /// Prefix for imported file names
        #[arg(long, default_value = "")]
        prefix: String,
        /// Replace files that already exist in the destination
        #[arg(long)]
        overwrite: bool,
    },
    /// Write one CSV per logged topic
    ExportCsv(AnalysisArgs),
    /// Compute hover metrics and write them as CSV/JSON
    Metrics(AnalysisArgs),
    /// Position, attitude and error plots for each flight
    Overview(AnalysisArgs),
    /// Overlay the tracking errors of several flights
    Compare(AnalysisArgs),
    /// Plots and metrics for every flight and group
    Report(AnalysisArgs),
}

#[derive(Args, Debug)]
struct AnalysisArgs {
    /// Log files (.ulg). Without any, the groups of the config file are used.
    logs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Name of the group formed by the log files given on the command line
    #[arg(short, long, default_value = "flights")]
    name: String,

    /// JSON analysis configuration
    #[arg(long)]
    config: Option<PathBuf>,

    // ── Crop options (override the config) ─────────────────────
    /// Topic of the boolean mode signal defining the crop window
    #[arg(long)]
    mode_topic: Option<String>,

    /// Field of the boolean mode signal
    #[arg(long)]
    mode_field: Option<String>,

    /// Crop to the overlap of all topics instead of the mode window
    #[arg(long)]
    no_mode_window: bool,

    /// Seconds skipped at the start of the window
    #[arg(long)]
    start_offset: Option<f64>,

    /// Maximum window length in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Resample every topic onto a common grid with this step (s)
    #[arg(long)]
    resample: Option<f64>,

    /// Analyse the full logs without cropping
    #[arg(long)]
    no_crop: bool,
}

impl AnalysisArgs {
    fn analysis_config(&self) -> Result<AnalysisConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };

        if self.mode_topic.is_some() || self.mode_field.is_some() {
            let base = config
                .crop
                .mode_signal
                .clone()
                .or_else(default_mode_signal)
                .unwrap_or_else(|| FieldRef::new("", ""));
            config.crop.mode_signal = Some(FieldRef::new(
                self.mode_topic.clone().unwrap_or(base.series),
                self.mode_field.clone().unwrap_or(base.field),
            ));
        }
        if self.no_mode_window {
            config.crop.mode_signal = None;
        }
        if self.start_offset.is_some() {
            config.crop.start_offset_s = self.start_offset;
        }
        if self.duration.is_some() {
            config.crop.duration_s = self.duration;
        }
        if self.resample.is_some() {
            config.crop.resample_dt_s = self.resample;
        }
        Ok(config)
    }

    /// Loads (and unless `--no-crop`, crops) the groups to analyse.
    fn load_groups(&self, config: &AnalysisConfig) -> Result<Vec<LogGroup>, Box<dyn Error>> {
        let raw_groups: Vec<LogGroup> = if !self.logs.is_empty() {
            vec![parse_log_group(&self.name, &self.logs)]
        } else if !config.groups.is_empty() {
            config
                .groups
                .iter()
                .map(|group| parse_log_group(&group.name, &group.logs))
                .collect()
        } else {
            return Err("No log files given and no groups in the config.".into());
        };

        if self.no_crop {
            return Ok(raw_groups);
        }
        let mut groups = Vec::with_capacity(raw_groups.len());
        for group in &raw_groups {
            match crop_log_group(group, &config.crop) {
                Ok(cropped) => groups.push(cropped),
                Err(e) => warn!("Skipping group '{}': {}", group.name, e),
            }
        }
        Ok(groups)
    }
}

fn group_metrics(group: &LogGroup, config: &AnalysisConfig) -> Vec<HoverMetrics> {
    group
        .logs
        .iter()
        .filter_map(|log| match calculate_hover_metrics(log, &config.sources) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("No metrics for '{}': {}", log.name, e);
                None
            }
        })
        .collect()
}

fn print_log_summary(log: &FlightLog) {
    println!("\nFlight '{}': {:.1} s, {} series", log.name, log.duration_s(), log.series.len());
    for key in ["sys_name", "ver_hw", "ver_sw"] {
        if let Some(value) = log.info_text(key) {
            println!("  {key}: {value}");
        }
    }
    if let Some((start_us, end_us)) = log.crop_window {
        println!(
            "  Window: [{:.2}, {:.2}] s of log time",
            start_us as f64 / MICROS_PER_SECOND,
            end_us as f64 / MICROS_PER_SECOND
        );
    }
    for message in &log.messages {
        println!(
            "  [{:>8.2} s] {:<9} {}",
            message.timestamp_us as f64 / MICROS_PER_SECOND,
            message.level_name(),
            message.text
        );
    }
    if !log.dropouts.is_empty() {
        let lost_ms: u32 = log.dropouts.iter().map(|d| u32::from(d.duration_ms)).sum();
        println!("  {} dropout(s), {} ms lost", log.dropouts.len(), lost_ms);
    }
}

fn plot_overview(group: &LogGroup, config: &AnalysisConfig, output_dir: &Path) -> Result<(), Box<dyn Error>> {
    let overlay = config.mode_overlay.as_ref();
    for log in &group.logs {
        print_log_summary(log);
        println!("\n--- Generating overview plots for '{}' ---", log.name);
        plot_position_tracking(log, &config.sources, overlay, output_dir)?;
        plot_attitude_tracking(log, &config.sources, overlay, output_dir)?;
        plot_hover_error(log, &config.sources, overlay, output_dir)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Analysis {
    ExportCsv,
    Metrics,
    Overview,
    Compare,
    Report,
}

fn run_analysis(analysis: Analysis, args: &AnalysisArgs) -> Result<(), Box<dyn Error>> {
    let config = args.analysis_config()?;
    let groups = args.load_groups(&config)?;
    fs::create_dir_all(&args.output_dir)?;
    info!("Output directory: '{}'", args.output_dir.display());

    match analysis {
        Analysis::ExportCsv => {
            for log in groups.iter().flat_map(|g| &g.logs) {
                let written = export_log_to_csv(log, &args.output_dir)?;
                println!("  '{}': {} CSV file(s) written.", log.name, written.len());
            }
        }
        Analysis::Overview => {
            for group in &groups {
                plot_overview(group, &config, &args.output_dir)?;
            }
        }
        Analysis::Compare => {
            for group in &groups {
                println!("\n--- Generating flight comparison for '{}' ---", group.name);
                plot_compare_flights(&group.logs, &config.sources, &group.name, &args.output_dir)?;
                print_metrics_table(&group_metrics(group, &config));
            }
        }
        Analysis::Metrics | Analysis::Report => {
            let mut all_flights = Vec::new();
            let mut summaries: Vec<(GroupSummary, Vec<HoverMetrics>)> = Vec::new();
            for group in &groups {
                if analysis == Analysis::Report {
                    plot_overview(group, &config, &args.output_dir)?;
                    println!("\n--- Generating flight comparison for '{}' ---", group.name);
                    plot_compare_flights(&group.logs, &config.sources, &group.name, &args.output_dir)?;
                }
                let flights = group_metrics(group, &config);
                all_flights.extend(flights.iter().cloned());
                summaries.push((summarize_group(&group.name, &flights), flights));
            }

            print_metrics_table(&all_flights);
            let group_summaries: Vec<GroupSummary> = summaries.iter().map(|(s, _)| s.clone()).collect();
            if group_summaries.len() > 1 {
                print_group_table(&group_summaries);
            }
            if analysis == Analysis::Report && summaries.len() > 1 {
                println!("\n--- Generating group comparison ---");
                plot_compare_groups(&summaries, &args.name, &args.output_dir)?;
            }

            let groups_for_report: &[GroupSummary] = if group_summaries.len() > 1 {
                group_summaries.as_slice()
            } else {
                &[]
            };
            for path in write_report(&args.output_dir, &args.name, &all_flights, groups_for_report)? {
                println!("  Report saved as '{}'.", path.display());
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    println!("px4-hover-analysis {}", crate_version());

    match &cli.command {
        Command::Import {
            source,
            dest,
            prefix,
            overwrite,
        } => {
            let options = ImportOptions {
                prefix: prefix.clone(),
                overwrite: *overwrite,
            };
            let imported = import_logs(source, dest, &options)?;
            for log in &imported {
                println!("  '{}' -> '{}'", log.source.display(), log.destination.display());
            }
            println!("{} log(s) imported into '{}'.", imported.len(), dest.display());
        }
        Command::ExportCsv(args) => run_analysis(Analysis::ExportCsv, args)?,
        Command::Metrics(args) => run_analysis(Analysis::Metrics, args)?,
        Command::Overview(args) => run_analysis(Analysis::Overview, args)?,
        Command::Compare(args) => run_analysis(Analysis::Compare, args)?,
        Command::Report(args) => run_analysis(Analysis::Report, args)?,
    }
    Ok(())
}
