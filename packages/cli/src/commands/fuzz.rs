use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use selser_engine::{DiffStats, NormalizeOptions};
use selser_markup::{MarkupParser, MarkupSerializer};
use selser_simulator::{DisplayChanges, RoundTripHarness, RoundTripReport, RunOutcome, TestCase};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct FuzzArgs {
    /// Markup file, or a directory of markup files
    pub input: PathBuf,

    /// Seed prefixed to every test title
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Random edits per file
    #[arg(short, long)]
    pub runs: Option<usize>,

    /// Print the full reports as JSON
    #[arg(long)]
    pub json: bool,
}

/// Round-trip random edits of each input file through selective serialization
pub fn fuzz(args: FuzzArgs, config: &Config) -> Result<()> {
    let seed = args.seed.clone().unwrap_or_else(|| config.fuzz.seed.clone());
    let runs = args.runs.unwrap_or(config.fuzz.runs);

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_source_files(&args.input)
    } else {
        return Err(anyhow::anyhow!(
            "Input path does not exist: {}",
            args.input.display()
        ));
    };

    let parser = MarkupParser::new(config.selser.clone());
    let serializer = MarkupSerializer::new(config.selser.clone());
    let harness = RoundTripHarness::new(&parser, &serializer, &config.selser, NormalizeOptions::default())?;

    if !args.json {
        println!("🎲 {} round trips", "Running".green().bold());
        println!("   Files: {}  Runs per file: {}", files.len(), runs);
        println!();
    }

    let mut reports = Vec::new();
    let mut totals = DiffStats::default();
    let (mut passed, mut failed, mut duplicates) = (0, 0, 0);

    for file in &files {
        let source = fs::read_to_string(file)?;
        let title = file.to_string_lossy().to_string();
        let test = TestCase::new(title, source).with_seed(seed.clone());
        debug!(file = %file.display(), runs, "running round trips");

        let mut report = harness.run(&test, runs)?;
        let root_edit = harness.run_root_edit(&test)?;
        match root_edit.outcome {
            RunOutcome::Pass => report.passed += 1,
            _ => report.failed += 1,
        }
        report.runs.push(root_edit);

        info!(
            file = %file.display(),
            passed = report.passed,
            failed = report.failed,
            duplicates = report.duplicates,
            "round trips finished"
        );
        passed += report.passed;
        failed += report.failed;
        duplicates += report.duplicates;
        totals.merge(&report.stats);

        if !args.json {
            print_report(file, &report);
        }
        reports.push(report);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!();
        println!(
            "✨ {} Round trips complete!",
            if failed > 0 {
                "Done".red().bold()
            } else {
                "Done".green().bold()
            }
        );
        println!("   {} {}", "Passed:".green(), passed);
        if failed > 0 {
            println!("   {} {}", "Failed:".red(), failed);
        }
        if duplicates > 0 {
            println!("   {} {}", "No unique change:".yellow(), duplicates);
        }
        println!("   Edit kind: {:?}", totals.edit_kind());
    }

    // Exit with error code if there are failures
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(file: &Path, report: &RoundTripReport) {
    let marker = if report.is_success() {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "{} {} ({} passed, {} failed)",
        marker,
        file.display(),
        report.passed,
        report.failed
    );

    for run in &report.runs {
        if let RunOutcome::Fail { expected, actual } = &run.outcome {
            println!("   changes {}", DisplayChanges(&run.changes));
            println!("     {} {}", "expected:".dimmed(), expected);
            println!("     {} {}", "actual:".dimmed(), actual);
        }
    }
}

fn find_source_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| !p.file_name().map_or(false, |n| n.to_string_lossy().starts_with('.')))
        .collect();
    files.sort();
    files
}
