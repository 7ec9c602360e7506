//! Subcommand handlers
//!
//! Run summaries go to stdout; logs go to stderr.

pub mod blobs;
pub mod organize;
pub mod recover;
pub mod timeline;

use salvage_store::{Failure, MaterializeReport, Outcome, Placement, Skipped};
use std::path::Path;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Counts line followed by one line per skipped or failed item
fn print_summary(report: &MaterializeReport, skipped: &[Skipped]) {
    println!(
        "recovered: {}  unchanged: {}  failed: {}  skipped: {}",
        report.written(),
        report.unchanged(),
        report.failed(),
        skipped.len()
    );
    for Skipped { unit, error } in skipped {
        println!("  skipped {}: {}", unit, error);
    }
    for Failure { name, error } in &report.failures {
        println!("  failed {}: {}", name, error);
    }
}

/// One line per placed file, relative to `root`
fn print_placements(report: &MaterializeReport, root: &Path) {
    for placement in &report.placements {
        println!("{}", placement_line(placement, root));
    }
}

fn placement_line(placement: &Placement, root: &Path) -> String {
    let shown = placement
        .target
        .strip_prefix(root)
        .unwrap_or(&placement.target);
    let marker = match placement.outcome {
        Outcome::Written => "+",
        Outcome::Unchanged => "=",
    };
    format!(
        "  {} {}  {} bytes  sha256:{}",
        marker,
        shown.display(),
        placement.size,
        placement.digest.get(..12).unwrap_or(&placement.digest)
    )
}

/// First line of `text`, cut to `max` characters
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut out: String = line.chars().take(max).collect();
    if line.chars().count() > max || text.lines().nth(1).is_some() {
        out.push_str("...");
    }
    out
}
