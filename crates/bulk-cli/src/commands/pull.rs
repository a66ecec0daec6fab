//! Pull command implementation

use std::path::Path;

use colored::Colorize;

use bulk_core::{Engine, Transport};

use crate::error::Result;

pub fn run_pull(root: &Path, transport: Box<dyn Transport>) -> Result<()> {
    let mut engine = Engine::open(root, transport)?;
    let report = engine.pull()?;

    if report.fetched.is_empty() && report.removed.is_empty() {
        println!("Already up to date");
    } else {
        for path in &report.fetched {
            println!("pulled: {path}");
        }
        for path in &report.removed {
            println!("removed: {path}");
        }
    }
    for path in &report.kept {
        println!(
            "{} {path} was removed remotely but has local changes, keeping it",
            "warn:".yellow().bold()
        );
    }
    for path in &report.failed {
        println!(
            "{} failed to pull {path}; rerun `bulk pull` to retry",
            "warn:".yellow().bold()
        );
    }
    Ok(())
}
