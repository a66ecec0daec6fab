//! Push command implementation
//!
//! Per-file rejections and conflicts are reported but do not fail the
//! command; the next `status` still shows them pending.

use std::path::Path;

use colored::Colorize;

use bulk_core::{Engine, Transport};

use crate::error::Result;

pub fn run_push(root: &Path, transport: Box<dyn Transport>) -> Result<()> {
    let mut engine = Engine::open(root, transport)?;
    let report = engine.push()?;

    for path in &report.pushed {
        println!("pushed: {path}");
    }
    for path in &report.deleted {
        println!("deleted: {path}");
    }
    for path in &report.conflicts {
        println!(
            "{} {path} changed remotely and locally, resolve before pushing",
            "warn:".yellow().bold()
        );
    }
    for path in &report.failed {
        println!(
            "{} the remote rejected {path}; it is still pending",
            "warn:".yellow().bold()
        );
    }
    println!("Push complete");
    Ok(())
}
