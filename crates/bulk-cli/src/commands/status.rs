//! Status command implementation
//!
//! Prints two sections: remote changes against a freshly pulled index, and
//! local changes against the working tree. Never mutates the checkout.

use std::path::Path;

use bulk_core::{ChangeReport, Engine, StatusReport, Transport};

use crate::error::Result;

pub fn run_status(root: &Path, transport: Box<dyn Transport>) -> Result<()> {
    let engine = Engine::open(root, transport)?;
    let report = engine.status()?;
    print!("{}", render_status(&report));
    Ok(())
}

fn render_status(report: &StatusReport) -> String {
    let mut out = String::new();

    if report.remote.is_empty() {
        out.push_str(&format!("You are up to date with {}\n", report.base));
    } else {
        out.push_str("Remote changes\n");
        push_section(&mut out, &report.remote);
    }

    out.push('\n');

    if report.local.is_empty() {
        out.push_str("No local changes\n");
    } else {
        out.push_str("Local changes\n");
        push_section(&mut out, &report.local);
    }

    out
}

fn push_section(out: &mut String, changes: &ChangeReport) {
    for path in &changes.added {
        out.push_str(&format!("  added:  {path}\n"));
    }
    for path in &changes.modified {
        out.push_str(&format!("  modified:  {path}\n"));
    }
    for path in &changes.removed {
        out.push_str(&format!("  removed:  {path}\n"));
    }
}
