//! List command implementation

use std::path::Path;

use bulk_core::{Engine, ListReport, Transport};

use crate::error::Result;

pub fn run_list(
    root: &Path,
    transport: Box<dyn Transport>,
    filter: Option<&str>,
    projection: Option<&str>,
) -> Result<()> {
    let engine = Engine::open(root, transport)?;
    let report = engine.list(filter, projection)?;
    for warning in &report.warnings {
        eprintln!("{warning}");
    }
    print!("{}", render_list(&report));
    Ok(())
}

fn render_list(report: &ListReport) -> String {
    let mut out = String::new();
    for entry in &report.entries {
        match &entry.value {
            Some(value) => {
                out.push_str(&serde_json::to_string(value).unwrap_or_default());
                out.push('\n');
            }
            None => {
                out.push_str(&entry.path);
                out.push('\n');
            }
        }
    }
    out
}
