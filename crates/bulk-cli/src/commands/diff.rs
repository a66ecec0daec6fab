//! Diff command implementation

use std::path::Path;

use bulk_core::{Engine, Transport};

use crate::error::Result;

pub fn run_diff(root: &Path, transport: Box<dyn Transport>, remote: bool) -> Result<()> {
    let engine = Engine::open(root, transport)?;
    let diffs = if remote {
        engine.diff_remote()?
    } else {
        engine.diff_local()?
    };

    if diffs.is_empty() {
        if remote {
            println!("No remote changes");
        } else {
            println!("No local changes");
        }
        return Ok(());
    }

    for diff in &diffs {
        print!("{}", diff.text);
    }
    Ok(())
}
