//! Reset command implementation

use std::path::Path;

use bulk_core::{Engine, Transport};

use crate::error::Result;

pub fn run_reset(root: &Path, transport: Box<dyn Transport>, path: &str) -> Result<()> {
    let mut engine = Engine::open(root, transport)?;
    engine.reset(path)?;
    println!("reset: {path}");
    Ok(())
}
