//! Init command implementation

use std::path::Path;

use colored::Colorize;

use bulk_core::{Engine, Transport};

use crate::error::Result;

pub fn run_init(
    root: &Path,
    transport: Box<dyn Transport>,
    target: &str,
    url_template: &str,
) -> Result<()> {
    let (_engine, report) = Engine::init(root, transport, target, url_template)?;

    println!("Checked out {} file(s)", report.fetched.len());
    for path in &report.failed {
        println!(
            "{} failed to fetch {path}; rerun `bulk pull` to retry",
            "warn:".yellow().bold()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulk_core::{Method, MockResponse, MockTransport};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn init_twice_fails() {
        let dir = TempDir::new().unwrap();

        let mock = MockTransport::new();
        mock.expect(
            Method::Get,
            "https://example.com/all-items",
            MockResponse::json(200, json!([])),
        );
        run_init(
            dir.path(),
            Box::new(mock),
            "example.com/all-items",
            "/users/{user}/items/{id}",
        )
        .unwrap();

        let again = run_init(
            dir.path(),
            Box::new(MockTransport::new()),
            "example.com/all-items",
            "/users/{user}/items/{id}",
        );
        assert!(again.is_err());
    }
}
