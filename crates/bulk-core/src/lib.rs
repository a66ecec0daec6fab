//! bulk-core — synchronization engine for REST collection checkouts
//!
//! Implements a git-like bulk workflow over a collection of JSON resources
//! behind a REST API: an index endpoint enumerates resources, each one is
//! materialized as a working-copy file, and the engine tracks remote
//! version tokens plus content fingerprints to classify changes, pull,
//! push, diff, and reset across the whole collection.

pub mod canonical;
pub mod change;
pub mod diff;
pub mod engine;
pub mod error;
pub mod index;
pub mod layout;
pub mod query;
pub mod record;
pub mod store;
pub mod template;
pub mod transport;

pub use change::ChangeReport;
pub use engine::{Engine, FileDiff, ListEntry, ListReport, PullReport, PushReport, StatusReport};
pub use error::{Error, Result};
pub use index::RemoteDescriptor;
pub use layout::Layout;
pub use query::{Filter, Projection};
pub use record::FileRecord;
pub use store::MetaStore;
pub use template::UrlTemplate;
pub use transport::{AgentTransport, Method, MockResponse, MockTransport, ParsedResponse, Transport};
