//! Cube Schema Store
//!
//! Reads and edits the cubes of a Mondrian OLAP schema document: a single
//! XML file whose `<Schema>` root holds an ordered list of `<Cube>` records.
//!
//! ## Features
//!
//! - **Request-scoped**: every operation loads the file, works on an owned
//!   tree and writes it back; nothing is cached between calls
//! - **Validated input**: cube payloads become typed definitions, and every
//!   rejection names the offending field path
//! - **Helpful lookups**: a missing cube reports all existing names plus the
//!   closest match
//! - **Canonical output**: one writer decides indentation and attribute
//!   order, so re-saving an unmodified document changes nothing
//! - **Safe writes**: atomic replace through a temporary file, with a
//!   checksum guard against overwriting concurrent edits
//!
//! ## Layout
//!
//! ```text
//! <Schema name="Monza">
//! ├── <Cube name="...">
//! │   ├── <Table name="..."/>
//! │   ├── <Dimension name="...">
//! │   │   └── <Hierarchy hasAll="true">
//! │   │       └── <Level name="..." column="..." type="String"/>
//! │   └── <Measure name="..." column="..." aggregator="sum"/>
//! └── <Cube name="...">
//! ```

pub mod checksum;
pub mod config;
pub mod cube;
pub mod document;
pub mod error;
pub mod store;
pub mod validate;
pub mod xml;

pub use checksum::Checksum;
pub use config::StoreConfig;
pub use cube::{Aggregator, Cube, CubeSummary, Dimension, Hierarchy, Level, LevelType, Measure};
pub use document::SchemaDocument;
pub use error::{Result, SchemaError};
pub use store::{load, persist, SchemaDocumentStore};
pub use validate::validate;
