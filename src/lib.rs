//! Schema Decoders
//!
//! Generates a TypeScript decoder module from a JSON-Schema definitions map:
//! one type declaration and one validating decoder per definition, gathered in a
//! registry class, plus a structured error class for failed decodes.
//!
//! ## Features
//!
//! - **Pack mode** (default): one dependency-free `<Name>.validate.js` per definition
//! - **No-pack mode**: the schema is embedded and validated by a lazily built engine
//! - **Idempotent output**: unchanged files are never rewritten
//! - **Rust runtime**: `DecoderRegistry` decodes with the same strategies in-process
//!
//! ## Output
//!
//! ```text
//! src/models/
//! ├── index.ts              # types, ModelsDecoderError, ModelsDecoder
//! ├── Order.validate.js     # pack mode only
//! └── LineItem.validate.js
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod runtime;
pub mod schema;
pub mod writer;

pub use codegen::config::{CollisionPolicy, GenerateOptions, GenerationMode, StyleOptions, ValidatorOptions};
pub use codegen::template::{DecoderEntry, DecoderStrategy};
pub use codegen::{generate, generate_from_file, GenerationReport, Generator};
pub use config::DecoderConfig;
pub use error::{GenerateError, Result};
pub use runtime::{DecodeError, DecoderRegistry};
pub use schema::{Definition, DefinitionsMap};
pub use writer::{WriteMode, WriteOutcome};
