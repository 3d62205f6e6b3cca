//! Validator Compilation
//!
//! `ValidatorCompiler` is the seam for the schema-validation engine. Binding a
//! definition yields a `BoundValidator` usable in-process; pack mode additionally
//! asks the compiler for standalone source of each bound validator.
//!
//! The built-in `JsonSchemaCompiler` binds with the `jsonschema` crate and emits
//! standalone source with `StandaloneEmitter`.

use std::fmt;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::config::ValidatorOptions;
use super::standalone::StandaloneEmitter;
use crate::schema::resolve_local_ref;

/// Compiles validators for definitions of a schema
pub trait ValidatorCompiler: Send + Sync {
    /// Bind the validator for the subschema at `pointer`, or `None` if unavailable
    fn bind(&self, schema: &Value, pointer: &str) -> Option<BoundValidator>;

    /// Standalone source for a bound validator
    fn standalone_source(&self, schema: &Value, validator: &BoundValidator) -> Result<String, String>;
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Location of the failing value in the instance
    pub data_path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format!("{} {}", self.data_path, self.message).trim())
    }
}

/// A compiled validator bound to one schema pointer
#[derive(Clone)]
pub struct BoundValidator {
    pointer: String,
    compiled: Arc<JSONSchema>,
}

impl fmt::Debug for BoundValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundValidator")
            .field("pointer", &self.pointer)
            .finish_non_exhaustive()
    }
}

impl BoundValidator {
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }

    /// Validate, collecting every failure
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<ValidationIssue>> {
        self.compiled.validate(instance).map_err(|errors| {
            errors
                .map(|error| ValidationIssue {
                    data_path: error.instance_path.to_string(),
                    message: error.to_string(),
                })
                .collect()
        })
    }
}

// =============================================================================
// jsonschema-backed compiler
// =============================================================================

/// Default validator compiler
#[derive(Debug, Clone)]
pub struct JsonSchemaCompiler {
    options: ValidatorOptions,
    emitter: StandaloneEmitter,
}

impl JsonSchemaCompiler {
    pub fn new(options: ValidatorOptions) -> Self {
        let emitter = StandaloneEmitter::new(options.validate_formats);
        Self { options, emitter }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Compile the subschema at `pointer` with the root's definitions in scope
    pub fn compile_pointer(&self, schema: &Value, pointer: &str) -> Result<JSONSchema, String> {
        if resolve_local_ref(schema, pointer).is_none() {
            return Err(format!("no subschema at {}", pointer));
        }

        let mut wrapper: Map<String, Value> = schema.as_object().cloned().unwrap_or_default();
        wrapper.insert("$ref".to_string(), Value::String(pointer.to_string()));
        let wrapper = Value::Object(wrapper);

        JSONSchema::options()
            .with_draft(self.options.draft.to_jsonschema())
            .should_validate_formats(self.options.validate_formats)
            .compile(&wrapper)
            .map_err(|e| e.to_string())
    }
}

impl Default for JsonSchemaCompiler {
    fn default() -> Self {
        Self::new(ValidatorOptions::default())
    }
}

impl ValidatorCompiler for JsonSchemaCompiler {
    fn bind(&self, schema: &Value, pointer: &str) -> Option<BoundValidator> {
        match self.compile_pointer(schema, pointer) {
            Ok(compiled) => Some(BoundValidator {
                pointer: pointer.to_string(),
                compiled: Arc::new(compiled),
            }),
            Err(reason) => {
                debug!(pointer, %reason, "No validator bound");
                None
            }
        }
    }

    fn standalone_source(&self, schema: &Value, validator: &BoundValidator) -> Result<String, String> {
        self.emitter
            .emit(schema, validator.pointer())
            .map_err(|e| e.to_string())
    }
}
