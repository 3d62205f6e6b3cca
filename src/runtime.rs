//! Decoder runtime
//!
//! `DecoderRegistry` mirrors the generated module for Rust callers: one decoder
//! per definition, each validating with the strategy chosen at generation time.
//! Precompiled entries are compiled when the registry is built; pointer-lookup
//! entries share one `LazyEngine` that is constructed on first use and caches
//! every validator it resolves.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::codegen::config::{GenerateOptions, ValidatorOptions};
use crate::codegen::template::{DecoderEntry, DecoderStrategy};
use crate::codegen::validator::{BoundValidator, JsonSchemaCompiler, ValidationIssue, ValidatorCompiler};
use crate::codegen::Generator;
use crate::error::Result;

/// Default registry name when none is configured
const DEFAULT_REGISTRY_NAME: &str = "Decoder";

/// A value failed to decode
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct DecodeError {
    pub message: String,
    /// The offending payload, unchanged
    pub json: Value,
    pub errors: Vec<ValidationIssue>,
}

impl DecodeError {
    fn validation(label: &str, json: Value, errors: Vec<ValidationIssue>) -> Self {
        let details = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let details = if details.is_empty() { "unknown".to_string() } else { details };
        Self {
            message: format!("Error validating {}: {}", label, details),
            json,
            errors,
        }
    }
}

// =============================================================================
// Lazy engine
// =============================================================================

/// Shared validation engine for pointer lookups
pub struct LazyEngine {
    schema: Value,
    options: ValidatorOptions,
    engine: OnceLock<JsonSchemaCompiler>,
    cache: Mutex<HashMap<String, Option<BoundValidator>>>,
}

impl LazyEngine {
    pub fn new(schema: Value, options: ValidatorOptions) -> Self {
        Self {
            schema,
            options,
            engine: OnceLock::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the engine has been constructed yet
    pub fn is_initialized(&self) -> bool {
        self.engine.get().is_some()
    }

    fn engine(&self) -> &JsonSchemaCompiler {
        self.engine.get_or_init(|| {
            debug!("Constructing validation engine");
            JsonSchemaCompiler::new(self.options.clone())
        })
    }

    /// Validator at `pointer`, resolved once and cached
    pub fn validator(&self, pointer: &str) -> Option<BoundValidator> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(pointer) {
            return cached.clone();
        }
        let bound = self.engine().bind(&self.schema, pointer);
        if bound.is_none() {
            warn!(pointer, "Pointer lookup found no validator");
        }
        cache.insert(pointer.to_string(), bound.clone());
        bound
    }
}

// =============================================================================
// Registry
// =============================================================================

enum RuntimeStrategy {
    Precompiled(BoundValidator),
    PointerLookup(String),
}

struct RuntimeEntry {
    name: String,
    strategy: RuntimeStrategy,
}

/// Named decoders over one definitions map
pub struct DecoderRegistry {
    name: String,
    entries: Vec<RuntimeEntry>,
    index: HashMap<String, usize>,
    engine: LazyEngine,
}

impl DecoderRegistry {
    /// Build from a reduced schema and the entries chosen at generation time
    pub fn new(name: impl Into<String>, schema: Value, entries: &[DecoderEntry], options: &ValidatorOptions) -> Self {
        let compiler = JsonSchemaCompiler::new(options.clone());
        let mut runtime_entries = Vec::with_capacity(entries.len());
        let mut index = HashMap::new();

        for entry in entries {
            let strategy = match &entry.strategy {
                DecoderStrategy::Precompiled { .. } => match compiler.bind(&schema, &entry.pointer()) {
                    Some(validator) => RuntimeStrategy::Precompiled(validator),
                    None => RuntimeStrategy::PointerLookup(entry.pointer()),
                },
                DecoderStrategy::PointerLookup { pointer } => RuntimeStrategy::PointerLookup(pointer.clone()),
            };
            index.insert(entry.name.clone(), runtime_entries.len());
            runtime_entries.push(RuntimeEntry {
                name: entry.name.clone(),
                strategy,
            });
        }

        Self {
            name: name.into(),
            entries: runtime_entries,
            index,
            engine: LazyEngine::new(schema, options.clone()),
        }
    }

    /// Plan a schema with `options` and build the registry from the plan
    pub fn from_schema(schema: &Value, options: &GenerateOptions) -> Result<Self> {
        let plan = Generator::new(options.clone()).plan(schema)?;
        let name = options
            .decoder_name
            .clone()
            .unwrap_or_else(|| DEFAULT_REGISTRY_NAME.to_string());
        Ok(Self::new(name, plan.schema, &plan.artifacts.decoders, &options.validator))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoder names in definition order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Whether decoder `name` resolves through the shared engine
    pub fn uses_pointer_lookup(&self, name: &str) -> Option<bool> {
        let entry = &self.entries[*self.index.get(name)?];
        Some(matches!(entry.strategy, RuntimeStrategy::PointerLookup(_)))
    }

    pub fn engine(&self) -> &LazyEngine {
        &self.engine
    }

    /// Validate `json` with decoder `name`, returning it unchanged on success
    pub fn decode(&self, name: &str, json: Value) -> std::result::Result<Value, DecodeError> {
        let Some(&idx) = self.index.get(name) else {
            return Err(DecodeError {
                message: format!("Unknown decoder {}.{}", self.name, name),
                json,
                errors: Vec::new(),
            });
        };
        let entry = &self.entries[idx];

        let validator = match &entry.strategy {
            RuntimeStrategy::Precompiled(validator) => validator.clone(),
            RuntimeStrategy::PointerLookup(pointer) => match self.engine.validator(pointer) {
                Some(validator) => validator,
                None => return Err(DecodeError::validation(&entry.name, json, Vec::new())),
            },
        };

        match validator.validate(&json) {
            Ok(()) => Ok(json),
            Err(errors) => Err(DecodeError::validation(&entry.name, json, errors)),
        }
    }

    /// Decode and deserialize into `T`
    pub fn decode_as<T: DeserializeOwned>(&self, name: &str, json: Value) -> std::result::Result<T, DecodeError> {
        let value = self.decode(name, json)?;
        serde_json::from_value(value.clone()).map_err(|e| DecodeError {
            message: format!("Error decoding {}: {}", name, e),
            json: value,
            errors: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn schema() -> Value {
        json!({"definitions": {"Foo": {
            "type": "object",
            "properties": {"x": {"type": "number"}},
            "required": ["x"]
        }}})
    }

    #[test]
    fn test_decode_valid_returns_input() {
        let registry = DecoderRegistry::from_schema(&schema(), &GenerateOptions::default()).unwrap();
        let value = json!({"x": 1});
        assert_eq!(registry.decode("Foo", value.clone()).unwrap(), value);
    }

    #[test]
    fn test_decode_invalid_carries_payload() {
        let registry = DecoderRegistry::from_schema(&schema(), &GenerateOptions::default()).unwrap();
        let err = registry.decode("Foo", json!({"x": "a"})).unwrap_err();
        assert_eq!(err.json, json!({"x": "a"}));
        assert!(err.message.starts_with("Error validating Foo: "));
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].data_path, "/x");
    }

    #[test]
    fn test_engine_is_lazy() {
        let options = GenerateOptions {
            pack: false,
            ..GenerateOptions::default()
        };
        let registry = DecoderRegistry::from_schema(&schema(), &options).unwrap();
        assert_eq!(registry.uses_pointer_lookup("Foo"), Some(true));
        assert!(!registry.engine().is_initialized());

        registry.decode("Foo", json!({"x": 2})).unwrap();
        assert!(registry.engine().is_initialized());
        registry.decode("Foo", json!({"x": 3})).unwrap();
    }

    #[test]
    fn test_unknown_decoder() {
        let registry = DecoderRegistry::from_schema(&schema(), &GenerateOptions::default()).unwrap();
        let err = registry.decode("Bar", json!(null)).unwrap_err();
        assert_eq!(err.message, "Unknown decoder Decoder.Bar");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Foo {
        x: f64,
    }

    #[test]
    fn test_decode_as() {
        let registry = DecoderRegistry::from_schema(&schema(), &GenerateOptions::default()).unwrap();
        let foo: Foo = registry.decode_as("Foo", json!({"x": 1.5})).unwrap();
        assert_eq!(foo, Foo { x: 1.5 });
    }

    #[test]
    fn test_error_message_without_details() {
        let err = DecodeError::validation("Foo", json!(1), Vec::new());
        assert_eq!(err.to_string(), "Error validating Foo: unknown");
    }
}
