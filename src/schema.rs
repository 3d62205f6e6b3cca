//! Schema input types
//!
//! A `DefinitionsMap` is the only part of an input schema the generator uses.
//! Enumeration is in insertion order so generated output is stable across runs.

use serde_json::{Map, Value};

use crate::codegen::config::{CollisionPolicy, NamingConfig};
use crate::codegen::names::{NameDeriver, NameTable};
use crate::error::{GenerateError, Result};

/// Top-level schema member holding the definitions
pub const DEFINITIONS_KEY: &str = "definitions";

/// One named schema subtree with its derived identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// Key under which the schema is registered in the definitions map
    pub key: String,
    /// Identifier used for every generated artifact
    pub name: String,
    /// The schema subtree
    pub schema: Value,
}

impl Definition {
    /// Schema-relative pointer addressing this definition, built from its key
    pub fn pointer(&self) -> String {
        definition_pointer(&self.key)
    }
}

/// Ordered, non-empty map of definition key to schema subtree
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionsMap {
    entries: Map<String, Value>,
}

impl DefinitionsMap {
    /// Extract the definitions from a full schema, discarding everything else
    pub fn from_schema(schema: &Value) -> Result<Self> {
        match schema.get(DEFINITIONS_KEY) {
            Some(Value::Object(entries)) if !entries.is_empty() => Ok(Self {
                entries: entries.clone(),
            }),
            _ => Err(GenerateError::NoDefinitions),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// The reduced schema `{ "definitions": ... }` handed to the compilers
    pub fn to_schema(&self) -> Value {
        let mut root = Map::new();
        root.insert(DEFINITIONS_KEY.to_string(), Value::Object(self.entries.clone()));
        Value::Object(root)
    }

    /// All definitions in insertion order, named with `deriver`
    pub fn enumerate(
        &self,
        deriver: &NameDeriver,
        policy: CollisionPolicy,
    ) -> Result<Vec<Definition>> {
        let mut names = NameTable::new(policy);
        self.entries
            .iter()
            .map(|(key, schema)| {
                let derived = deriver.derive(key, schema)?;
                let name = names.claim(key, derived)?;
                Ok(Definition {
                    key: key.clone(),
                    name,
                    schema: schema.clone(),
                })
            })
            .collect()
    }

    /// Enumerate with the default naming rules
    pub fn definitions(&self) -> Result<Vec<Definition>> {
        self.enumerate(
            &NameDeriver::new(&NamingConfig::default()),
            CollisionPolicy::default(),
        )
    }
}

/// `#/definitions/<key>` with the key escaped as a JSON pointer token and URI fragment
pub fn definition_pointer(key: &str) -> String {
    format!("#/{}/{}", DEFINITIONS_KEY, escape_fragment(&escape_pointer_token(key)))
}

/// Resolve a local reference (`#` or `#/...`) against the root schema
pub fn resolve_local_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let fragment = reference.strip_prefix('#')?;
    let pointer = unescape_fragment(fragment)?;
    if pointer.is_empty() {
        Some(root)
    } else {
        root.pointer(&pointer)
    }
}

fn unescape_fragment(fragment: &str) -> Option<String> {
    let bytes = fragment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = fragment.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// RFC 6901 token escaping
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Percent-encode everything outside the URI fragment character set
fn escape_fragment(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for byte in token.bytes() {
        let safe = byte.is_ascii_alphanumeric()
            || matches!(
                byte,
                b'-' | b'.' | b'_' | b'~' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')'
                    | b'*' | b'+' | b',' | b';' | b'=' | b':' | b'@'
            );
        if safe {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
