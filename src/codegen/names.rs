//! Name Derivation
//!
//! Turns a definition's metadata into the single identifier used for its type
//! declaration, validator file, validator import and decoder member.
//!
//! Precedence: `tsType` hint, then `$id`, then the definitions-map key. The chosen
//! string is upper-camel-cased: split into words, each word capitalized, joined.
//!
//! Every artifact must be named through the same `NameDeriver`; a second
//! derivation path would produce references that do not resolve.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::config::{CollisionPolicy, NamingConfig};
use crate::error::{GenerateError, Result};

/// Schema keyword carrying an explicit type name
pub const TYPE_HINT_KEY: &str = "tsType";

/// Schema keyword carrying the schema identifier
pub const SCHEMA_ID_KEY: &str = "$id";

/// Suffix appended to the output folder name for the registry class
const REGISTRY_SUFFIX: &str = "Decoder";

// =============================================================================
// Name Deriver
// =============================================================================

/// Derives safe identifiers from definition metadata
#[derive(Debug, Clone)]
pub struct NameDeriver {
    /// Upper-cased acronyms preserved verbatim
    acronyms: HashSet<String>,

    /// Alphanumeric runs (word candidates)
    runs: Regex,
}

impl NameDeriver {
    pub fn new(naming: &NamingConfig) -> Self {
        Self {
            acronyms: naming.acronyms.iter().map(|a| a.to_uppercase()).collect(),
            runs: Regex::new(r"[\p{L}\p{N}]+").expect("static regex"),
        }
    }

    /// The raw (un-normalized) name for a definition
    pub fn raw_name<'a>(key: &'a str, schema: &'a Value) -> &'a str {
        schema
            .get(TYPE_HINT_KEY)
            .and_then(Value::as_str)
            .or_else(|| schema.get(SCHEMA_ID_KEY).and_then(Value::as_str))
            .unwrap_or(key)
    }

    /// Derive the identifier for a definition
    pub fn derive(&self, key: &str, schema: &Value) -> Result<String> {
        self.to_identifier(Self::raw_name(key, schema))
    }

    /// Upper-camel-case an arbitrary string into a valid identifier
    pub fn to_identifier(&self, raw: &str) -> Result<String> {
        let cleaned: String = raw.chars().filter(|c| *c != '\'' && *c != '\u{2019}').collect();

        let mut result = String::with_capacity(cleaned.len());
        for run in self.runs.find_iter(&cleaned) {
            for word in split_words(run.as_str()) {
                result.push_str(&self.case_word(&word));
            }
        }

        if result.is_empty() {
            return Err(GenerateError::InvalidName(raw.to_string()));
        }
        if result.starts_with(|c: char| c.is_numeric()) {
            result.insert(0, '_');
        }
        Ok(result)
    }

    /// Registry class name: explicit override, else the output folder name + `Decoder`
    pub fn decoder_class_name(&self, output_folder: &Path, explicit: Option<&str>) -> String {
        if let Some(name) = explicit {
            return name.to_string();
        }

        let folder_name = output_folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .or_else(|| {
                output_folder
                    .canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            })
            .unwrap_or_default();

        match self.to_identifier(&folder_name) {
            Ok(prefix) => format!("{}{}", prefix, REGISTRY_SUFFIX),
            Err(_) => REGISTRY_SUFFIX.to_string(),
        }
    }

    /// Capitalize a word, keeping configured acronyms upper-case
    fn case_word(&self, word: &str) -> String {
        let upper = word.to_uppercase();
        if self.acronyms.contains(&upper) {
            return upper;
        }

        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        }
    }
}

/// Whether `name` can be used unquoted as a JS/TS property name
pub fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

/// Split an alphanumeric run at case and digit boundaries.
///
/// `fooBar` -> foo, Bar; `XMLHttp` -> XML, Http; `v2beta` -> v, 2, beta
fn split_words(run: &str) -> Vec<String> {
    let chars: Vec<char> = run.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && !current.is_empty() {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();

            let lower_to_upper = prev.is_lowercase() && c.is_uppercase();
            let acronym_end = prev.is_uppercase()
                && c.is_uppercase()
                && next.map(|n| n.is_lowercase()).unwrap_or(false);
            let digit_edge = prev.is_numeric() != c.is_numeric();

            if lower_to_upper || acronym_end || digit_edge {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

// =============================================================================
// Name Table
// =============================================================================

/// Tracks assigned identifiers and applies the collision policy
#[derive(Debug)]
pub struct NameTable {
    policy: CollisionPolicy,

    /// identifier -> definition key that owns it
    owners: HashMap<String, String>,
}

impl NameTable {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            owners: HashMap::new(),
        }
    }

    /// Claim `name` for definition `key`, returning the identifier actually assigned
    pub fn claim(&mut self, key: &str, name: String) -> Result<String> {
        let Some(first) = self.owners.get(&name) else {
            self.owners.insert(name.clone(), key.to_string());
            return Ok(name);
        };

        match self.policy {
            CollisionPolicy::Error => Err(GenerateError::NameCollision {
                name,
                first: first.clone(),
                second: key.to_string(),
            }),
            CollisionPolicy::Disambiguate => {
                let mut suffix = 2;
                let mut candidate = format!("{}{}", name, suffix);
                while self.owners.contains_key(&candidate) {
                    suffix += 1;
                    candidate = format!("{}{}", name, suffix);
                }
                warn!(
                    definition = key,
                    original = %name,
                    assigned = %candidate,
                    "Derived name already taken, disambiguating"
                );
                self.owners.insert(candidate.clone(), key.to_string());
                Ok(candidate)
            }
        }
    }
}
