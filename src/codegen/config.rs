//! Generation Options
//!
//! Everything a caller can tune for one generation run:
//! - StyleOptions: layout of the emitted TypeScript (handed to the formatter)
//! - ValidatorOptions: engine settings handed to the validator compiler
//! - NamingConfig / CollisionPolicy: how definition names become identifiers
//!
//! All options deserialize from partial TOML/JSON so they can come from config files.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Top-level options
// =============================================================================

/// Options for a single generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Formatting style for the generated module
    pub style: StyleOptions,

    /// Validator engine settings
    pub validator: ValidatorOptions,

    /// Override for the decoder registry class name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoder_name: Option<String>,

    /// Emit one precompiled validator file per definition
    pub pack: bool,

    /// Identifier naming
    pub naming: NamingConfig,

    /// What to do when two definitions derive the same identifier
    pub collision: CollisionPolicy,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            style: StyleOptions::default(),
            validator: ValidatorOptions::default(),
            decoder_name: None,
            pack: true,
            naming: NamingConfig::default(),
            collision: CollisionPolicy::default(),
        }
    }
}

impl GenerateOptions {
    /// The generation mode, fixed for the whole run
    pub fn mode(&self) -> GenerationMode {
        if self.pack {
            GenerationMode::Pack
        } else {
            GenerationMode::NoPack
        }
    }
}

/// Pack emits precompiled validator files; NoPack embeds the schema and an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Pack,
    NoPack,
}

/// Name collision handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Abort generation
    #[default]
    Error,
    /// Append a numeric suffix to the later definition
    Disambiguate,
}

/// Naming configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Words kept upper-case when building identifiers (e.g. ID, URL)
    pub acronyms: HashSet<String>,
}

// =============================================================================
// Style
// =============================================================================

/// Line ending style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfLine {
    #[default]
    Lf,
    Crlf,
}

/// Layout options for generated TypeScript
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    pub tab_width: usize,
    pub use_tabs: bool,
    pub single_quote: bool,
    pub end_of_line: EndOfLine,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            tab_width: 2,
            use_tabs: false,
            single_quote: true,
            end_of_line: EndOfLine::Lf,
        }
    }
}

impl StyleOptions {
    /// One level of indentation
    pub fn indent_unit(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.tab_width)
        }
    }

    pub fn newline(&self) -> &'static str {
        match self.end_of_line {
            EndOfLine::Lf => "\n",
            EndOfLine::Crlf => "\r\n",
        }
    }

    /// Render a string as a JS/TS string literal using the configured quote
    pub fn quote(&self, value: &str) -> String {
        let quote = if self.single_quote { '\'' } else { '"' };
        let mut out = String::with_capacity(value.len() + 2);
        out.push(quote);
        for c in value.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{2028}' => out.push_str("\\u2028"),
                '\u{2029}' => out.push_str("\\u2029"),
                c if c == quote => {
                    out.push('\\');
                    out.push(c);
                }
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push(quote);
        out
    }
}

// =============================================================================
// Validator engine
// =============================================================================

/// JSON Schema draft used when binding validators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaDraft {
    Draft4,
    Draft6,
    #[default]
    Draft7,
}

impl SchemaDraft {
    pub fn to_jsonschema(self) -> jsonschema::Draft {
        match self {
            SchemaDraft::Draft4 => jsonschema::Draft::Draft4,
            SchemaDraft::Draft6 => jsonschema::Draft::Draft6,
            SchemaDraft::Draft7 => jsonschema::Draft::Draft7,
        }
    }
}

/// Validator compiler options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    pub draft: SchemaDraft,

    /// Validate the `format` keyword
    pub validate_formats: bool,

    /// Raw options passed to the generated module's engine constructor
    pub engine: Map<String, Value>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            draft: SchemaDraft::default(),
            validate_formats: true,
            engine: Map::new(),
        }
    }
}

impl ValidatorOptions {
    /// Engine constructor options as rendered into the generated module
    pub fn engine_options(&self) -> Value {
        let mut engine = self.engine.clone();
        if !self.validate_formats && !engine.contains_key("format") {
            engine.insert("format".to_string(), Value::Bool(false));
        }
        Value::Object(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = GenerateOptions::default();
        assert!(options.pack);
        assert_eq!(options.mode(), GenerationMode::Pack);
        assert_eq!(options.collision, CollisionPolicy::Error);
        assert_eq!(options.style.indent_unit(), "  ");
    }

    #[test]
    fn test_partial_deserialize() {
        let options: GenerateOptions =
            serde_json::from_str(r#"{"pack": false, "style": {"use_tabs": true}}"#).unwrap();
        assert_eq!(options.mode(), GenerationMode::NoPack);
        assert_eq!(options.style.indent_unit(), "\t");
        assert_eq!(options.style.tab_width, 2);
    }

    #[test]
    fn test_quote() {
        let style = StyleOptions::default();
        assert_eq!(style.quote("Foo"), "'Foo'");
        assert_eq!(style.quote("it's"), "'it\\'s'");
        assert_eq!(style.quote("a\\b\n"), "'a\\\\b\\n'");

        let double = StyleOptions { single_quote: false, ..StyleOptions::default() };
        assert_eq!(double.quote("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_engine_options() {
        let mut validator = ValidatorOptions::default();
        assert_eq!(validator.engine_options(), serde_json::json!({}));

        validator.validate_formats = false;
        validator.engine.insert("allErrors".to_string(), Value::Bool(true));
        assert_eq!(
            validator.engine_options(),
            serde_json::json!({"allErrors": true, "format": false})
        );
    }
}
