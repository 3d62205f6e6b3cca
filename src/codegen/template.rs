//! Module Assembly
//!
//! Renders the aggregate TypeScript module: imports, type declarations, the
//! decode wrappers, the error class and the registry class with one static
//! decoder per definition.
//!
//! Each definition carries its own `DecoderStrategy`. Precompiled entries call
//! an imported validator; pointer-lookup entries share one lazily constructed
//! engine, and that engine section is only rendered when some entry needs it.

use serde::Serialize;
use serde_json::Value;

use super::config::StyleOptions;
use super::format::CodeWriter;
use crate::error::Result;
use crate::schema::{definition_pointer, Definition};

/// Engine schema id; pointer lookups resolve against it
pub const ENGINE_SCHEMA_ID: &str = "schema";

/// How a decoder validates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DecoderStrategy {
    /// Calls the imported standalone validator
    Precompiled { validator_ident: String },
    /// Looks the validator up in the shared engine by schema pointer
    PointerLookup { pointer: String },
}

/// One registry member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoderEntry {
    /// Derived identifier (type name and member name)
    pub name: String,
    /// Definitions-map key
    pub key: String,
    #[serde(flatten)]
    pub strategy: DecoderStrategy,
}

impl DecoderEntry {
    pub fn precompiled(definition: &Definition, validator_ident: String) -> Self {
        Self {
            name: definition.name.clone(),
            key: definition.key.clone(),
            strategy: DecoderStrategy::Precompiled { validator_ident },
        }
    }

    pub fn pointer_lookup(definition: &Definition) -> Self {
        Self {
            name: definition.name.clone(),
            key: definition.key.clone(),
            strategy: DecoderStrategy::PointerLookup {
                pointer: definition.pointer(),
            },
        }
    }

    pub fn pointer(&self) -> String {
        definition_pointer(&self.key)
    }

    pub fn is_pointer_lookup(&self) -> bool {
        matches!(self.strategy, DecoderStrategy::PointerLookup { .. })
    }
}

// =============================================================================
// Assembler
// =============================================================================

pub struct ModuleAssembler<'a> {
    decoder_name: &'a str,
    style: &'a StyleOptions,
    /// Reduced schema embedded for pointer lookups
    schema: &'a Value,
    /// Engine constructor options
    engine_options: Value,
}

impl<'a> ModuleAssembler<'a> {
    pub fn new(decoder_name: &'a str, style: &'a StyleOptions, schema: &'a Value, engine_options: Value) -> Self {
        Self {
            decoder_name,
            style,
            schema,
            engine_options,
        }
    }

    fn error_class(&self) -> String {
        format!("{}Error", self.decoder_name)
    }

    fn issue_type(&self) -> String {
        format!("{}Issue", self.decoder_name)
    }

    pub fn assemble(&self, imports: &[String], declarations: &str, entries: &[DecoderEntry]) -> Result<String> {
        let mut w = CodeWriter::new(self.style.indent_unit());
        let lookup = entries.iter().any(DecoderEntry::is_pointer_lookup);
        let precompiled = entries.iter().any(|e| !e.is_pointer_lookup());

        w.line("/* eslint-disable */");
        if lookup {
            w.line(format!("import Ajv from {};", self.style.quote("ajv")));
        }
        for import in imports {
            w.line(import);
        }
        w.blank();

        if !declarations.is_empty() {
            w.raw(declarations);
            w.blank();
        }

        self.render_support_types(&mut w);
        if lookup {
            self.render_engine(&mut w)?;
        }
        if precompiled {
            self.render_decode_with(&mut w);
        }
        if lookup {
            self.render_decode_at(&mut w);
        }
        self.render_error_class(&mut w);
        self.render_registry(&mut w, entries);
        Ok(w.finish())
    }

    fn render_support_types(&self, w: &mut CodeWriter) {
        w.open(format!("export interface {} {{", self.issue_type()));
        w.line("dataPath?: string;");
        w.line("message?: string;");
        w.line("[k: string]: unknown;");
        w.close("}");
        w.blank();
        w.line(format!(
            "type Validator$ = ((json: unknown) => boolean) & {{ errors?: {}[] | null }};",
            self.issue_type()
        ));
        w.blank();
        w.open(format!(
            "function describe$(errors: {}[] | null | undefined): string {{",
            self.issue_type()
        ));
        w.line(format!(
            "return (errors || []).map((e) => `${{e.dataPath || {q}}} ${{e.message || {q}}}`.trim()).join({sep}) || {unknown};",
            q = self.style.quote(""),
            sep = self.style.quote(", "),
            unknown = self.style.quote("unknown"),
        ));
        w.close("}");
        w.blank();
    }

    fn render_engine(&self, w: &mut CodeWriter) -> Result<()> {
        w.line(format!("const schema$ = {};", serde_json::to_string_pretty(self.schema)?));
        w.blank();
        w.line(format!("const engineOptions$ = {};", serde_json::to_string(&self.engine_options)?));
        w.blank();
        w.line("let engine$: InstanceType<typeof Ajv> | undefined;");
        w.blank();
        w.open("function getEngine$(): InstanceType<typeof Ajv> {");
        w.open("if (!engine$) {");
        w.line("const instance = new Ajv(engineOptions$);");
        w.line(format!("instance.addSchema(schema$, {});", self.style.quote(ENGINE_SCHEMA_ID)));
        w.line("engine$ = instance;");
        w.close("}");
        w.line("return engine$;");
        w.close("}");
        w.blank();
        Ok(())
    }

    fn render_check(&self, w: &mut CodeWriter) {
        w.open("if (!validator(json)) {");
        w.line(format!(
            "throw new {}(`Error validating ${{label}}: ${{describe$(validator.errors)}}`, json, validator.errors || []);",
            self.error_class()
        ));
        w.close("}");
        w.line("return json as T;");
    }

    fn render_decode_with(&self, w: &mut CodeWriter) {
        w.open("function decodeWith<T>(validator: Validator$, label: string): (json: unknown) => T {");
        w.open("return (json: unknown): T => {");
        self.render_check(w);
        w.close("};");
        w.close("}");
        w.blank();
    }

    fn render_decode_at(&self, w: &mut CodeWriter) {
        w.open("function decodeAt<T>(pointer: string, label: string): (json: unknown) => T {");
        w.line("let validator: Validator$ | undefined;");
        w.open("return (json: unknown): T => {");
        w.open("if (!validator) {");
        w.line(format!(
            "validator = getEngine$().getSchema(`{}${{pointer}}`) as Validator$ | undefined;",
            ENGINE_SCHEMA_ID
        ));
        w.close("}");
        w.open("if (!validator) {");
        w.line(format!(
            "throw new {}(`Error validating ${{label}}: unknown`, json, []);",
            self.error_class()
        ));
        w.close("}");
        self.render_check(w);
        w.close("};");
        w.close("}");
        w.blank();
    }

    fn render_error_class(&self, w: &mut CodeWriter) {
        let error = self.error_class();
        let issue = self.issue_type();
        w.open(format!("export class {} extends Error {{", error));
        w.line("readonly json: unknown;");
        w.line(format!("readonly errors: {}[];", issue));
        w.blank();
        w.open(format!(
            "constructor(message: string, json: unknown, errors: {}[] = []) {{",
            issue
        ));
        w.line("super(message);");
        w.line(format!("this.name = {};", self.style.quote(&error)));
        w.line("this.json = json;");
        w.line("this.errors = errors;");
        w.line(format!("Object.setPrototypeOf(this, {}.prototype);", error));
        w.close("}");
        w.close("}");
        w.blank();
    }

    fn render_registry(&self, w: &mut CodeWriter, entries: &[DecoderEntry]) {
        w.open(format!("export class {} {{", self.decoder_name));
        for entry in entries {
            let label = self.style.quote(&entry.name);
            match &entry.strategy {
                DecoderStrategy::Precompiled { validator_ident } => w.line(format!(
                    "static {name} = decodeWith<{name}>({}, {});",
                    validator_ident,
                    label,
                    name = entry.name
                )),
                DecoderStrategy::PointerLookup { pointer } => w.line(format!(
                    "static {name} = decodeAt<{name}>({}, {});",
                    self.style.quote(pointer),
                    label,
                    name = entry.name
                )),
            };
        }
        w.close("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(key: &str, name: &str) -> Definition {
        Definition {
            key: key.to_string(),
            name: name.to_string(),
            schema: json!({}),
        }
    }

    fn assemble(entries: &[DecoderEntry], imports: &[String]) -> String {
        let style = StyleOptions::default();
        let schema = json!({"definitions": {"foo": {"type": "string"}}});
        ModuleAssembler::new("ModelsDecoder", &style, &schema, json!({}))
            .assemble(imports, "export type Foo = string;", entries)
            .unwrap()
    }

    #[test]
    fn test_precompiled_only_has_no_engine() {
        let entries = vec![DecoderEntry::precompiled(&definition("foo", "Foo"), "Foo$validate".to_string())];
        let imports = vec!["import Foo$validate from './Foo.validate.js';".to_string()];
        let out = assemble(&entries, &imports);

        assert!(out.starts_with("/* eslint-disable */\nimport Foo$validate from './Foo.validate.js';\n"));
        assert!(!out.contains("Ajv"));
        assert!(!out.contains("function decodeAt"));
        assert!(out.contains("static Foo = decodeWith<Foo>(Foo$validate, 'Foo');"));
        assert!(out.contains("export class ModelsDecoderError extends Error {"));
        assert!(out.contains("readonly errors: ModelsDecoderIssue[];"));
    }

    #[test]
    fn test_pointer_lookup_renders_engine() {
        let entries = vec![DecoderEntry::pointer_lookup(&definition("foo", "Foo"))];
        let out = assemble(&entries, &[]);

        assert!(out.contains("import Ajv from 'ajv';"));
        assert!(out.contains("const schema$ = {"));
        assert!(out.contains("instance.addSchema(schema$, 'schema');"));
        assert!(!out.contains("function decodeWith"));
        assert!(out.contains("static Foo = decodeAt<Foo>('#/definitions/foo', 'Foo');"));
    }

    #[test]
    fn test_mixed_strategies() {
        let entries = vec![
            DecoderEntry::precompiled(&definition("a", "A"), "A$validate".to_string()),
            DecoderEntry::pointer_lookup(&definition("b", "B")),
        ];
        let out = assemble(&entries, &["import A$validate from './A.validate.js';".to_string()]);
        assert!(out.contains("function decodeWith"));
        assert!(out.contains("function decodeAt"));

        let a = out.find("static A =").unwrap();
        let b = out.find("static B =").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_entry_serializes_with_strategy_tag() {
        let entry = DecoderEntry::pointer_lookup(&definition("foo", "Foo"));
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"name": "Foo", "key": "foo", "strategy": "pointer_lookup", "pointer": "#/definitions/foo"})
        );
    }
}
