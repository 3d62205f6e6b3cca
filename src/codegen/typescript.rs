//! TypeScript Declarations
//!
//! `TypeCompiler` is the seam for the schema-to-declarations compiler. It is
//! handed the whole definitions map under a synthetic root and returns one
//! `TypeDeclaration` per emitted type, so callers can drop declarations by name.
//!
//! `TypeScriptCompiler` is the built-in implementation. Definitions are named with
//! the same `NameDeriver` the decoder registry uses, so `$ref`s resolve to the
//! identifiers the decoders return.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::config::{CollisionPolicy, NamingConfig, StyleOptions};
use super::names::{is_js_identifier, NameDeriver, TYPE_HINT_KEY};
use crate::error::{GenerateError, Result};
use crate::schema::{definition_pointer, resolve_local_ref, DefinitionsMap, DEFINITIONS_KEY};

/// Synthetic root type wrapping the definitions map
pub const CONTAINER_NAME: &str = "GeneratedContainerSchema";

/// Nesting limit when inlining non-definition `$ref`s
const MAX_INLINE_DEPTH: usize = 32;

/// Options handed to the type compiler
#[derive(Debug, Clone)]
pub struct TypeOptions {
    /// Emit definitions not reachable from the root
    pub unreachable_definitions: bool,
    /// Emit `const enum`s for string enums carrying `tsEnumNames`
    pub enable_const_enums: bool,
    pub style: StyleOptions,
}

/// One top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub name: String,
    pub source: String,
}

/// Compiles a schema into TypeScript declarations
pub trait TypeCompiler: Send + Sync {
    fn compile(
        &self,
        schema: &Value,
        root_name: &str,
        options: &TypeOptions,
    ) -> std::result::Result<Vec<TypeDeclaration>, String>;
}

// =============================================================================
// Type model builder
// =============================================================================

/// Builds the declaration block of the generated module
pub struct TypeModelBuilder<'a> {
    compiler: &'a dyn TypeCompiler,
}

impl<'a> TypeModelBuilder<'a> {
    pub fn new(compiler: &'a dyn TypeCompiler) -> Self {
        Self { compiler }
    }

    /// Compile every definition once and drop the synthetic container
    pub fn build(&self, definitions: &DefinitionsMap, style: &StyleOptions) -> Result<String> {
        let options = TypeOptions {
            unreachable_definitions: true,
            enable_const_enums: false,
            style: style.clone(),
        };
        let declarations = self
            .compiler
            .compile(&definitions.to_schema(), CONTAINER_NAME, &options)
            .map_err(GenerateError::TypeCompiler)?;

        Ok(declarations
            .into_iter()
            .filter(|d| d.name != CONTAINER_NAME)
            .map(|d| d.source)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

// =============================================================================
// Built-in compiler
// =============================================================================

/// Default type compiler
#[derive(Debug, Clone)]
pub struct TypeScriptCompiler {
    deriver: NameDeriver,
    collision: CollisionPolicy,
}

impl Default for TypeScriptCompiler {
    fn default() -> Self {
        Self::new(&NamingConfig::default(), CollisionPolicy::default())
    }
}

impl TypeScriptCompiler {
    pub fn new(naming: &NamingConfig, collision: CollisionPolicy) -> Self {
        Self {
            deriver: NameDeriver::new(naming),
            collision,
        }
    }
}

impl TypeCompiler for TypeScriptCompiler {
    fn compile(
        &self,
        schema: &Value,
        root_name: &str,
        options: &TypeOptions,
    ) -> std::result::Result<Vec<TypeDeclaration>, String> {
        let definitions = match DefinitionsMap::from_schema(schema) {
            Ok(map) => map.enumerate(&self.deriver, self.collision).map_err(|e| e.to_string())?,
            Err(_) => Vec::new(),
        };

        let mut refs = HashMap::new();
        for def in &definitions {
            refs.insert(definition_pointer(&def.key), def.name.clone());
            refs.insert(format!("#/{}/{}", DEFINITIONS_KEY, def.key), def.name.clone());
        }

        let ctx = Context {
            root: schema,
            root_name,
            refs,
            options,
            unit: options.style.indent_unit(),
        };

        let mut declarations = vec![ctx.root_declaration()?];
        let reachable = if options.unreachable_definitions {
            None
        } else {
            Some(ctx.reachable_from_root())
        };
        for def in &definitions {
            if let Some(reachable) = &reachable {
                if !reachable.contains(&def.key) {
                    continue;
                }
            }
            declarations.push(ctx.declaration(&def.name, &def.schema)?);
        }
        Ok(declarations)
    }
}

struct Context<'a> {
    root: &'a Value,
    root_name: &'a str,
    /// `$ref` string -> declared name
    refs: HashMap<String, String>,
    options: &'a TypeOptions,
    unit: String,
}

type CompileResult<T> = std::result::Result<T, String>;

impl<'a> Context<'a> {
    fn root_declaration(&self) -> CompileResult<TypeDeclaration> {
        let mut root = match self.root {
            Value::Object(obj) => obj.clone(),
            _ => Map::new(),
        };
        root.remove(DEFINITIONS_KEY);
        self.declaration(self.root_name, &Value::Object(root))
    }

    /// Definition keys referenced from the root, followed transitively
    fn reachable_from_root(&self) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        if let Value::Object(root) = self.root {
            for (key, value) in root {
                if key != DEFINITIONS_KEY {
                    collect_refs(value, &mut pending);
                }
            }
        }
        let definitions = self.root.get(DEFINITIONS_KEY).and_then(Value::as_object);
        while let Some(reference) = pending.pop() {
            let Some(definitions) = definitions else { break };
            for (key, schema) in definitions {
                let matches = reference == definition_pointer(key)
                    || reference == format!("#/{}/{}", DEFINITIONS_KEY, key);
                if matches && seen.insert(key.clone()) {
                    collect_refs(schema, &mut pending);
                }
            }
        }
        seen
    }

    fn declaration(&self, name: &str, schema: &Value) -> CompileResult<TypeDeclaration> {
        let mut source = jsdoc(schema).unwrap_or_default();

        if let Some(body) = self.const_enum(name, schema) {
            source.push_str(&body);
        } else if is_interface(schema) {
            let body = self.object_literal(schema, 0)?;
            source.push_str(&format!("export interface {} {}", name, body));
        } else {
            // A top-level type hint names the definition; it is not the body
            let expr = self.expression_without_hint(schema, 0)?;
            source.push_str(&format!("export type {} = {};", name, expr));
        }

        Ok(TypeDeclaration {
            name: name.to_string(),
            source,
        })
    }

    fn const_enum(&self, name: &str, schema: &Value) -> Option<String> {
        if !self.options.enable_const_enums {
            return None;
        }
        let values = schema.get("enum")?.as_array()?;
        let names = schema.get("tsEnumNames")?.as_array()?;
        if values.len() != names.len() {
            return None;
        }

        let mut out = format!("export const enum {} {{\n", name);
        for (value, member) in values.iter().zip(names) {
            let value = value.as_str()?;
            let member = member.as_str()?;
            if !is_js_identifier(member) {
                return None;
            }
            out.push_str(&format!("{}{} = {},\n", self.unit, member, self.options.style.quote(value)));
        }
        out.push('}');
        Some(out)
    }

    fn expression(&self, schema: &Value, depth: usize) -> CompileResult<String> {
        if let Some(hint) = schema.get(TYPE_HINT_KEY).and_then(Value::as_str) {
            return Ok(hint.to_string());
        }
        self.expression_without_hint(schema, depth)
    }

    fn expression_without_hint(&self, schema: &Value, depth: usize) -> CompileResult<String> {
        let obj = match schema {
            Value::Bool(true) => return Ok("unknown".to_string()),
            Value::Bool(false) => return Ok("never".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(format!("Invalid schema: {}", schema)),
        };

        if let Some(reference) = obj.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| "$ref must be a string".to_string())?;
            return self.reference(reference, depth);
        }

        let mut parts = Vec::new();
        if let Some(base) = self.base_expression(obj, depth)? {
            parts.push(base);
        }
        if let Some(all) = obj.get("allOf").and_then(Value::as_array) {
            for sub in all {
                parts.push(parenthesize(self.expression(sub, depth)?));
            }
        }
        for keyword in ["anyOf", "oneOf"] {
            if let Some(options) = obj.get(keyword).and_then(Value::as_array) {
                let members = options
                    .iter()
                    .map(|sub| self.expression(sub, depth).map(parenthesize))
                    .collect::<CompileResult<Vec<_>>>()?;
                parts.push(parenthesize(union(members)));
            }
        }

        Ok(match parts.len() {
            0 => "unknown".to_string(),
            1 => strip_outer_parens(parts.remove(0)),
            _ => parts.into_iter().map(parenthesize).collect::<Vec<_>>().join(" & "),
        })
    }

    fn reference(&self, reference: &str, depth: usize) -> CompileResult<String> {
        // The container is never declared
        if reference == "#" {
            return Ok("unknown".to_string());
        }
        if let Some(name) = self.refs.get(reference) {
            return Ok(name.clone());
        }
        if depth >= MAX_INLINE_DEPTH {
            return Err(format!("$ref nesting too deep at {}", reference));
        }
        let target = resolve_local_ref(self.root, reference)
            .ok_or_else(|| format!("Unresolved $ref: {}", reference))?;
        self.expression(target, depth + 1)
    }

    /// Expression for the non-combinator part of a schema
    fn base_expression(&self, obj: &Map<String, Value>, depth: usize) -> CompileResult<Option<String>> {
        if let Some(value) = obj.get("const") {
            return Ok(Some(self.literal(value)));
        }
        if let Some(values) = obj.get("enum").and_then(Value::as_array) {
            return Ok(Some(union(values.iter().map(|v| self.literal(v)).collect())));
        }

        let types: Vec<&str> = match obj.get("type") {
            Some(Value::String(t)) => vec![t.as_str()],
            Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
            _ => {
                if obj.contains_key("properties")
                    || obj.contains_key("additionalProperties")
                    || obj.contains_key("patternProperties")
                    || obj.contains_key("required")
                {
                    vec!["object"]
                } else if obj.contains_key("items") {
                    vec!["array"]
                } else {
                    Vec::new()
                }
            }
        };
        if types.is_empty() {
            return Ok(None);
        }

        let mut members = Vec::new();
        for t in types {
            members.push(match t {
                "string" => "string".to_string(),
                "number" | "integer" => "number".to_string(),
                "boolean" => "boolean".to_string(),
                "null" => "null".to_string(),
                "array" => self.array(obj, depth)?,
                "object" => self.object_literal(&Value::Object(obj.clone()), depth)?,
                other => return Err(format!("Unknown type '{}'", other)),
            });
        }
        Ok(Some(union(members)))
    }

    fn array(&self, obj: &Map<String, Value>, depth: usize) -> CompileResult<String> {
        match obj.get("items") {
            None => Ok("unknown[]".to_string()),
            Some(Value::Array(tuple)) => {
                let mut members = tuple
                    .iter()
                    .map(|sub| self.expression(sub, depth))
                    .collect::<CompileResult<Vec<_>>>()?;
                match obj.get("additionalItems") {
                    Some(Value::Bool(false)) => {}
                    None | Some(Value::Bool(true)) => members.push("...unknown[]".to_string()),
                    Some(rest) => {
                        members.push(format!("...{}[]", parenthesize(self.expression(rest, depth)?)))
                    }
                }
                Ok(format!("[{}]", members.join(", ")))
            }
            Some(items) => Ok(format!("{}[]", parenthesize(self.expression(items, depth)?))),
        }
    }

    /// `{ ... }` with one member per line
    fn object_literal(&self, schema: &Value, depth: usize) -> CompileResult<String> {
        let required: HashSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut members = Vec::new();
        let properties = schema.get("properties").and_then(Value::as_object);
        if let Some(properties) = properties {
            for (name, sub) in properties {
                let mut member = jsdoc(sub).unwrap_or_default();
                let key = if is_js_identifier(name) {
                    name.clone()
                } else {
                    self.options.style.quote(name)
                };
                let optional = if required.contains(name.as_str()) { "" } else { "?" };
                member.push_str(&format!("{}{}: {};", key, optional, self.expression(sub, depth)?));
                members.push(member);
            }
        }

        if let Some(index) = self.index_signature(schema, properties.map_or(false, |p| !p.is_empty()), depth)? {
            members.push(format!("[k: string]: {};", index));
        }

        if members.is_empty() {
            return Ok("{}".to_string());
        }
        let mut out = String::from("{\n");
        for member in members {
            out.push_str(&indent(&member, &self.unit));
            out.push('\n');
        }
        out.push('}');
        Ok(out)
    }

    fn index_signature(&self, schema: &Value, has_properties: bool, depth: usize) -> CompileResult<Option<String>> {
        let mut members = Vec::new();
        match schema.get("additionalProperties") {
            None | Some(Value::Bool(true)) => return Ok(Some("unknown".to_string())),
            Some(Value::Bool(false)) => {}
            Some(sub) => members.push(self.expression(sub, depth)?),
        }
        if let Some(patterns) = schema.get("patternProperties").and_then(Value::as_object) {
            for sub in patterns.values() {
                members.push(self.expression(sub, depth)?);
            }
        }

        if members.is_empty() {
            Ok(None)
        } else if has_properties {
            // Named properties must stay assignable to the index type
            Ok(Some("unknown".to_string()))
        } else {
            Ok(Some(union(members)))
        }
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::String(s) => self.options.style.quote(s),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            _ => "unknown".to_string(),
        }
    }
}

fn is_interface(schema: &Value) -> bool {
    let Some(obj) = schema.as_object() else {
        return false;
    };
    if ["$ref", "allOf", "anyOf", "oneOf", "enum", "const"]
        .iter()
        .any(|k| obj.contains_key(*k))
    {
        return false;
    }
    match obj.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(_) => false,
        None => obj.contains_key("properties") || obj.contains_key("additionalProperties"),
    }
}

/// `description` rendered as a JSDoc block followed by a newline
fn jsdoc(schema: &Value) -> Option<String> {
    let description = schema.get("description")?.as_str()?.trim();
    if description.is_empty() {
        return None;
    }
    let mut out = String::from("/**\n");
    for line in description.replace("*/", "*\\/").lines() {
        if line.trim().is_empty() {
            out.push_str(" *\n");
        } else {
            out.push_str(&format!(" * {}\n", line.trim_end()));
        }
    }
    out.push_str(" */\n");
    Some(out)
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                match (key.as_str(), child) {
                    ("$ref", Value::String(r)) => out.push(r.clone()),
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

/// Deduplicated union in first-seen order
fn union(members: Vec<String>) -> String {
    let mut seen = HashSet::new();
    let members: Vec<String> = members.into_iter().filter(|m| seen.insert(m.clone())).collect();
    match members.len() {
        0 => "never".to_string(),
        _ => members.join(" | "),
    }
}

fn parenthesize(expr: String) -> String {
    if has_top_level_operator(&expr) {
        format!("({})", expr)
    } else {
        expr
    }
}

/// True when `|`, `&` or `=>` appears outside every bracket pair and string literal
fn has_top_level_operator(expr: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = expr.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            '|' | '&' if depth == 0 => return true,
            '=' if depth == 0 && chars.peek() == Some(&'>') => return true,
            _ => {}
        }
    }
    false
}

fn strip_outer_parens(expr: String) -> String {
    match expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
        Some(inner) if balanced(inner) => inner.to_string(),
        _ => expr,
    }
}

fn balanced(expr: &str) -> bool {
    let mut depth = 0i32;
    for c in expr.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn indent(text: &str, unit: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", unit, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
