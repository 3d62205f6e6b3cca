//! Standalone Validator Emission
//!
//! Compiles one definition into a dependency-free CommonJS validator module.
//! Every subschema becomes a function `vN(data, path, errors)` returning a
//! boolean and pushing `{ dataPath, message }` records; local `$ref`s are
//! memoized by pointer so recursive definitions terminate.
//!
//! Keywords outside the supported set make emission fail. The caller treats that
//! like a failed binding and falls back to engine lookup for the definition.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

use super::format::CodeWriter;
use super::names::is_js_identifier;
use crate::schema::resolve_local_ref;

/// Standalone emission failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StandaloneError {
    #[error("unsupported keyword '{keyword}' at {location}")]
    Unsupported { keyword: String, location: String },

    #[error("invalid '{keyword}' at {location}: {reason}")]
    Invalid {
        keyword: String,
        location: String,
        reason: String,
    },

    #[error("cannot resolve $ref '{0}'")]
    UnresolvedRef(String),
}

type Result<T> = std::result::Result<T, StandaloneError>;

/// Keywords with validation semantics the emitter implements
const SUPPORTED_KEYWORDS: &[&str] = &[
    "$ref", "type", "enum", "const",
    "minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum", "multipleOf",
    "minLength", "maxLength", "pattern",
    "items", "additionalItems", "contains", "minItems", "maxItems", "uniqueItems",
    "properties", "required", "additionalProperties", "patternProperties",
    "propertyNames", "minProperties", "maxProperties", "dependencies",
    "allOf", "anyOf", "oneOf", "not", "if", "then", "else",
];

/// Annotation keywords with no validation effect
const IGNORED_KEYWORDS: &[&str] = &[
    "title", "description", "$id", "id", "$schema", "$comment", "default",
    "examples", "definitions", "readOnly", "writeOnly", "deprecated",
    "contentMediaType", "contentEncoding", "tsType", "tsEnumNames",
];

const JSON_TYPES: &[&str] = &["null", "boolean", "object", "array", "number", "integer", "string"];

const HELPERS: &str = r#"function hasOwn(obj, key) {
  return Object.prototype.hasOwnProperty.call(obj, key);
}

function isObject(x) {
  return x !== null && typeof x === "object" && !Array.isArray(x);
}

function propPath(path, key) {
  return /^[A-Za-z_$][A-Za-z0-9_$]*$/.test(key) ? path + "." + key : path + "[" + JSON.stringify(key) + "]";
}

function equal(a, b) {
  if (a === b) return true;
  if (Array.isArray(a)) {
    if (!Array.isArray(b) || a.length !== b.length) return false;
    for (var i = 0; i < a.length; i++) if (!equal(a[i], b[i])) return false;
    return true;
  }
  if (isObject(a) && isObject(b)) {
    var keys = Object.keys(a);
    if (keys.length !== Object.keys(b).length) return false;
    for (var k = 0; k < keys.length; k++) {
      if (!hasOwn(b, keys[k]) || !equal(a[keys[k]], b[keys[k]])) return false;
    }
    return true;
  }
  return false;
}

function uniqueItems(items) {
  for (var i = 0; i < items.length; i++) {
    for (var j = i + 1; j < items.length; j++) if (equal(items[i], items[j])) return false;
  }
  return true;
}
"#;

/// Emits standalone validator modules
#[derive(Debug, Clone, Copy)]
pub struct StandaloneEmitter {
    validate_formats: bool,
}

impl StandaloneEmitter {
    /// With `validate_formats` set, `format` is a validating keyword and therefore unsupported
    pub fn new(validate_formats: bool) -> Self {
        Self { validate_formats }
    }

    /// Emit the validator module for the definition at `pointer` within `root`
    pub fn emit(&self, root: &Value, pointer: &str) -> Result<String> {
        let mut emission = Emission {
            root,
            validate_formats: self.validate_formats,
            functions: Vec::new(),
            refs: HashMap::new(),
            constants: Vec::new(),
        };
        let entry = emission.compile_ref(pointer)?;
        Ok(emission.render(entry))
    }
}

// =============================================================================
// Emission state
// =============================================================================

struct Emission<'a> {
    root: &'a Value,
    validate_formats: bool,

    /// Rendered functions, indexed by function number
    functions: Vec<Option<String>>,

    /// $ref target -> function number
    refs: HashMap<String, usize>,

    /// Module-level constant initializers
    constants: Vec<String>,
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn invalid(keyword: &str, location: &str, reason: &str) -> StandaloneError {
    StandaloneError::Invalid {
        keyword: keyword.to_string(),
        location: location.to_string(),
        reason: reason.to_string(),
    }
}

/// Push an error and mark the current function invalid
fn fail(w: &mut CodeWriter, path: &str, message: &str) {
    w.line(format!(
        "errors.push({{ dataPath: {}, message: {} }});",
        path,
        js_string(message)
    ));
    w.line("valid = false;");
}

fn type_check(name: &str) -> &'static str {
    match name {
        "null" => "data === null",
        "boolean" => "typeof data === \"boolean\"",
        "object" => "isObject(data)",
        "array" => "Array.isArray(data)",
        "number" => "typeof data === \"number\"",
        "integer" => "(typeof data === \"number\" && data % 1 === 0 && !isNaN(data))",
        _ => "typeof data === \"string\"",
    }
}

/// Static path segment for a known property name
fn property_segment(key: &str) -> String {
    if is_js_identifier(key) {
        js_string(&format!(".{}", key))
    } else {
        js_string(&format!("[{}]", js_string(key)))
    }
}

impl<'a> Emission<'a> {
    fn constant(&mut self, init: String) -> String {
        let name = format!("c{}", self.constants.len());
        self.constants.push(format!("var {} = {};", name, init));
        name
    }

    fn reserve(&mut self) -> usize {
        self.functions.push(None);
        self.functions.len() - 1
    }

    fn compile_ref(&mut self, reference: &str) -> Result<usize> {
        if let Some(&idx) = self.refs.get(reference) {
            return Ok(idx);
        }
        let root = self.root;
        let target = resolve_local_ref(root, reference)
            .ok_or_else(|| StandaloneError::UnresolvedRef(reference.to_string()))?;
        let idx = self.reserve();
        self.refs.insert(reference.to_string(), idx);
        let rendered = self.function(idx, target, reference)?;
        self.functions[idx] = Some(rendered);
        Ok(idx)
    }

    fn compile(&mut self, schema: &Value, location: &str) -> Result<usize> {
        let idx = self.reserve();
        let rendered = self.function(idx, schema, location)?;
        self.functions[idx] = Some(rendered);
        Ok(idx)
    }

    fn compile_list(&mut self, value: &Value, keyword: &str, location: &str) -> Result<Vec<usize>> {
        let items = value
            .as_array()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| invalid(keyword, location, "expected a non-empty array of schemas"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, sub)| self.compile(sub, &format!("{}/{}/{}", location, keyword, i)))
            .collect()
    }

    fn function(&mut self, idx: usize, schema: &Value, location: &str) -> Result<String> {
        let mut w = CodeWriter::new("  ");
        w.open(format!("function v{}(data, path, errors) {{", idx));
        match schema {
            Value::Bool(true) => {
                w.line("return true;");
            }
            Value::Bool(false) => {
                w.line("errors.push({ dataPath: path, message: \"boolean schema is false\" });");
                w.line("return false;");
            }
            Value::Object(obj) => self.object_body(&mut w, obj, location)?,
            _ => return Err(invalid("schema", location, "expected an object or boolean")),
        }
        w.close("}");
        Ok(w.finish())
    }

    fn object_body(&mut self, w: &mut CodeWriter, obj: &Map<String, Value>, location: &str) -> Result<()> {
        // Siblings of $ref are ignored up to draft 7
        if let Some(reference) = obj.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| invalid("$ref", location, "expected a string"))?;
            let target = self.compile_ref(reference)?;
            w.line(format!("return v{}(data, path, errors);", target));
            return Ok(());
        }

        for keyword in obj.keys() {
            let known = SUPPORTED_KEYWORDS.contains(&keyword.as_str())
                || IGNORED_KEYWORDS.contains(&keyword.as_str())
                || keyword.starts_with("x-")
                || (keyword == "format" && !self.validate_formats);
            if !known {
                return Err(StandaloneError::Unsupported {
                    keyword: keyword.clone(),
                    location: location.to_string(),
                });
            }
        }

        w.line("var valid = true;");
        self.emit_type(w, obj, location)?;
        self.emit_enum_const(w, obj);
        self.emit_numeric(w, obj, location)?;
        self.emit_string(w, obj, location)?;
        self.emit_array(w, obj, location)?;
        self.emit_object(w, obj, location)?;
        self.emit_combinators(w, obj, location)?;
        w.line("return valid;");
        Ok(())
    }

    fn emit_type(&mut self, w: &mut CodeWriter, obj: &Map<String, Value>, location: &str) -> Result<()> {
        let Some(value) = obj.get("type") else {
            return Ok(());
        };
        let types: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items
                .iter()
                .map(|t| t.as_str().ok_or_else(|| invalid("type", location, "expected strings")))
                .collect::<Result<_>>()?,
            _ => return Err(invalid("type", location, "expected a string or array")),
        };
        if let Some(unknown) = types.iter().find(|t| !JSON_TYPES.contains(t)) {
            return Err(invalid("type", location, &format!("unknown type '{}'", unknown)));
        }

        let check = types.iter().map(|t| type_check(t)).collect::<Vec<_>>().join(" || ");
        w.open(format!("if (!({})) {{", check));
        fail(w, "path", &format!("should be {}", types.join(",")));
        w.close("}");
        Ok(())
    }

    fn emit_enum_const(&mut self, w: &mut CodeWriter, obj: &Map<String, Value>) {
        if let Some(values) = obj.get("enum") {
            let c = self.constant(values.to_string());
            w.open(format!(
                "if (!{}.some(function (v) {{ return equal(data, v); }})) {{",
                c
            ));
            fail(w, "path", "should be equal to one of the allowed values");
            w.close("}");
        }
        if let Some(value) = obj.get("const") {
            let c = self.constant(value.to_string());
            w.open(format!("if (!equal(data, {})) {{", c));
            fail(w, "path", "should be equal to constant");
            w.close("}");
        }
    }

    fn emit_numeric(&mut self, w: &mut CodeWriter, obj: &Map<String, Value>, location: &str) -> Result<()> {
        let number = |keyword: &str| -> Result<Option<String>> {
            match obj.get(keyword) {
                None => Ok(None),
                Some(Value::Number(n)) => Ok(Some(n.to_string())),
                // draft-4 boolean exclusive bounds are read alongside minimum/maximum
                Some(Value::Bool(_)) if keyword.starts_with("exclusive") => Ok(None),
                Some(_) => Err(invalid(keyword, location, "expected a number")),
            }
        };
        let flag = |keyword: &str| obj.get(keyword).and_then(Value::as_bool).unwrap_or(false);

        let mut checks: Vec<(String, String)> = Vec::new();
        if let Some(min) = number("minimum")? {
            if flag("exclusiveMinimum") {
                checks.push((format!("data <= {}", min), format!("should be > {}", min)));
            } else {
                checks.push((format!("data < {}", min), format!("should be >= {}", min)));
            }
        }
        if let Some(max) = number("maximum")? {
            if flag("exclusiveMaximum") {
                checks.push((format!("data >= {}", max), format!("should be < {}", max)));
            } else {
                checks.push((format!("data > {}", max), format!("should be <= {}", max)));
            }
        }
        if let Some(min) = number("exclusiveMinimum")? {
            checks.push((format!("data <= {}", min), format!("should be > {}", min)));
        }
        if let Some(max) = number("exclusiveMaximum")? {
            checks.push((format!("data >= {}", max), format!("should be < {}", max)));
        }
        if let Some(multiple) = number("multipleOf")? {
            if obj.get("multipleOf").and_then(Value::as_f64).unwrap_or(0.0) <= 0.0 {
                return Err(invalid("multipleOf", location, "must be greater than 0"));
            }
            checks.push((
                format!("!Number.isInteger(data / {})", multiple),
                format!("should be multiple of {}", multiple),
            ));
        }

        if checks.is_empty() {
            return Ok(());
        }
        w.open("if (typeof data === \"number\") {");
        for (condition, message) in checks {
            w.open(format!("if ({}) {{", condition));
            fail(w, "path", &message);
            w.close("}");
        }
        w.close("}");
        Ok(())
    }

    fn emit_string(&mut self, w: &mut CodeWriter, obj: &Map<String, Value>, location: &str) -> Result<()> {
        let min = count(obj, "minLength", location)?;
        let max = count(obj, "maxLength", location)?;
        let pattern = match obj.get("pattern") {
            None => None,
            Some(Value::String(p)) => Some(self.constant(format!("new RegExp({})", js_string(p)))),
            Some(_) => return Err(invalid("pattern", location, "expected a string")),
        };
        if min.is_none() && max.is_none() && pattern.is_none() {
            return Ok(());
        }

        w.open("if (typeof data === \"string\") {");
        if min.is_some() || max.is_some() {
            w.line("var length = Array.from(data).length;");
        }
        if let Some(min) = min {
            w.open(format!("if (length < {}) {{", min));
            fail(w, "path", &format!("should NOT be shorter than {} characters", min));
            w.close("}");
        }
        if let Some(max) = max {
            w.open(format!("if (length > {}) {{", max));
            fail(w, "path", &format!("should NOT be longer than {} characters", max));
            w.close("}");
        }
        if let Some(re) = pattern {
            let source = obj.get("pattern").and_then(Value::as_str).unwrap_or_default();
            w.open(format!("if (!{}.test(data)) {{", re));
            fail(w, "path", &format!("should match pattern \"{}\"", source));
            w.close("}");
        }
        w.close("}");
        Ok(())
    }

    fn emit_array(&mut self, w: &mut CodeWriter, obj: &Map<String, Value>, location: &str) -> Result<()> {
        let min = count(obj, "minItems", location)?;
        let max = count(obj, "maxItems", location)?;
        let unique = obj.get("uniqueItems").and_then(Value::as_bool).unwrap_or(false);

        let mut body = CodeWriter::new("  ");
        match obj.get("items") {
            None => {}
            Some(Value::Array(tuple)) => {
                for (i, sub) in tuple.iter().enumerate() {
                    let f = self.compile(sub, &format!("{}/items/{}", location, i))?;
                    body.line(format!(
                        "if (data.length > {i} && !v{f}(data[{i}], path + \"[{i}]\", errors)) valid = false;",
                    ));
                }
                match obj.get("additionalItems") {
                    None | Some(Value::Bool(true)) => {}
                    Some(Value::Bool(false)) => {
                        body.open(format!("if (data.length > {}) {{", tuple.len()));
                        fail(&mut body, "path", &format!("should NOT have more than {} items", tuple.len()));
                        body.close("}");
                    }
                    Some(rest) => {
                        let f = self.compile(rest, &format!("{}/additionalItems", location))?;
                        body.open(format!("for (var i = {}; i < data.length; i++) {{", tuple.len()));
                        body.line(format!("if (!v{}(data[i], path + \"[\" + i + \"]\", errors)) valid = false;", f));
                        body.close("}");
                    }
                }
            }
            Some(items) => {
                let f = self.compile(items, &format!("{}/items", location))?;
                body.open("for (var i = 0; i < data.length; i++) {");
                body.line(format!("if (!v{}(data[i], path + \"[\" + i + \"]\", errors)) valid = false;", f));
                body.close("}");
            }
        }
        if let Some(contains) = obj.get("contains") {
            let f = self.compile(contains, &format!("{}/contains", location))?;
            body.open(format!(
                "if (!data.some(function (item, i) {{ return v{}(item, path + \"[\" + i + \"]\", []); }})) {{",
                f
            ));
            fail(&mut body, "path", "should contain a valid item");
            body.close("}");
        }
        if let Some(min) = min {
            body.open(format!("if (data.length < {}) {{", min));
            fail(&mut body, "path", &format!("should NOT have fewer than {} items", min));
            body.close("}");
        }
        if let Some(max) = max {
            body.open(format!("if (data.length > {}) {{", max));
            fail(&mut body, "path", &format!("should NOT have more than {} items", max));
            body.close("}");
        }
        if unique {
            body.open("if (!uniqueItems(data)) {");
            fail(&mut body, "path", "should NOT have duplicate items");
            body.close("}");
        }

        let body = body.finish();
        if !body.is_empty() {
            w.open("if (Array.isArray(data)) {");
            for line in body.lines() {
                w.line(line);
            }
            w.close("}");
        }
        Ok(())
    }

    fn emit_object(&mut self, w: &mut CodeWriter, obj: &Map<String, Value>, location: &str) -> Result<()> {
        let mut body = CodeWriter::new("  ");

        if let Some(required) = obj.get("required") {
            let names = required
                .as_array()
                .ok_or_else(|| invalid("required", location, "expected an array"))?;
            for name in names {
                let name = name
                    .as_str()
                    .ok_or_else(|| invalid("required", location, "expected strings"))?;
                body.open(format!("if (!hasOwn(data, {})) {{", js_string(name)));
                fail(&mut body, "path", &format!("should have required property '{}'", name));
                body.close("}");
            }
        }

        if let Some(min) = count(obj, "minProperties", location)? {
            body.open(format!("if (Object.keys(data).length < {}) {{", min));
            fail(&mut body, "path", &format!("should NOT have fewer than {} properties", min));
            body.close("}");
        }
        if let Some(max) = count(obj, "maxProperties", location)? {
            body.open(format!("if (Object.keys(data).length > {}) {{", max));
            fail(&mut body, "path", &format!("should NOT have more than {} properties", max));
            body.close("}");
        }

        let properties = match obj.get("properties") {
            None => Map::new(),
            Some(Value::Object(props)) => props.clone(),
            Some(_) => return Err(invalid("properties", location, "expected an object")),
        };
        for (name, sub) in &properties {
            let f = self.compile(sub, &format!("{}/properties/{}", location, name))?;
            let key = js_string(name);
            body.line(format!(
                "if (hasOwn(data, {key}) && !v{f}(data[{key}], path + {}, errors)) valid = false;",
                property_segment(name)
            ));
        }

        let mut patterns: Vec<(String, usize)> = Vec::new();
        match obj.get("patternProperties") {
            None => {}
            Some(Value::Object(map)) => {
                for (pattern, sub) in map {
                    let re = self.constant(format!("new RegExp({})", js_string(pattern)));
                    let f = self.compile(sub, &format!("{}/patternProperties/{}", location, pattern))?;
                    patterns.push((re, f));
                }
            }
            Some(_) => return Err(invalid("patternProperties", location, "expected an object")),
        }

        let additional = obj.get("additionalProperties");
        let additional_fn = match additional {
            None | Some(Value::Bool(true)) => None,
            Some(Value::Bool(false)) => Some(None),
            Some(sub) => Some(Some(self.compile(sub, &format!("{}/additionalProperties", location))?)),
        };
        let property_names = match obj.get("propertyNames") {
            None => None,
            Some(sub) => Some(self.compile(sub, &format!("{}/propertyNames", location))?),
        };

        if !patterns.is_empty() || additional_fn.is_some() || property_names.is_some() {
            let known = if additional_fn.is_some() {
                let names: Vec<Value> = properties.keys().map(|k| Value::String(k.clone())).collect();
                Some(self.constant(Value::Array(names).to_string()))
            } else {
                None
            };

            body.open("for (var key in data) {");
            body.line("if (!hasOwn(data, key)) continue;");
            if let Some(f) = property_names {
                body.open(format!("if (!v{}(key, path, [])) {{", f));
                fail(&mut body, "path", "should have valid property names");
                body.close("}");
            }
            if !patterns.is_empty() {
                body.line("var matched = false;");
                for (re, f) in &patterns {
                    body.open(format!("if ({}.test(key)) {{", re));
                    body.line("matched = true;");
                    body.line(format!("if (!v{}(data[key], propPath(path, key), errors)) valid = false;", f));
                    body.close("}");
                }
            } else {
                body.line("var matched = false;");
            }
            if let (Some(additional_fn), Some(known)) = (additional_fn, known) {
                body.open(format!("if (!matched && {}.indexOf(key) === -1) {{", known));
                match additional_fn {
                    None => fail(&mut body, "path", "should NOT have additional properties"),
                    Some(f) => {
                        body.line(format!("if (!v{}(data[key], propPath(path, key), errors)) valid = false;", f));
                    }
                }
                body.close("}");
            }
            body.close("}");
        }

        match obj.get("dependencies") {
            None => {}
            Some(Value::Object(deps)) => {
                for (name, dep) in deps {
                    let key = js_string(name);
                    match dep {
                        Value::Array(required) => {
                            body.open(format!("if (hasOwn(data, {})) {{", key));
                            for other in required {
                                let other = other
                                    .as_str()
                                    .ok_or_else(|| invalid("dependencies", location, "expected strings"))?;
                                body.open(format!("if (!hasOwn(data, {})) {{", js_string(other)));
                                fail(
                                    &mut body,
                                    "path",
                                    &format!("should have property {} when property {} is present", other, name),
                                );
                                body.close("}");
                            }
                            body.close("}");
                        }
                        sub => {
                            let f = self.compile(sub, &format!("{}/dependencies/{}", location, name))?;
                            body.line(format!("if (hasOwn(data, {}) && !v{}(data, path, errors)) valid = false;", key, f));
                        }
                    }
                }
            }
            Some(_) => return Err(invalid("dependencies", location, "expected an object")),
        }

        let body = body.finish();
        if !body.is_empty() {
            w.open("if (isObject(data)) {");
            for line in body.lines() {
                w.line(line);
            }
            w.close("}");
        }
        Ok(())
    }

    fn emit_combinators(&mut self, w: &mut CodeWriter, obj: &Map<String, Value>, location: &str) -> Result<()> {
        if let Some(all) = obj.get("allOf") {
            for f in self.compile_list(all, "allOf", location)? {
                w.line(format!("if (!v{}(data, path, errors)) valid = false;", f));
            }
        }

        if let Some(any) = obj.get("anyOf") {
            let fns = self.compile_list(any, "anyOf", location)?;
            let calls = fns
                .iter()
                .map(|f| format!("v{}(data, path, anyErrors)", f))
                .collect::<Vec<_>>()
                .join(" || ");
            w.line("var anyErrors = [];");
            w.open(format!("if (!({})) {{", calls));
            w.line("Array.prototype.push.apply(errors, anyErrors);");
            fail(w, "path", "should match some schema in anyOf");
            w.close("}");
        }

        if let Some(one) = obj.get("oneOf") {
            let fns = self.compile_list(one, "oneOf", location)?;
            w.line("var oneErrors = [];");
            w.line("var matches = 0;");
            for f in fns {
                w.line(format!("if (v{}(data, path, oneErrors)) matches++;", f));
            }
            w.open("if (matches !== 1) {");
            w.line("if (matches === 0) Array.prototype.push.apply(errors, oneErrors);");
            fail(w, "path", "should match exactly one schema in oneOf");
            w.close("}");
        }

        if let Some(not) = obj.get("not") {
            let f = self.compile(not, &format!("{}/not", location))?;
            w.open(format!("if (v{}(data, path, [])) {{", f));
            fail(w, "path", "should NOT be valid");
            w.close("}");
        }

        if let Some(condition) = obj.get("if") {
            let then_fn = match obj.get("then") {
                Some(sub) => Some(self.compile(sub, &format!("{}/then", location))?),
                None => None,
            };
            let else_fn = match obj.get("else") {
                Some(sub) => Some(self.compile(sub, &format!("{}/else", location))?),
                None => None,
            };
            if then_fn.is_some() || else_fn.is_some() {
                let if_fn = self.compile(condition, &format!("{}/if", location))?;
                w.open(format!("if (v{}(data, path, [])) {{", if_fn));
                if let Some(f) = then_fn {
                    w.line(format!("if (!v{}(data, path, errors)) valid = false;", f));
                }
                w.reopen("} else {");
                if let Some(f) = else_fn {
                    w.line(format!("if (!v{}(data, path, errors)) valid = false;", f));
                }
                w.close("}");
            }
        }
        Ok(())
    }

    fn render(self, entry: usize) -> String {
        let mut w = CodeWriter::new("  ");
        w.line("/* eslint-disable */");
        w.line("\"use strict\";");
        w.blank();
        w.raw(HELPERS);
        if !self.constants.is_empty() {
            w.blank();
            for constant in &self.constants {
                w.line(constant);
            }
        }
        for function in self.functions.into_iter().flatten() {
            w.blank();
            w.raw(&function);
        }
        w.blank();
        w.open("function validate(data) {");
        w.line("var errors = [];");
        w.line(format!("var valid = v{}(data, \"\", errors);", entry));
        w.line("validate.errors = valid ? null : errors;");
        w.line("return valid;");
        w.close("}");
        w.blank();
        w.line("module.exports = validate;");
        w.line("module.exports.default = validate;");
        w.finish()
    }
}

/// Read a non-negative integer keyword
fn count(obj: &Map<String, Value>, keyword: &str, location: &str) -> Result<Option<u64>> {
    match obj.get(keyword) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(keyword, location, "expected a non-negative integer")),
    }
}
