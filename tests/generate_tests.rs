//! Generation Tests
//!
//! End-to-end runs of the generator against fixture schemas in temporary folders.

use std::fs;
use std::path::Path;

use schema_decoders::codegen::config::{EndOfLine, StyleOptions};
use schema_decoders::codegen::INDEX_FILE;
use schema_decoders::{
    generate, generate_from_file, CollisionPolicy, GenerateError, GenerateOptions, Generator,
    WriteMode,
};
use serde_json::{json, Value};
use tempfile::tempdir;

fn fixture(source: &str) -> Value {
    serde_json::from_str(source).unwrap()
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn no_pack() -> GenerateOptions {
    GenerateOptions {
        pack: false,
        ..GenerateOptions::default()
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_single_definition_pack() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("models");
    let schema = fixture(include_str!("fixtures/foo.json"));

    let report = generate(&schema, &output, &GenerateOptions::default()).unwrap();

    assert_eq!(report.decoder_name, "ModelsDecoder");
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].name, "Foo");
    assert_eq!(file_names(&output), vec!["Foo.validate.js", "index.ts"]);

    let index = fs::read_to_string(output.join(INDEX_FILE)).unwrap();
    assert!(index.starts_with("/* eslint-disable */\n"));
    assert!(index.contains("import Foo$validate from './Foo.validate.js';"));
    assert!(index.contains("export interface Foo {\n  x: number;\n  [k: string]: unknown;\n}"));
    assert!(index.contains("export class ModelsDecoderError extends Error {"));
    assert!(index.contains("export class ModelsDecoder {\n  static Foo = decodeWith<Foo>(Foo$validate, 'Foo');\n}"));
    assert!(!index.contains("GeneratedContainerSchema"));
    assert!(!index.contains("Ajv"));

    let validator = fs::read_to_string(output.join("Foo.validate.js")).unwrap();
    assert!(validator.starts_with("/* eslint-disable */\n"));
    assert!(validator.contains("module.exports = validate;"));
}

#[test]
fn test_single_definition_no_pack() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("models");
    let schema = fixture(include_str!("fixtures/foo.json"));

    generate(&schema, &output, &no_pack()).unwrap();

    assert_eq!(file_names(&output), vec!["index.ts"]);
    let index = fs::read_to_string(output.join(INDEX_FILE)).unwrap();
    assert!(index.contains("import Ajv from 'ajv';"));
    assert!(index.contains("const schema$ = {"));
    assert!(index.contains("static Foo = decodeAt<Foo>('#/definitions/Foo', 'Foo');"));
    assert!(!index.contains("$validate"));
    // Only the definitions are embedded
    assert!(!index.contains("Single definition"));
}

#[test]
fn test_empty_definitions_write_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");
    let input = dir.path().join("empty.json");
    fs::write(&input, include_str!("fixtures/empty.json")).unwrap();

    let err = generate_from_file(&input, &output, &GenerateOptions::default()).unwrap_err();
    assert!(matches!(err, GenerateError::NoDefinitions));
    assert_eq!(err.to_string(), "No definitions found");
    assert!(!output.exists());
}

#[test]
fn test_pack_with_degraded_definition() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("orders");
    let schema = fixture(include_str!("fixtures/orders.json"));

    let report = generate(&schema, &output, &GenerateOptions::default()).unwrap();

    let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["LineItem", "PurchaseOrder", "Category", "IsoTimestamp"]);
    assert_eq!(
        file_names(&output),
        vec!["Category.validate.js", "LineItem.validate.js", "PurchaseOrder.validate.js", "index.ts"]
    );

    let degraded: Vec<_> = report.degraded().map(|e| e.name.as_str()).collect();
    assert_eq!(degraded, vec!["IsoTimestamp"]);

    let index = fs::read_to_string(output.join(INDEX_FILE)).unwrap();
    assert!(index.contains("import Ajv from 'ajv';"));
    assert!(index.contains("function decodeWith<T>"));
    assert!(index.contains("function decodeAt<T>"));
    assert!(index.contains("static IsoTimestamp = decodeAt<IsoTimestamp>('#/definitions/timestamp', 'IsoTimestamp');"));
    assert!(index.contains("static PurchaseOrder = decodeWith<PurchaseOrder>(PurchaseOrder$validate, 'PurchaseOrder');"));
    assert!(index.contains("items: LineItem[];"));
    assert!(index.contains("children?: Category[];"));
    assert!(index.contains("'unit-price'?: number;"));
    assert!(index.contains("export type IsoTimestamp = string;"));
}

#[test]
fn test_regeneration_is_idempotent() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("orders");
    let schema = fixture(include_str!("fixtures/orders.json"));

    let first = generate(&schema, &output, &GenerateOptions::default()).unwrap();
    assert_eq!(first.written().count(), 4);
    let mtime = fs::metadata(output.join(INDEX_FILE)).unwrap().modified().unwrap();
    let content = fs::read(output.join(INDEX_FILE)).unwrap();

    let second = generate(&schema, &output, &GenerateOptions::default()).unwrap();
    assert_eq!(second.written().count(), 0);
    assert_eq!(second.unchanged().count(), 4);
    assert!(second.is_up_to_date());
    assert_eq!(fs::metadata(output.join(INDEX_FILE)).unwrap().modified().unwrap(), mtime);
    assert_eq!(fs::read(output.join(INDEX_FILE)).unwrap(), content);
}

#[test]
fn test_check_mode_reports_stale_files() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("models");
    let schema = fixture(include_str!("fixtures/foo.json"));
    generate(&schema, &output, &GenerateOptions::default()).unwrap();

    let checker = Generator::new(GenerateOptions::default()).with_write_mode(WriteMode::Check);
    assert!(checker.generate(&schema, &output).unwrap().is_up_to_date());

    let index = output.join(INDEX_FILE);
    fs::write(&index, "// edited by hand\n").unwrap();

    let report = checker.generate(&schema, &output).unwrap();
    let stale = report.stale();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].0, index.as_path());
    assert!(stale[0].1.contains("-// edited by hand"));
    assert_eq!(fs::read_to_string(&index).unwrap(), "// edited by hand\n");
}

#[test]
fn test_check_mode_does_not_create_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("missing");
    let schema = fixture(include_str!("fixtures/foo.json"));

    let report = Generator::new(GenerateOptions::default())
        .with_write_mode(WriteMode::Check)
        .generate(&schema, &output)
        .unwrap();
    assert_eq!(report.stale().len(), 2);
    assert!(!output.exists());
}

// =============================================================================
// Options
// =============================================================================

#[test]
fn test_decoder_name_override() {
    let dir = tempdir().unwrap();
    let options = GenerateOptions {
        decoder_name: Some("Api".to_string()),
        ..GenerateOptions::default()
    };
    let report = generate(&fixture(include_str!("fixtures/foo.json")), dir.path(), &options).unwrap();
    assert_eq!(report.decoder_name, "Api");

    let index = fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
    assert!(index.contains("export class ApiError extends Error {"));
    assert!(index.contains("export class Api {"));
}

#[test]
fn test_name_collision_aborts_before_writing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");
    let schema = json!({"definitions": {"foo": {"type": "string"}, "FOO": {"type": "number"}}});

    let err = generate(&schema, &output, &GenerateOptions::default()).unwrap_err();
    assert!(matches!(err, GenerateError::NameCollision { .. }));
    assert!(!output.exists());
}

#[test]
fn test_name_collision_disambiguated() {
    let dir = tempdir().unwrap();
    let schema = json!({"definitions": {"foo": {"type": "string"}, "FOO": {"type": "number"}}});
    let options = GenerateOptions {
        collision: CollisionPolicy::Disambiguate,
        ..GenerateOptions::default()
    };

    let report = generate(&schema, dir.path(), &options).unwrap();
    let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Foo", "Foo2"]);

    let index = fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
    assert!(index.contains("export type Foo = string;"));
    assert!(index.contains("export type Foo2 = number;"));
    assert!(dir.path().join("Foo2.validate.js").exists());
}

#[test]
fn test_style_options() {
    let dir = tempdir().unwrap();
    let options = GenerateOptions {
        style: StyleOptions {
            tab_width: 4,
            single_quote: false,
            end_of_line: EndOfLine::Crlf,
            ..StyleOptions::default()
        },
        ..GenerateOptions::default()
    };
    generate(&fixture(include_str!("fixtures/foo.json")), dir.path(), &options).unwrap();

    let index = fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
    assert!(index.contains("import Foo$validate from \"./Foo.validate.js\";\r\n"));
    assert!(index.contains("\r\n    x: number;\r\n"));
    assert!(!index.replace("\r\n", "").contains('\n'));
}

#[test]
fn test_output_is_formatted() {
    let dir = tempdir().unwrap();
    generate(&fixture(include_str!("fixtures/orders.json")), dir.path(), &no_pack()).unwrap();

    let index = fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
    assert!(index.ends_with("}\n"));
    assert!(!index.contains("\n\n\n"));
    assert!(index.lines().all(|line| line == line.trim_end()));
}
