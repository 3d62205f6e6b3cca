//! Runtime Tests
//!
//! Decoding through `DecoderRegistry` with both strategies, and the emitted
//! pack validators executed under node.

use std::fs;
use std::process::Command;

use schema_decoders::codegen::pack::validator_file_name;
use schema_decoders::{generate, DecoderRegistry, GenerateOptions};
use serde_json::{json, Value};
use tempfile::tempdir;

fn orders() -> Value {
    serde_json::from_str(include_str!("fixtures/orders.json")).unwrap()
}

fn registry(pack: bool) -> DecoderRegistry {
    let options = GenerateOptions {
        pack,
        ..GenerateOptions::default()
    };
    DecoderRegistry::from_schema(&orders(), &options).unwrap()
}

/// (decoder, document, expected validity)
fn samples() -> Vec<(&'static str, Value, bool)> {
    vec![
        ("LineItem", json!({"sku": "ABC-1", "quantity": 2}), true),
        ("LineItem", json!({"sku": "ABC-1", "quantity": 2, "unit-price": 9.5}), true),
        ("LineItem", json!({"sku": "abc", "quantity": 2}), false),
        ("LineItem", json!({"sku": "ABC-1", "quantity": 0}), false),
        ("LineItem", json!({"sku": "ABC-1", "quantity": 1.5}), false),
        ("LineItem", json!({"sku": "ABC-1", "quantity": 1, "unit-price": 0}), false),
        ("LineItem", json!({"sku": "ABC-1", "quantity": 1, "color": "red"}), false),
        (
            "PurchaseOrder",
            json!({"id": "o-1", "status": "open", "items": [{"sku": "XYZ-9", "quantity": 1}]}),
            true,
        ),
        (
            "PurchaseOrder",
            json!({"id": "o-1", "status": "open", "items": [{"sku": "XYZ-9", "quantity": 1}], "notes": null}),
            true,
        ),
        ("PurchaseOrder", json!({"id": "o-1", "status": "lost", "items": [{"sku": "XYZ-9", "quantity": 1}]}), false),
        ("PurchaseOrder", json!({"id": "o-1", "status": "open", "items": []}), false),
        ("PurchaseOrder", json!({"id": "", "status": "open", "items": [{"sku": "XYZ-9", "quantity": 1}]}), false),
        ("PurchaseOrder", json!({"id": "o-1", "status": "paid", "items": [{"sku": "bad", "quantity": 1}]}), false),
        ("Category", json!({"name": "root", "children": [{"name": "leaf", "children": []}]}), true),
        ("Category", json!({"name": "root", "children": [{"children": []}]}), false),
        ("IsoTimestamp", json!("2024-05-01T12:00:00Z"), true),
        ("IsoTimestamp", json!("yesterday"), false),
        ("IsoTimestamp", json!(42), false),
    ]
}

#[test]
fn test_registry_names_follow_definitions() {
    let registry = registry(true);
    let names: Vec<_> = registry.names().collect();
    assert_eq!(names, vec!["LineItem", "PurchaseOrder", "Category", "IsoTimestamp"]);
}

#[test]
fn test_valid_values_round_trip() {
    for pack in [true, false] {
        let registry = registry(pack);
        for (name, document, valid) in samples() {
            if valid {
                assert_eq!(
                    registry.decode(name, document.clone()).unwrap(),
                    document,
                    "{} (pack = {})",
                    name,
                    pack
                );
            }
        }
    }
}

#[test]
fn test_invalid_values_carry_payload() {
    for pack in [true, false] {
        let registry = registry(pack);
        for (name, document, valid) in samples() {
            if !valid {
                let err = registry.decode(name, document.clone()).unwrap_err();
                assert_eq!(err.json, document, "{} (pack = {})", name, pack);
                assert!(err.message.starts_with(&format!("Error validating {}: ", name)));
                assert!(!err.errors.is_empty());
            }
        }
    }
}

#[test]
fn test_degraded_definition_uses_pointer_lookup() {
    let registry = registry(true);
    assert_eq!(registry.uses_pointer_lookup("LineItem"), Some(false));
    assert_eq!(registry.uses_pointer_lookup("IsoTimestamp"), Some(true));
    assert_eq!(registry.uses_pointer_lookup("Missing"), None);

    assert!(!registry.engine().is_initialized());
    registry.decode("LineItem", json!({"sku": "ABC-1", "quantity": 1})).unwrap();
    assert!(!registry.engine().is_initialized());
    registry.decode("IsoTimestamp", json!("2024-05-01T12:00:00Z")).unwrap();
    assert!(registry.engine().is_initialized());
}

#[test]
fn test_registry_from_generation_report() {
    let dir = tempdir().unwrap();
    let schema = serde_json::from_str::<Value>(include_str!("fixtures/foo.json")).unwrap();
    let options = GenerateOptions::default();
    let report = generate(&schema, dir.path(), &options).unwrap();

    let registry = DecoderRegistry::new(
        report.decoder_name.clone(),
        json!({"definitions": schema["definitions"].clone()}),
        &report.entries,
        &options.validator,
    );
    assert!(registry.decode("Foo", json!({"x": 1})).is_ok());

    let err = registry.decode("Foo", json!({"x": "a"})).unwrap_err();
    assert_eq!(err.json, json!({"x": "a"}));
}

// =============================================================================
// Emitted validators
// =============================================================================

/// Loads a validator module and prints its verdict for each document
const RUNNER: &str = r#"const validate = require(process.argv[2]);
const documents = JSON.parse(process.argv[3]);
const results = documents.map((document) => {
  const valid = validate(document);
  if (!valid && !(Array.isArray(validate.errors) && validate.errors.length > 0)) {
    throw new Error("rejected without errors");
  }
  if (valid && validate.errors !== null) {
    throw new Error("accepted with errors");
  }
  return valid;
});
process.stdout.write(JSON.stringify(results));
"#;

fn node_available() -> bool {
    Command::new("node")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Runs each sample through the generated `<Name>.validate.js` and checks it
/// against both the expected verdict and the embedded engine.
fn assert_emitted_validators_agree(schema: &Value, samples: &[(&'static str, Value, bool)]) {
    if !node_available() {
        eprintln!("node not found, skipping emitted validator checks");
        return;
    }

    let dir = tempdir().unwrap();
    let report = generate(schema, dir.path(), &GenerateOptions::default()).unwrap();
    let runner = dir.path().join("run-validator.js");
    fs::write(&runner, RUNNER).unwrap();

    let embedded = DecoderRegistry::from_schema(
        schema,
        &GenerateOptions {
            pack: false,
            ..GenerateOptions::default()
        },
    )
    .unwrap();

    let mut checked = 0;
    for entry in report.entries.iter().filter(|e| !e.is_pointer_lookup()) {
        let rows: Vec<_> = samples.iter().filter(|(name, _, _)| *name == entry.name).collect();
        if rows.is_empty() {
            continue;
        }

        let documents = Value::Array(rows.iter().map(|(_, document, _)| document.clone()).collect());
        let output = Command::new("node")
            .arg(&runner)
            .arg(dir.path().join(validator_file_name(&entry.name)))
            .arg(documents.to_string())
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "{}: {}",
            entry.name,
            String::from_utf8_lossy(&output.stderr)
        );

        let verdicts: Vec<bool> = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(verdicts.len(), rows.len());
        for ((name, document, expected), accepted) in rows.into_iter().zip(verdicts) {
            assert_eq!(accepted, *expected, "{} on {}", validator_file_name(name), document);
            assert_eq!(
                accepted,
                embedded.decode(name, document.clone()).is_ok(),
                "{} disagrees with the embedded engine on {}",
                name,
                document
            );
            checked += 1;
        }
    }
    assert!(checked > 0);
}

fn keyword_samples() -> Vec<(&'static str, Value, bool)> {
    vec![
        ("Shape", json!({"kind": "circle", "r": 1}), true),
        ("Shape", json!({"kind": "square", "side": 2}), true),
        ("Shape", json!({"kind": "circle"}), false),
        ("Shape", json!({"kind": "triangle", "r": 1}), false),
        ("Tags", json!(["a", "b"]), true),
        ("Tags", json!(["a", "a"]), false),
        ("Tags", json!(["a", "b", "c", "d"]), false),
        ("Tags", json!([1]), false),
        ("Pair", json!(["a", 1]), true),
        ("Pair", json!(["a"]), true),
        ("Pair", json!(["a", 1, 2]), false),
        ("Pair", json!(["a", 1.5]), false),
        ("Pair", json!([1, "a"]), false),
        ("Headers", json!({"x-id": "1"}), true),
        ("Headers", json!({"x-id": 2}), false),
        ("Headers", json!({"accept": "*"}), false),
        ("Headers", json!({"x-very-long-name": "v"}), false),
        ("Billing", json!({"card": "c", "address": "a"}), true),
        ("Billing", json!({"address": "a"}), true),
        ("Billing", json!({"card": "c"}), false),
        ("NotNull", json!(1), true),
        ("NotNull", json!("a"), true),
        ("NotNull", json!(null), false),
        ("Shipping", json!({"country": "US", "zip": "10001"}), true),
        ("Shipping", json!({"country": "FR"}), true),
        ("Shipping", json!({"country": "US"}), false),
        ("Step", json!(15), true),
        ("Step", json!(7), false),
        ("Step", json!(105), false),
        ("AnyId", json!("abc"), true),
        ("AnyId", json!(5), true),
        ("AnyId", json!("ab"), false),
        ("AnyId", json!(-1), false),
    ]
}

#[test]
fn test_emitted_validators_match_samples() {
    assert_emitted_validators_agree(&orders(), &samples());
}

#[test]
fn test_emitted_validators_cover_keywords() {
    let schema: Value = serde_json::from_str(include_str!("fixtures/keywords.json")).unwrap();
    let packed = DecoderRegistry::from_schema(&schema, &GenerateOptions::default()).unwrap();
    for name in packed.names() {
        assert_eq!(packed.uses_pointer_lookup(name), Some(false), "{} was degraded", name);
    }
    assert_emitted_validators_agree(&schema, &keyword_samples());
}
