//! Pack mode: one precompiled validator file per definition
//!
//! For each bound validator the emitter asks the compiler for standalone source,
//! schedules `<Name>.validate.js` for writing and records the matching import and
//! decoder entry. Nothing is written here; pending files are flushed as one batch
//! once every definition has been visited.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, warn};

use super::config::StyleOptions;
use super::template::DecoderEntry;
use super::validator::{BoundValidator, ValidatorCompiler};
use crate::schema::Definition;
use crate::writer::PendingWrite;

/// Validator file name for a definition
pub fn validator_file_name(name: &str) -> String {
    format!("{}.validate.js", name)
}

/// Identifier under which the generated module imports a validator
pub fn validator_ident(name: &str) -> String {
    format!("{}$validate", name)
}

/// Everything accumulated while visiting definitions
#[derive(Debug, Default)]
pub struct ArtifactSet {
    /// Import lines for precompiled validators
    pub imports: Vec<String>,

    /// One entry per definition, in enumeration order
    pub decoders: Vec<DecoderEntry>,

    /// Validator files, paths relative to the output folder
    pub pending: Vec<PendingWrite>,
}

impl ArtifactSet {
    pub fn uses_pointer_lookup(&self) -> bool {
        self.decoders.iter().any(DecoderEntry::is_pointer_lookup)
    }

    /// Pending writes rooted at `output`
    pub fn pending_in(&self, output: &std::path::Path) -> Vec<PendingWrite> {
        self.pending
            .iter()
            .map(|w| PendingWrite {
                path: output.join(&w.path),
                content: w.content.clone(),
            })
            .collect()
    }
}

pub struct PackEmitter<'a> {
    compiler: &'a dyn ValidatorCompiler,
    style: &'a StyleOptions,
}

impl<'a> PackEmitter<'a> {
    pub fn new(compiler: &'a dyn ValidatorCompiler, style: &'a StyleOptions) -> Self {
        Self { compiler, style }
    }

    /// Schedule the precompiled validator for `definition`.
    ///
    /// Returns false when standalone emission fails; the caller degrades the
    /// definition to pointer lookup.
    pub fn emit(
        &self,
        schema: &Value,
        definition: &Definition,
        validator: &BoundValidator,
        artifacts: &mut ArtifactSet,
    ) -> bool {
        let source = match self.compiler.standalone_source(schema, validator) {
            Ok(source) => source,
            Err(reason) => {
                warn!(
                    definition = %definition.key,
                    %reason,
                    "Standalone validator unavailable, falling back to pointer lookup"
                );
                return false;
            }
        };

        let file = validator_file_name(&definition.name);
        let ident = validator_ident(&definition.name);
        debug!(definition = %definition.key, file = %file, "Scheduled validator file");

        artifacts.imports.push(format!(
            "import {} from {};",
            ident,
            self.style.quote(&format!("./{}", file))
        ));
        artifacts.pending.push(PendingWrite {
            path: PathBuf::from(file),
            content: source,
        });
        artifacts
            .decoders
            .push(DecoderEntry::precompiled(definition, ident));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::template::DecoderStrategy;
    use crate::codegen::validator::JsonSchemaCompiler;
    use crate::schema::DefinitionsMap;
    use serde_json::json;

    #[test]
    fn test_emit_schedules_file_and_import() {
        let root = json!({"definitions": {"foo": {"type": "object", "required": ["x"]}}});
        let map = DefinitionsMap::from_schema(&root).unwrap();
        let def = &map.definitions().unwrap()[0];
        let compiler = JsonSchemaCompiler::default();
        let validator = compiler.bind(&root, &def.pointer()).unwrap();
        let style = StyleOptions::default();

        let mut artifacts = ArtifactSet::default();
        assert!(PackEmitter::new(&compiler, &style).emit(&root, def, &validator, &mut artifacts));

        assert_eq!(artifacts.imports, vec!["import Foo$validate from './Foo.validate.js';"]);
        assert_eq!(artifacts.pending[0].path, PathBuf::from("Foo.validate.js"));
        assert!(artifacts.pending[0].content.starts_with("/* eslint-disable */"));
        assert_eq!(
            artifacts.decoders[0].strategy,
            DecoderStrategy::Precompiled {
                validator_ident: "Foo$validate".to_string()
            }
        );
        assert!(!artifacts.uses_pointer_lookup());
    }

    #[test]
    fn test_emit_failure_leaves_artifacts_untouched() {
        let root = json!({"definitions": {"When": {"type": "string", "format": "date-time"}}});
        let map = DefinitionsMap::from_schema(&root).unwrap();
        let def = &map.definitions().unwrap()[0];
        let compiler = JsonSchemaCompiler::default();
        let validator = compiler.bind(&root, &def.pointer()).unwrap();
        let style = StyleOptions::default();

        let mut artifacts = ArtifactSet::default();
        assert!(!PackEmitter::new(&compiler, &style).emit(&root, def, &validator, &mut artifacts));
        assert!(artifacts.imports.is_empty());
        assert!(artifacts.pending.is_empty());
        assert!(artifacts.decoders.is_empty());
    }
}
