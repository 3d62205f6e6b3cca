//! Code Generation
//!
//! Turns a definitions map into one TypeScript decoder module plus, in pack mode,
//! one standalone validator file per definition.
//!
//! Pipeline:
//! - Enumerate definitions and derive one identifier per definition
//! - Bind a validator per definition; pick a `DecoderStrategy`
//! - Pack mode: schedule standalone validator files, then flush them as one batch
//! - Compile type declarations once and drop the synthetic container
//! - Assemble, format and idempotently write `index.ts`
//!
//! The three external collaborators (type compiler, validator compiler, formatter)
//! are traits; `Generator` holds one of each and can have any of them swapped.

pub mod config;
pub mod format;
pub mod names;
pub mod pack;
pub mod standalone;
pub mod template;
pub mod typescript;
pub mod validator;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{GenerateError, Result};
use crate::schema::DefinitionsMap;
use crate::writer::{IdempotentWriter, WriteMode, WriteOutcome};

use self::config::{GenerateOptions, GenerationMode};
use self::format::{Formatter, LayoutFormatter};
use self::names::NameDeriver;
use self::pack::{ArtifactSet, PackEmitter};
use self::template::{DecoderEntry, ModuleAssembler};
use self::typescript::{TypeCompiler, TypeModelBuilder, TypeScriptCompiler};
use self::validator::{JsonSchemaCompiler, ValidatorCompiler};

/// Name of the aggregate module in the output folder
pub const INDEX_FILE: &str = "index.ts";

// =============================================================================
// Report
// =============================================================================

/// Outcome of one output file
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

/// Summary of a generation run
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub decoder_name: String,
    pub mode: GenerationMode,
    /// One entry per definition, in enumeration order
    pub entries: Vec<DecoderEntry>,
    /// Validator files first, `index.ts` last
    pub files: Vec<FileReport>,
}

impl GenerationReport {
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|f| f.outcome == WriteOutcome::Written)
            .map(|f| f.path.as_path())
    }

    pub fn unchanged(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|f| f.outcome == WriteOutcome::Unchanged)
            .map(|f| f.path.as_path())
    }

    /// Check mode: files whose content would change, with their diffs
    pub fn stale(&self) -> Vec<(&Path, &str)> {
        self.files
            .iter()
            .filter_map(|f| match &f.outcome {
                WriteOutcome::Stale { diff } => Some((f.path.as_path(), diff.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn is_up_to_date(&self) -> bool {
        self.files.iter().all(|f| f.outcome == WriteOutcome::Unchanged)
    }

    pub fn degraded(&self) -> impl Iterator<Item = &DecoderEntry> {
        let pack = self.mode == GenerationMode::Pack;
        self.entries.iter().filter(move |e| pack && e.is_pointer_lookup())
    }
}

/// Definitions, reduced schema and per-definition artifacts, before anything is written
#[derive(Debug)]
pub struct Plan {
    pub definitions: DefinitionsMap,
    /// `{ "definitions": ... }`
    pub schema: Value,
    pub artifacts: ArtifactSet,
}

// =============================================================================
// Generator
// =============================================================================

/// The generation pipeline with its collaborators
pub struct Generator {
    options: GenerateOptions,
    types: Box<dyn TypeCompiler>,
    validators: Box<dyn ValidatorCompiler>,
    formatter: Box<dyn Formatter>,
    write_mode: WriteMode,
}

impl Generator {
    /// Pipeline with the built-in collaborators configured from `options`
    pub fn new(options: GenerateOptions) -> Self {
        let types = TypeScriptCompiler::new(&options.naming, options.collision);
        let validators = JsonSchemaCompiler::new(options.validator.clone());
        Self {
            options,
            types: Box::new(types),
            validators: Box::new(validators),
            formatter: Box::new(LayoutFormatter),
            write_mode: WriteMode::Write,
        }
    }

    pub fn with_type_compiler(mut self, compiler: impl TypeCompiler + 'static) -> Self {
        self.types = Box::new(compiler);
        self
    }

    pub fn with_validator_compiler(mut self, compiler: impl ValidatorCompiler + 'static) -> Self {
        self.validators = Box::new(compiler);
        self
    }

    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Enumerate, bind and select a strategy per definition without touching disk
    pub fn plan(&self, schema: &Value) -> Result<Plan> {
        let definitions = DefinitionsMap::from_schema(schema)?;
        let deriver = NameDeriver::new(&self.options.naming);
        let enumerated = definitions.enumerate(&deriver, self.options.collision)?;
        let reduced = definitions.to_schema();

        let mode = self.options.mode();
        let emitter = PackEmitter::new(self.validators.as_ref(), &self.options.style);
        let mut artifacts = ArtifactSet::default();

        for definition in &enumerated {
            let pointer = definition.pointer();
            debug!(definition = %definition.key, name = %definition.name, %pointer, "Binding validator");

            let bound = self.validators.bind(&reduced, &pointer);
            match (mode, bound) {
                (GenerationMode::Pack, Some(validator)) => {
                    if !emitter.emit(&reduced, definition, &validator, &mut artifacts) {
                        artifacts.decoders.push(DecoderEntry::pointer_lookup(definition));
                    }
                }
                (GenerationMode::Pack, None) => {
                    warn!(
                        definition = %definition.key,
                        %pointer,
                        "No validator bound, falling back to pointer lookup"
                    );
                    artifacts.decoders.push(DecoderEntry::pointer_lookup(definition));
                }
                (GenerationMode::NoPack, bound) => {
                    if bound.is_none() {
                        warn!(definition = %definition.key, %pointer, "No validator bound");
                    }
                    artifacts.decoders.push(DecoderEntry::pointer_lookup(definition));
                }
            }
        }

        Ok(Plan {
            definitions,
            schema: reduced,
            artifacts,
        })
    }

    /// Run the full pipeline into `output`
    pub fn generate(&self, schema: &Value, output: &Path) -> Result<GenerationReport> {
        let plan = self.plan(schema)?;
        self.prepare_output(output)?;

        let deriver = NameDeriver::new(&self.options.naming);
        let decoder_name = deriver.decoder_class_name(output, self.options.decoder_name.as_deref());
        info!(
            decoder = %decoder_name,
            definitions = plan.definitions.len(),
            mode = ?self.options.mode(),
            output = %output.display(),
            "Generating decoders"
        );

        let writer = IdempotentWriter::new(self.write_mode);
        let mut files: Vec<FileReport> = writer
            .write_batch(&plan.artifacts.pending_in(output))?
            .into_iter()
            .map(|(path, outcome)| FileReport { path, outcome })
            .collect();

        let declarations = TypeModelBuilder::new(self.types.as_ref())
            .build(&plan.definitions, &self.options.style)?;

        let source = ModuleAssembler::new(
            &decoder_name,
            &self.options.style,
            &plan.schema,
            self.options.validator.engine_options(),
        )
        .assemble(&plan.artifacts.imports, &declarations, &plan.artifacts.decoders)?;

        let formatted = self
            .formatter
            .format(&source, &self.options.style)
            .map_err(GenerateError::Formatter)?;

        let index = output.join(INDEX_FILE);
        let outcome = writer.write_if_changed(&index, &formatted)?;
        files.push(FileReport { path: index, outcome });

        let report = GenerationReport {
            decoder_name,
            mode: self.options.mode(),
            entries: plan.artifacts.decoders,
            files,
        };
        info!(
            written = report.written().count(),
            unchanged = report.unchanged().count(),
            degraded = report.degraded().count(),
            "Generation complete"
        );
        Ok(report)
    }

    fn prepare_output(&self, output: &Path) -> Result<()> {
        if output.exists() {
            if !output.is_dir() {
                return Err(GenerateError::NotADirectory(output.to_path_buf()));
            }
            return Ok(());
        }
        if self.write_mode == WriteMode::Check {
            return Ok(());
        }
        fs::create_dir_all(output).map_err(|source| GenerateError::WriteFailed {
            path: output.to_path_buf(),
            source,
        })
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Generate from an in-memory schema
pub fn generate(schema: &Value, output: &Path, options: &GenerateOptions) -> Result<GenerationReport> {
    Generator::new(options.clone()).generate(schema, output)
}

/// Generate from a JSON schema file
pub fn generate_from_file(input: &Path, output: &Path, options: &GenerateOptions) -> Result<GenerationReport> {
    let schema = load_schema(input)?;
    generate(&schema, output, options)
}

/// Read and parse a JSON schema file
pub fn load_schema(input: &Path) -> Result<Value> {
    if !input.is_file() {
        return Err(GenerateError::InputNotFound(input.to_path_buf()));
    }
    let content = fs::read_to_string(input)?;
    Ok(serde_json::from_str(&content)?)
}
