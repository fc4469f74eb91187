//! The generation driver.
//!
//! One run walks the stages `Idle → Analyzing → GraphBuilding → Validating →
//! Resolving → Emitting → Published` in order. Declaration problems become
//! diagnostics and block only their unit. A fault inside a unit's emission,
//! whether an `Err` or a panic, is converted into one `RX099` diagnostic and
//! the run continues with the next unit.

use crate::config::GeneratorConfig;
use crate::error::Result;
use rxgen_analyzer::{parse_source, Analysis, Analyzer, ParsedSource, SourceFile};
use rxgen_codegen::{GeneratedFile, Generator};
use rxgen_core::{codes, BlockSet, Diagnostic, DiagnosticBag, SourceLocation, Span, Unit};
use rxgen_resolver::{DependencyGraph, PropertyUsageResolver};
use rxgen_rules::{DiagnosticEngine, RuleContext};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    Analyzing,
    GraphBuilding,
    Validating,
    Resolving,
    Emitting,
    Published,
}

impl Stage {
    /// Stage that follows this one, `None` after publishing.
    pub fn next(self) -> Option<Stage> {
        match self {
            Self::Idle => Some(Self::Analyzing),
            Self::Analyzing => Some(Self::GraphBuilding),
            Self::GraphBuilding => Some(Self::Validating),
            Self::Validating => Some(Self::Resolving),
            Self::Resolving => Some(Self::Emitting),
            Self::Emitting => Some(Self::Published),
            Self::Published => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::GraphBuilding => "graph-building",
            Self::Validating => "validating",
            Self::Resolving => "resolving",
            Self::Emitting => "emitting",
            Self::Published => "published",
        };
        f.write_str(name)
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    /// Generated units in source order, the registration unit last.
    pub files: Vec<GeneratedFile>,
    /// Sorted diagnostics of every stage.
    pub diagnostics: DiagnosticBag,
    /// Units left out of the generated code.
    pub blocked: BlockSet,
}

impl GenerationOutput {
    pub fn file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Whether the run should fail the build.
    pub fn is_failure(&self, deny_warnings: bool) -> bool {
        self.has_errors() || (deny_warnings && self.diagnostics.warning_count() > 0)
    }

    /// Rustc-style rendering followed by a summary line.
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        for diagnostic in self.diagnostics.iter() {
            out.push_str(&diagnostic.to_string());
            out.push_str("\n\n");
        }
        out.push_str(&format!(
            "{} error(s), {} warning(s), {} file(s) generated\n",
            self.diagnostics.error_count(),
            self.diagnostics.warning_count(),
            self.files.len()
        ));
        out
    }

    /// JSON document for tooling.
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Document<'a> {
            diagnostics: Vec<&'a Diagnostic>,
            files: Vec<&'a str>,
            errors: usize,
            warnings: usize,
        }

        let document = Document {
            diagnostics: self.diagnostics.iter().collect(),
            files: self.files.iter().map(|f| f.path.as_str()).collect(),
            errors: self.diagnostics.error_count(),
            warnings: self.diagnostics.warning_count(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

/// Runs the pipeline over one set of declaration files.
pub struct Driver {
    config: GeneratorConfig,
    engine: DiagnosticEngine,
    stage: Stage,
}

impl Driver {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            engine: DiagnosticEngine::new(),
            stage: Stage::Idle,
        }
    }

    /// Use a custom rule set.
    pub fn with_engine(mut self, engine: DiagnosticEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Stage reached by the last run.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, to: Stage) {
        debug_assert_eq!(self.stage.next(), Some(to), "stages run in order");
        debug!(from = %self.stage, to = %to, "stage transition");
        self.stage = to;
    }

    /// Run every stage over `sources`.
    ///
    /// Returns `Err` only when the generator itself cannot be set up, which
    /// means the configuration is unusable.
    pub fn run(&mut self, sources: &[SourceFile]) -> Result<GenerationOutput> {
        self.stage = Stage::Idle;
        let mut diagnostics = DiagnosticBag::new();

        self.advance(Stage::Analyzing);
        let mut parse_blocks = BlockSet::new();
        let mut parsed: Vec<ParsedSource> = Vec::with_capacity(sources.len());
        for source in sources {
            match parse_source(source) {
                Ok(p) => parsed.push(p),
                Err(err) => {
                    diagnostics.push(err.into_diagnostic(&source.path));
                    parse_blocks.block(Unit::File(source.path.clone()));
                }
            }
        }
        let analysis = match guarded(|| Analyzer::new(&parsed, self.config.analyzer_options()).analyze()) {
            Ok(analysis) => analysis,
            Err(message) => return Ok(self.abandon(sources, diagnostics, "analysis", message)),
        };
        let Analysis {
            declarations,
            diagnostics: analysis_diagnostics,
            mut blocked,
        } = analysis;
        diagnostics.extend(analysis_diagnostics);
        blocked.merge(&parse_blocks);
        debug!(
            models = declarations.models.len(),
            components = declarations.components.len(),
            "declarations analyzed"
        );

        self.advance(Stage::GraphBuilding);
        let graph = match guarded(|| DependencyGraph::build(&declarations)) {
            Ok(graph) => graph,
            Err(message) => return Ok(self.abandon(sources, diagnostics, "graph building", message)),
        };

        self.advance(Stage::Validating);
        let engine = &self.engine;
        let report = match guarded(|| {
            engine.evaluate(RuleContext {
                declarations: &declarations,
                graph: &graph,
                blocked: &blocked,
            })
        }) {
            Ok(report) => report,
            Err(message) => return Ok(self.abandon(sources, diagnostics, "validation", message)),
        };
        diagnostics.extend(report.diagnostics);
        let mut blocked = report.blocked;

        self.advance(Stage::Resolving);
        let resolution = match guarded(|| PropertyUsageResolver::new(&declarations).resolve()) {
            Ok(resolution) => resolution,
            Err(message) => return Ok(self.abandon(sources, diagnostics, "resolution", message)),
        };

        self.advance(Stage::Emitting);
        let generator = Generator::new(
            &declarations,
            &resolution,
            &graph,
            &blocked,
            self.config.codegen_options(),
        )?;
        let mut files = Vec::with_capacity(parsed.len() + 1);
        let mut faults: Vec<(String, String)> = Vec::new();
        for source in &parsed {
            match guarded(|| generator.emit_source(source)) {
                Ok(Ok(Some(file))) => files.push(file),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => faults.push((source.file.path.clone(), err.to_string())),
                Err(message) => faults.push((source.file.path.clone(), message)),
            }
        }
        match guarded(|| generator.emit_registration()) {
            Ok(Ok(file)) => files.push(file),
            Ok(Err(err)) => faults.push((self.config.registration_file.clone(), err.to_string())),
            Err(message) => faults.push((self.config.registration_file.clone(), message)),
        }
        drop(generator);
        for (unit, message) in faults {
            warn!(unit = %unit, error = %message, "unit generation failed");
            diagnostics.push(internal_error(&unit, &message));
            blocked.block(Unit::File(unit));
        }

        self.advance(Stage::Published);
        diagnostics.sort();
        debug!(
            files = files.len(),
            errors = diagnostics.error_count(),
            warnings = diagnostics.warning_count(),
            blocked = blocked.len(),
            "generation published"
        );
        Ok(GenerationOutput {
            files,
            diagnostics,
            blocked,
        })
    }

    /// Output of a run whose compilation-wide stage faulted: every source is
    /// blocked and carries the fault.
    fn abandon(
        &mut self,
        sources: &[SourceFile],
        mut diagnostics: DiagnosticBag,
        stage: &str,
        message: String,
    ) -> GenerationOutput {
        warn!(stage, error = %message, "stage failed, nothing generated");
        let mut blocked = BlockSet::new();
        for source in sources {
            diagnostics.push(internal_error(&source.path, &format!("{} failed: {}", stage, message)));
            blocked.block(Unit::File(source.path.clone()));
        }
        diagnostics.sort();
        self.stage = Stage::Published;
        GenerationOutput {
            files: Vec::new(),
            diagnostics,
            blocked,
        }
    }
}

/// Run `f`, turning a panic into its message.
fn guarded<T>(f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn internal_error(unit: &str, message: &str) -> Diagnostic {
    Diagnostic::new(
        codes::INTERNAL_ERROR,
        format!("internal code-generation error: {}", message),
        SourceLocation::new(unit, Span::default()),
    )
}
