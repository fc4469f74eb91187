//! Build-script integration.
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     let output = rxgen::Builder::new()
//!         .source_dir("src/models")
//!         .compile()
//!         .expect("rxgen failed");
//!     if output.has_errors() {
//!         std::process::exit(1);
//!     }
//! }
//! ```
//!
//! Generated units land in `OUT_DIR` and are pulled in with
//! `include!(concat!(env!("OUT_DIR"), "/order.rs"));`.

use crate::config::GeneratorConfig;
use crate::driver::{Driver, GenerationOutput};
use crate::error::{Result, RxgenError};
use rxgen_analyzer::SourceFile;
use rxgen_core::Diagnostic;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Collects declaration files, runs the driver and writes the generated units.
#[derive(Debug, Clone)]
pub struct Builder {
    inputs: Vec<PathBuf>,
    out_dir: Option<PathBuf>,
    config: GeneratorConfig,
    config_file: Option<PathBuf>,
    cargo_directives: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            out_dir: None,
            config: GeneratorConfig::default(),
            config_file: None,
            cargo_directives: true,
        }
    }

    /// Add every `.rs` file below `dir`.
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inputs.push(dir.into());
        self
    }

    /// Add one declaration file.
    pub fn source_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.inputs.push(file.into());
        self
    }

    /// Output directory; defaults to `OUT_DIR`.
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a file at compile time.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Print `cargo:` directives. On by default; the CLI turns them off.
    pub fn cargo_directives(mut self, enabled: bool) -> Self {
        self.cargo_directives = enabled;
        self
    }

    /// Run the pipeline and write every generated unit.
    ///
    /// Returns `Err` only for I/O and configuration failures; declaration
    /// problems are reported through the output's diagnostics.
    pub fn compile(self) -> Result<GenerationOutput> {
        let out_dir = match &self.out_dir {
            Some(dir) => dir.clone(),
            None => std::env::var_os("OUT_DIR")
                .map(PathBuf::from)
                .ok_or(RxgenError::MissingOutDir)?,
        };
        let output = self.run()?;

        fs::create_dir_all(&out_dir)?;
        for file in &output.files {
            let path = out_dir.join(&file.path);
            // Unchanged units keep their timestamp.
            if fs::read_to_string(&path).ok().as_deref() == Some(file.contents.as_str()) {
                continue;
            }
            fs::write(&path, &file.contents)?;
            debug!(path = %path.display(), "unit written");
        }
        Ok(output)
    }

    /// Run the pipeline without writing anything.
    pub fn check(self) -> Result<GenerationOutput> {
        self.run()
    }

    fn run(&self) -> Result<GenerationOutput> {
        let config = match &self.config_file {
            Some(path) => GeneratorConfig::load(path)?,
            None => {
                self.config.validate()?;
                self.config.clone()
            }
        };

        let paths = self.collect()?;
        let mut sources = Vec::with_capacity(paths.len());
        for path in &paths {
            let text = fs::read_to_string(path)?;
            let display = display_path(path);
            let module = config.module_for(&display);
            sources.push(SourceFile::new(display, module, text));
        }
        debug!(sources = sources.len(), "declaration files collected");

        let output = Driver::new(config).run(&sources)?;

        if self.cargo_directives {
            for input in &self.inputs {
                println!("cargo:rerun-if-changed={}", input.display());
            }
            for path in &paths {
                println!("cargo:rerun-if-changed={}", path.display());
            }
            if let Some(path) = &self.config_file {
                println!("cargo:rerun-if-changed={}", path.display());
            }
            for diagnostic in output.diagnostics.iter() {
                println!("cargo:warning={}", cargo_line(diagnostic));
            }
        }
        Ok(output)
    }

    /// Every input file, sorted and deduplicated.
    fn collect(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in &self.inputs {
            if input.is_dir() {
                collect_dir(input, &mut files)?;
            } else if input.is_file() {
                files.push(input.clone());
            } else {
                return Err(RxgenError::InvalidSource(input.clone()));
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

fn collect_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_dir(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// One-line form of a diagnostic; cargo drops everything after a newline.
fn cargo_line(diagnostic: &Diagnostic) -> String {
    let mut line = format!(
        "{}[{}]: {} ({})",
        diagnostic.severity, diagnostic.code, diagnostic.message, diagnostic.location
    );
    if let Some(help) = &diagnostic.help {
        line.push_str(&format!("; help: {}", help));
    }
    line.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxgen_core::{codes, SourceLocation, Span};
    use tempfile::TempDir;

    const ORDER: &str = r#"
        #[model(scope = "scoped")]
        pub struct Order {
            #[observable]
            status: String,
        }
    "#;

    const CUSTOMER: &str = r#"
        #[model(scope = "singleton")]
        pub struct Customer {
            #[observable]
            name: String,
        }
    "#;

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("models");
        fs::create_dir_all(models.join("nested")).unwrap();
        fs::write(models.join("order.rs"), ORDER).unwrap();
        fs::write(models.join("nested").join("customer.rs"), CUSTOMER).unwrap();
        fs::write(models.join("notes.txt"), "not rust").unwrap();
        dir
    }

    #[test]
    fn test_compile_writes_units() {
        let dir = workspace();
        let out = dir.path().join("out");
        let output = Builder::new()
            .source_dir(dir.path().join("models"))
            .out_dir(&out)
            .cargo_directives(false)
            .compile()
            .unwrap();
        assert!(!output.has_errors());
        assert!(out.join("order.rs").is_file());
        assert!(out.join("customer.rs").is_file());
        let registration = fs::read_to_string(out.join("registration.rs")).unwrap();
        assert!(registration.contains("crate::customer::Customer"));
        assert!(registration.contains("crate::order::Order"));
    }

    #[test]
    fn test_sources_are_sorted() {
        let dir = workspace();
        let output = Builder::new()
            .source_dir(dir.path().join("models"))
            .cargo_directives(false)
            .check()
            .unwrap();
        let paths: Vec<&str> = output.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["customer.rs", "order.rs", "registration.rs"]);
    }

    #[test]
    fn test_config_file_maps_modules() {
        let dir = workspace();
        let order = display_path(&dir.path().join("models").join("order.rs"));
        let config = dir.path().join("rxgen.toml");
        fs::write(
            &config,
            format!("entry_point = \"add_shop\"\n[modules]\n{:?} = \"crate::shop::order\"\n", order),
        )
        .unwrap();
        let output = Builder::new()
            .source_file(dir.path().join("models").join("order.rs"))
            .config_file(&config)
            .cargo_directives(false)
            .check()
            .unwrap();
        let registration = &output.file("registration.rs").unwrap().contents;
        assert!(registration.contains("crate::shop::order::Order"));
        assert!(registration.contains("pub trait ShopExt"));
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let err = Builder::new()
            .source_file("/nowhere/order.rs")
            .cargo_directives(false)
            .check()
            .unwrap_err();
        assert!(matches!(err, RxgenError::InvalidSource(_)));
    }

    #[test]
    fn test_invalid_builder_config_is_an_error() {
        let dir = workspace();
        let err = Builder::new()
            .source_dir(dir.path().join("models"))
            .config(GeneratorConfig::new().with_entry_point(""))
            .cargo_directives(false)
            .check()
            .unwrap_err();
        assert!(matches!(err, RxgenError::Config(_)));
    }

    #[test]
    fn test_cargo_line_is_single_line() {
        let diagnostic = Diagnostic::new(
            codes::MISSING_SCOPE,
            "model `Order` has no explicit scope\nsecond line",
            SourceLocation::new("src/order.rs", Span::new(3, 4)),
        )
        .with_help("add scope = \"singleton\"");
        let line = cargo_line(&diagnostic);
        assert!(!line.contains('\n'));
        assert!(line.starts_with("warning[RX033]: model `Order`"));
        assert!(line.contains("(src/order.rs:3:5)"));
        assert!(line.ends_with("; help: add scope = \"singleton\""));
    }
}
