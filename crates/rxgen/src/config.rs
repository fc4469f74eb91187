//! `rxgen.toml` configuration.
//!
//! Every key is optional:
//!
//! ```toml
//! runtime_path = "::rxgen_runtime"
//! default_scope = "singleton"
//! registration_file = "registration.rs"
//! entry_point = "add_generated_models"
//! deny_warnings = false
//!
//! [modules]
//! "src/models/order.rs" = "crate::models::order"
//! ```

use crate::error::ConfigError;
use rxgen_analyzer::AnalyzerOptions;
use rxgen_codegen::CodegenOptions;
use rxgen_core::Scope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Path of the runtime crate as seen from generated code.
    pub runtime_path: String,
    /// Scope of models that do not declare one.
    pub default_scope: Scope,
    /// File name of the registration unit.
    pub registration_file: String,
    /// Name of the `ServiceCollection` extension method.
    pub entry_point: String,
    /// Treat warnings as failures.
    pub deny_warnings: bool,
    /// Module path of each declaration file, keyed by source path.
    pub modules: BTreeMap<String, String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let codegen = CodegenOptions::default();
        Self {
            runtime_path: codegen.runtime_path,
            default_scope: AnalyzerOptions::default().default_scope,
            registration_file: codegen.registration_file,
            entry_point: codegen.entry_point,
            deny_warnings: false,
            modules: BTreeMap::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse_at(text, Path::new("rxgen.toml"))
    }

    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_at(&text, path)
    }

    fn parse_at(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot name anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime_path.trim().is_empty() {
            return Err(ConfigError::Empty("runtime_path"));
        }
        if self.registration_file.trim().is_empty() {
            return Err(ConfigError::Empty("registration_file"));
        }
        if self.entry_point.trim().is_empty() {
            return Err(ConfigError::Empty("entry_point"));
        }
        Ok(())
    }

    pub fn with_runtime_path(mut self, path: impl Into<String>) -> Self {
        self.runtime_path = path.into();
        self
    }

    pub fn with_default_scope(mut self, scope: Scope) -> Self {
        self.default_scope = scope;
        self
    }

    pub fn with_registration_file(mut self, file: impl Into<String>) -> Self {
        self.registration_file = file.into();
        self
    }

    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    pub fn with_deny_warnings(mut self, deny: bool) -> Self {
        self.deny_warnings = deny;
        self
    }

    /// Map a declaration file onto the module that includes its generated unit.
    pub fn with_module(mut self, source: impl Into<String>, module: impl Into<String>) -> Self {
        self.modules.insert(normalize(&source.into()), module.into());
        self
    }

    /// Module path for a source file: the configured mapping, or
    /// `crate::<file stem>` when the file is unmapped.
    pub fn module_for(&self, source: &str) -> String {
        let key = normalize(source);
        if let Some(module) = self.modules.get(&key) {
            return module.clone();
        }
        if let Some((_, module)) = self.modules.iter().find(|(k, _)| normalize(k) == key) {
            return module.clone();
        }
        let stem = Path::new(&key)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("generated");
        format!("crate::{}", stem)
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            default_scope: self.default_scope,
        }
    }

    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            runtime_path: self.runtime_path.clone(),
            entry_point: self.entry_point.clone(),
            registration_file: self.registration_file.clone(),
        }
    }
}

/// Forward slashes and no leading `./`.
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}
