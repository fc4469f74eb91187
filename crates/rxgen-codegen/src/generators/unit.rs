//! Generated translation units.
//!
//! A declaration file becomes one unit: model structs are replaced by their
//! generated form, component structs gain their observation impl, and every
//! other item passes through untouched. Items belonging to blocked units are
//! left out so that one bad declaration never breaks its neighbours.

use super::{emit_component, emit_model, emit_registration, emit_singletons, registered_models, trait_name, ModelContext};
use crate::error::{CodegenError, Result};
use crate::syntax;
use crate::templates::{RegistrationHeader, TemplateEngine, UnitHeader, REGISTRATION_HEADER, UNIT_HEADER};
use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use rxgen_analyzer::{is_generator_attribute, ParsedSource};
use rxgen_core::{BlockSet, Declarations};
use rxgen_resolver::{DependencyGraph, Resolution};
use serde::{Deserialize, Serialize};
use syn::{Item, ItemImpl, Path, Type};
use tracing::debug;

/// Options controlling emitted paths and names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenOptions {
    /// Path of the runtime crate in generated code.
    pub runtime_path: String,
    /// Name of the registration extension method.
    pub entry_point: String,
    /// File name of the registration unit.
    pub registration_file: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime_path: "::rxgen_runtime".to_string(),
            entry_point: "add_generated_models".to_string(),
            registration_file: "registration.rs".to_string(),
        }
    }
}

/// One emitted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub path: String,
    pub contents: String,
}

/// Emits generated units for one compilation.
pub struct Generator<'a> {
    declarations: &'a Declarations,
    resolution: &'a Resolution,
    graph: &'a DependencyGraph,
    blocked: &'a BlockSet,
    options: CodegenOptions,
    runtime: Path,
    templates: TemplateEngine<'static>,
}

impl<'a> Generator<'a> {
    pub fn new(
        declarations: &'a Declarations,
        resolution: &'a Resolution,
        graph: &'a DependencyGraph,
        blocked: &'a BlockSet,
        options: CodegenOptions,
    ) -> Result<Self> {
        let runtime = syntax::path(&options.runtime_path)?;
        Ok(Self {
            declarations,
            resolution,
            graph,
            blocked,
            options,
            runtime,
            templates: TemplateEngine::new()?,
        })
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    fn context(&self, name: &str) -> Result<ModelContext<'_>> {
        let model = self
            .declarations
            .model(name)
            .ok_or_else(|| CodegenError::UnknownModel(name.to_string()))?;
        let usage = self
            .resolution
            .model(name)
            .ok_or_else(|| CodegenError::UnknownModel(name.to_string()))?;
        Ok(ModelContext {
            model,
            usage,
            declarations: self.declarations,
            blocked: self.blocked,
            runtime: &self.runtime,
        })
    }

    /// Generated unit for one declaration file, or `None` when the file is blocked.
    pub fn emit_source(&self, source: &ParsedSource) -> Result<Option<GeneratedFile>> {
        if self.blocked.is_file_blocked(&source.file.path) {
            debug!(file = %source.file.path, "file blocked, nothing emitted");
            return Ok(None);
        }

        let mut models = Vec::new();
        let mut components = Vec::new();
        let mut items = TokenStream::new();
        for item in &source.syntax.items {
            match item {
                Item::Struct(s) => {
                    let name = s.ident.to_string();
                    if self.blocked.is_model_blocked(&name) || self.blocked.is_component_blocked(&name) {
                        continue;
                    }
                    if self.declarations.model(&name).is_some() {
                        items.extend(emit_model(&self.context(&name)?, s)?);
                        models.push(s.ident.to_string());
                    } else if let Some(component) = self.declarations.component(&name) {
                        let usage = self
                            .resolution
                            .component(&name)
                            .ok_or_else(|| CodegenError::UnknownModel(name.clone()))?;
                        items.extend(emit_component(component, usage, s, &self.runtime)?);
                        components.push(s.ident.to_string());
                    } else {
                        items.extend(s.to_token_stream());
                    }
                }
                Item::Enum(e) if e.attrs.iter().any(is_generator_attribute) => {}
                Item::Union(u) if u.attrs.iter().any(is_generator_attribute) => {}
                Item::Impl(imp) if self.is_blocked_impl(imp) => {}
                other => items.extend(other.to_token_stream()),
            }
        }

        let header = self.templates.render(
            UNIT_HEADER,
            &UnitHeader {
                version: env!("CARGO_PKG_VERSION"),
                source: &source.file.path,
                models: models.iter().map(String::as_str).collect(),
                components: components.iter().map(String::as_str).collect(),
            },
        )?;
        let contents = self.render(&source.file.path, header, &source.syntax.attrs, items)?;
        debug!(
            file = %source.file.path,
            models = models.len(),
            components = components.len(),
            "unit emitted"
        );
        Ok(Some(GeneratedFile {
            path: format!("{}.rs", source.file.stem()),
            contents,
        }))
    }

    /// The registration unit for the whole compilation.
    pub fn emit_registration(&self) -> Result<GeneratedFile> {
        let registration = emit_registration(
            self.declarations,
            self.blocked,
            &self.runtime,
            &self.options.entry_point,
        )?;
        let singletons = emit_singletons(self.declarations, self.blocked, self.graph, &self.runtime)?;
        let trait_name = trait_name(&self.options.entry_point);
        let header = self.templates.render(
            REGISTRATION_HEADER,
            &RegistrationHeader {
                version: env!("CARGO_PKG_VERSION"),
                trait_name: &trait_name,
                entry_point: &self.options.entry_point,
                count: registered_models(self.declarations, self.blocked).len(),
            },
        )?;
        let contents = self.render(
            &self.options.registration_file,
            header,
            &[],
            quote! { #registration #singletons },
        )?;
        Ok(GeneratedFile {
            path: self.options.registration_file.clone(),
            contents,
        })
    }

    /// Whether an `impl` block targets a blocked model or component.
    fn is_blocked_impl(&self, imp: &ItemImpl) -> bool {
        let Type::Path(target) = imp.self_ty.as_ref() else {
            return false;
        };
        let Some(segment) = target.path.segments.last() else {
            return false;
        };
        let name = segment.ident.to_string();
        self.blocked.is_model_blocked(&name) || self.blocked.is_component_blocked(&name)
    }

    fn render(
        &self,
        unit: &str,
        header: String,
        attrs: &[syn::Attribute],
        items: TokenStream,
    ) -> Result<String> {
        let mut file: syn::File = syn::parse2(items).map_err(|e| CodegenError::Unparsable {
            unit: unit.to_string(),
            message: e.to_string(),
        })?;
        file.attrs = attrs.to_vec();
        Ok(format!("{}\n{}", header, prettyplease::unparse(&file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::{fixture, Fixture};

    const SOURCE: &str = r#"
        //! Order models.
        #![allow(clippy::new_without_default)]

        use std::sync::Arc;

        #[model(scope = "singleton")]
        pub struct Counter {
            #[observable(default = "0")]
            value: i32,
            #[command]
            increment_command: Command,
        }

        impl Counter {
            fn increment(&self) {
                self.set_value(self.value() + 1);
            }
        }

        #[component(observes = "value")]
        pub struct CounterView {
            #[allow(dead_code)]
            model: Arc<Counter>,
        }

        #[model]
        pub struct Broken {
            #[observable]
            #[trigger(nowhere)]
            value: i32,
            #[model_ref]
            missing: Arc<Nothing>,
        }

        impl Broken {
            fn helper(&self) {}
        }

        pub fn untouched() -> u32 {
            7
        }
    "#;

    fn generator(f: &Fixture) -> Generator<'_> {
        Generator::new(
            &f.declarations,
            &f.resolution,
            &f.graph,
            &f.blocked,
            CodegenOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_unit_replaces_models_and_keeps_other_items() {
        let f = fixture(SOURCE);
        let unit = generator(&f).emit_source(&f.parsed).unwrap().unwrap();
        assert_eq!(unit.path, "models.rs");
        assert!(unit.contents.starts_with("// @generated by rxgen"));
        assert!(unit.contents.contains("// Models: Counter\n"));
        assert!(unit.contents.contains("// Components: CounterView\n"));
        assert!(unit.contents.contains("#![allow(clippy::new_without_default)]"));
        assert!(unit.contents.contains("pub struct Counter {"));
        assert!(unit.contents.contains("pub fn set_value(&self, value: i32)"));
        assert!(unit.contents.contains("fn increment(&self)"));
        assert!(unit.contents.contains("pub fn untouched() -> u32"));
        assert!(unit.contents.contains("pub fn should_render(changed: &[&str]) -> bool"));
        assert!(!unit.contents.contains("#[model"));
        assert!(!unit.contents.contains("#[observable"));
    }

    #[test]
    fn test_blocked_model_and_its_impls_are_omitted() {
        let f = fixture(SOURCE);
        assert!(f.blocked.is_model_blocked("Broken"));
        let unit = generator(&f).emit_source(&f.parsed).unwrap().unwrap();
        assert!(!unit.contents.contains("Broken"));
        assert!(!unit.contents.contains("fn helper"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let f = fixture(SOURCE);
        let first = generator(&f).emit_source(&f.parsed).unwrap().unwrap();
        let second = generator(&f).emit_source(&f.parsed).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_registration_unit() {
        let f = fixture(SOURCE);
        let unit = generator(&f).emit_registration().unwrap();
        assert_eq!(unit.path, "registration.rs");
        assert!(unit.contents.contains("Registers 1 model type(s)"));
        assert!(unit.contents.contains("pub trait GeneratedModelsExt"));
        assert!(unit.contents.contains("pub fn initialize_singletons("));
        assert!(unit.contents.contains("registry.initialize::<::std::sync::Arc<crate::models::Counter>>"));
    }

    #[test]
    fn test_invalid_runtime_path() {
        let f = fixture(SOURCE);
        let options = CodegenOptions {
            runtime_path: "not a path".to_string(),
            ..CodegenOptions::default()
        };
        let err = Generator::new(&f.declarations, &f.resolution, &f.graph, &f.blocked, options)
            .err()
            .unwrap();
        assert!(matches!(err, CodegenError::InvalidSyntax { kind: "path", .. }));
    }
}
