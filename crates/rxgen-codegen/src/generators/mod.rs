//! Code template emitters.
//!
//! Every emitter is a pure function from descriptors and resolved usage sets
//! to tokens. Iteration follows declaration order or sorted sets only, so
//! identical inputs always produce identical text.

mod callback;
mod command;
mod component;
mod constructor;
mod model;
mod property;
mod registration;
mod trigger;
mod unit;

pub use callback::property_callbacks;
pub use command::{command_accessor, command_initializer, command_triggers};
pub use component::emit_component;
pub use constructor::{constructor, constructor_params, ConstructorParam};
pub use model::emit_model;
pub use property::{property_accessors, property_initializer, property_storage};
pub use registration::{emit_registration, emit_singletons, registered_models, trait_name};
pub use trigger::property_triggers;
pub use unit::{CodegenOptions, GeneratedFile, Generator};

use crate::error::{CodegenError, Result};
use crate::syntax;
use proc_macro2::TokenStream;
use quote::quote;
use rxgen_core::{
    BlockSet, CommandDescriptor, Declarations, MethodDescriptor, ModelDescriptor,
    PartialPropertyDescriptor, QualifiedName,
};
use rxgen_resolver::ModelUsage;
use syn::Path;

/// Everything an emitter needs to know about one model.
#[derive(Clone, Copy)]
pub struct ModelContext<'a> {
    pub model: &'a ModelDescriptor,
    pub usage: &'a ModelUsage,
    pub declarations: &'a Declarations,
    pub blocked: &'a BlockSet,
    /// Path of the runtime crate (`::rxgen_runtime`).
    pub runtime: &'a Path,
}

impl<'a> ModelContext<'a> {
    /// Properties that survived validation, in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &'a PartialPropertyDescriptor> + 'a {
        let (model, blocked) = (self.model, self.blocked);
        model
            .properties
            .iter()
            .filter(move |p| !blocked.is_member_blocked(&model.name, &p.name))
    }

    /// Commands that survived validation, in declaration order.
    pub fn commands(&self) -> impl Iterator<Item = &'a CommandDescriptor> + 'a {
        let (model, blocked) = (self.model, self.blocked);
        model
            .commands
            .iter()
            .filter(move |c| !blocked.is_member_blocked(&model.name, &c.name))
    }

    /// Names of every emitted member field, in declaration order.
    pub fn member_names(&self) -> Vec<&'a str> {
        let mut members: Vec<(usize, &'a str)> = self
            .properties()
            .map(|p| (p.position, p.name.as_str()))
            .chain(self.commands().map(|c| (c.position, c.name.as_str())))
            .chain(
                self.model
                    .references
                    .iter()
                    .map(|r| (r.position, r.name.as_str())),
            )
            .chain(
                self.model
                    .services
                    .iter()
                    .map(|s| (s.position, s.name.as_str())),
            )
            .collect();
        members.sort_by_key(|(position, _)| *position);
        members.into_iter().map(|(_, name)| name).collect()
    }

    /// A hand-written method of the model or one of its bases.
    pub fn method(&self, name: &str) -> Result<&'a MethodDescriptor> {
        std::iter::once(self.model)
            .chain(self.declarations.base_chain(self.model))
            .find_map(|m| m.method(name))
            .ok_or_else(|| CodegenError::MissingMethod {
                model: self.model.name.clone(),
                method: name.to_string(),
            })
    }

    /// Qualified names published by the model, without blocked members.
    pub fn published(&self) -> Vec<String> {
        let omitted: Vec<QualifiedName> = self
            .model
            .properties
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.model.commands.iter().map(|c| c.name.as_str()))
            .filter(|name| self.blocked.is_member_blocked(&self.model.name, name))
            .map(QualifiedName::local)
            .collect();
        self.usage
            .published
            .iter()
            .filter(|name| !omitted.contains(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// Type path of a declared model.
    pub fn model_path(&self, name: &str) -> Result<Path> {
        let model = self
            .declarations
            .model(name)
            .ok_or_else(|| CodegenError::UnknownModel(name.to_string()))?;
        syntax::path(&model.type_path())
    }

    /// `Model::member` label used in error messages.
    pub(crate) fn owner(&self, member: &str) -> String {
        format!("{}::{}", self.model.name, member)
    }
}

/// `&["Model.A", "Model.B"]` for a set of names.
pub(crate) fn name_list<I, S>(names: I) -> TokenStream
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
    quote! { &[#(#names),*] }
}

#[cfg(test)]
pub(crate) mod test_support {
    use rxgen_analyzer::{analyze, ParsedSource, SourceFile, parse_source};
    use rxgen_core::{BlockSet, Declarations};
    use rxgen_resolver::{DependencyGraph, PropertyUsageResolver, Resolution};
    use rxgen_rules::{DiagnosticEngine, RuleContext};

    /// A declaration file run through analysis, validation and resolution.
    pub(crate) struct Fixture {
        pub parsed: ParsedSource,
        pub declarations: Declarations,
        pub graph: DependencyGraph,
        pub blocked: BlockSet,
        pub resolution: Resolution,
        pub runtime: syn::Path,
    }

    pub(crate) fn fixture(text: &str) -> Fixture {
        let source = SourceFile::new("src/models.rs", "crate::models", text);
        let analysis = analyze(std::slice::from_ref(&source));
        let graph = DependencyGraph::build(&analysis.declarations);
        let report = DiagnosticEngine::new().evaluate(RuleContext {
            declarations: &analysis.declarations,
            graph: &graph,
            blocked: &analysis.blocked,
        });
        let resolution = PropertyUsageResolver::new(&analysis.declarations).resolve();
        Fixture {
            parsed: parse_source(&source).unwrap(),
            declarations: analysis.declarations,
            graph,
            blocked: report.blocked,
            resolution,
            runtime: syn::parse_str("::rxgen_runtime").unwrap(),
        }
    }

    impl Fixture {
        pub(crate) fn context(&self, model: &str) -> super::ModelContext<'_> {
            super::ModelContext {
                model: self.declarations.model(model).unwrap(),
                usage: self.resolution.model(model).unwrap(),
                declarations: &self.declarations,
                blocked: &self.blocked,
                runtime: &self.runtime,
            }
        }
    }

    /// Compact token text for `contains` assertions.
    pub(crate) fn text(tokens: &proc_macro2::TokenStream) -> String {
        tokens.to_string()
    }
}
