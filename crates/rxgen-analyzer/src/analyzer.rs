//! Multi-pass analysis of parsed declaration files.

use crate::attrs::{self, attribute_name, doc_lines, is_generator_attribute};
use crate::body::analyze_block;
use crate::members::{self, model_name_of, render_type, Member};
use crate::source::{span_of, ParsedSource};
use crate::usage::parse_property_paths;
use rxgen_core::{
    AccessSet, AnalyzeError, BlockSet, ComponentDescriptor, Declarations, DiagnosticBag,
    MethodDescriptor, ModelDescriptor, ParamDescriptor, Scope, Unit, Visibility,
};
use std::collections::{BTreeMap, BTreeSet};
use syn::{Fields, ImplItem, Item, ItemStruct, Pat, ReturnType, Type};
use tracing::debug;

/// Field names owned by the generated model struct.
pub const RESERVED_FIELDS: &[&str] = &["core", "subscriptions", "this", "base"];

/// Options controlling analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Scope applied to models that do not declare one.
    pub default_scope: Scope,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            default_scope: Scope::Singleton,
        }
    }
}

/// Result of analyzing one compilation.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub declarations: Declarations,
    pub diagnostics: DiagnosticBag,
    /// Units the analyzer refused to describe.
    pub blocked: BlockSet,
}

/// Extracts descriptors from parsed declaration files.
pub struct Analyzer<'a> {
    sources: &'a [ParsedSource],
    options: AnalyzerOptions,
    diagnostics: DiagnosticBag,
    blocked: BlockSet,
}

impl<'a> Analyzer<'a> {
    pub fn new(sources: &'a [ParsedSource], options: AnalyzerOptions) -> Self {
        Self {
            sources,
            options,
            diagnostics: DiagnosticBag::new(),
            blocked: BlockSet::new(),
        }
    }

    /// Run every pass and return the descriptors with their diagnostics.
    pub fn analyze(mut self) -> Analysis {
        // Pass 1: names of every declared model and component
        let (models, components) = self.collect_names();

        // Pass 2: hand-written methods, keyed by self type
        let methods = self.collect_methods(&models, &components);

        // Pass 3: descriptors
        let mut declarations = Declarations::new();
        for source in self.sources {
            for item in &source.syntax.items {
                let Item::Struct(item) = item else {
                    continue;
                };
                let name = item.ident.to_string();
                let methods = methods.get(&name).cloned().unwrap_or_default();
                if attrs::find(&item.attrs, "model").is_some() {
                    match self.model(source, item, methods, &models) {
                        Ok(model) => declarations.models.push(model),
                        Err(err) => self.reject(source, Unit::Model(name), err),
                    }
                } else if attrs::find(&item.attrs, "component").is_some() {
                    match self.component(source, item, &methods, &models) {
                        Ok(component) => declarations.components.push(component),
                        Err(err) => self.reject(source, Unit::Component(name), err),
                    }
                } else if let Some(attr) = stray_member_attribute(item) {
                    let err = AnalyzeError::MissingModelAttribute {
                        name: name.clone(),
                        attribute: attr,
                        span: span_of(item),
                    };
                    self.reject(source, Unit::Model(name), err);
                }
            }
        }

        // Pass 4: cross-model links
        link_references(&mut declarations);

        debug!(
            models = declarations.models.len(),
            components = declarations.components.len(),
            diagnostics = self.diagnostics.len(),
            "analysis complete"
        );

        Analysis {
            declarations,
            diagnostics: self.diagnostics,
            blocked: self.blocked,
        }
    }

    fn reject(&mut self, source: &ParsedSource, unit: Unit, err: AnalyzeError) {
        debug!(%unit, error = %err, "unit rejected by analysis");
        self.diagnostics.push(err.into_diagnostic(&source.file.path));
        self.blocked.block(unit);
    }

    fn collect_names(&mut self) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut models = BTreeSet::new();
        let mut components = BTreeSet::new();
        for source in self.sources {
            for item in &source.syntax.items {
                let (ident, attrs, is_struct) = match item {
                    Item::Struct(s) => (&s.ident, &s.attrs, true),
                    Item::Enum(e) => (&e.ident, &e.attrs, false),
                    Item::Union(u) => (&u.ident, &u.attrs, false),
                    _ => continue,
                };
                if attrs::find(attrs, "model").is_some() {
                    if is_struct {
                        models.insert(ident.to_string());
                    } else {
                        let err = AnalyzeError::InvalidModelShape {
                            message: format!("#[model] on `{}` which is not a struct", ident),
                            span: span_of(item),
                        };
                        self.reject(source, Unit::Model(ident.to_string()), err);
                    }
                } else if is_struct && attrs::find(attrs, "component").is_some() {
                    components.insert(ident.to_string());
                }
            }
        }
        (models, components)
    }

    fn collect_methods(
        &self,
        models: &BTreeSet<String>,
        components: &BTreeSet<String>,
    ) -> BTreeMap<String, Vec<MethodDescriptor>> {
        let mut methods: BTreeMap<String, Vec<MethodDescriptor>> = BTreeMap::new();
        for source in self.sources {
            for item in &source.syntax.items {
                let Item::Impl(block) = item else {
                    continue;
                };
                let Some(owner) = model_name_of(&block.self_ty) else {
                    continue;
                };
                if !models.contains(&owner) && !components.contains(&owner) {
                    continue;
                }
                for impl_item in &block.items {
                    if let ImplItem::Fn(f) = impl_item {
                        methods.entry(owner.clone()).or_default().push(method(f));
                    }
                }
            }
        }
        methods
    }

    fn model(
        &self,
        source: &ParsedSource,
        item: &ItemStruct,
        methods: Vec<MethodDescriptor>,
        models: &BTreeSet<String>,
    ) -> Result<ModelDescriptor, AnalyzeError> {
        let name = item.ident.to_string();
        if !item.generics.params.is_empty() {
            return Err(AnalyzeError::InvalidModelShape {
                message: format!("model `{}` must not be generic", name),
                span: span_of(&item.generics),
            });
        }
        let fields: Vec<&syn::Field> = match &item.fields {
            Fields::Named(named) => named.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(AnalyzeError::InvalidModelShape {
                    message: format!("model `{}` must use named fields", name),
                    span: span_of(item),
                })
            }
        };
        // Checked by the caller.
        let attr = attrs::find(&item.attrs, "model")
            .map(attrs::parse_model)
            .transpose()?
            .unwrap_or_default();

        let mut model = ModelDescriptor {
            name,
            module: source.file.module.clone(),
            file: source.file.path.clone(),
            visibility: visibility(&item.vis),
            scope: attr.scope.unwrap_or(self.options.default_scope),
            scope_explicit: attr.scope.is_some(),
            base_model: attr.base,
            implements: attr.implements,
            include_referenced_triggers: attr.include_referenced_triggers,
            properties: Vec::new(),
            commands: Vec::new(),
            references: Vec::new(),
            services: Vec::new(),
            methods,
            docs: doc_lines(&item.attrs),
            span: span_of(&item.ident),
        };

        for (position, field) in fields.into_iter().enumerate() {
            if let Some(ident) = field.ident.as_ref().filter(|i| RESERVED_FIELDS.contains(&i.to_string().as_str())) {
                return Err(AnalyzeError::InvalidModelShape {
                    message: format!(
                        "field `{}` of model `{}` collides with a generated field",
                        ident, model.name
                    ),
                    span: span_of(ident),
                });
            }
            match members::classify(field, position, models)? {
                Member::Property(p) => model.properties.push(p),
                Member::Command(c) => model.commands.push(c),
                Member::Reference(r) => model.references.push(r),
                Member::Service(s) => model.services.push(s),
            }
        }

        // A cancellation token on the execute method makes the command cancelable.
        for command in &mut model.commands {
            if let Some(execute) = model.methods.iter().find(|m| m.name == command.execute) {
                command.shape.cancelable |= execute.takes_cancellation();
            }
        }

        debug!(
            model = %model.name,
            properties = model.properties.len(),
            commands = model.commands.len(),
            references = model.references.len(),
            services = model.services.len(),
            "model analyzed"
        );
        Ok(model)
    }

    fn component(
        &self,
        source: &ParsedSource,
        item: &ItemStruct,
        methods: &[MethodDescriptor],
        models: &BTreeSet<String>,
    ) -> Result<ComponentDescriptor, AnalyzeError> {
        let name = item.ident.to_string();
        let attr = attrs::find(&item.attrs, "component")
            .map(attrs::parse_component)
            .transpose()?
            .unwrap_or_default();

        let Fields::Named(named) = &item.fields else {
            return Err(AnalyzeError::InvalidModelShape {
                message: format!("component `{}` must use named fields", name),
                span: span_of(item),
            });
        };

        // The model field is named explicitly or found by its type.
        let field = match &attr.field {
            Some(field) => named
                .named
                .iter()
                .find(|f| f.ident.as_ref().map_or(false, |i| i == field)),
            None => named.named.iter().find(|f| {
                model_name_of(&f.ty).map_or(false, |m| models.contains(&m))
                    || f.ident.as_ref().map_or(false, |i| i == "model")
            }),
        };
        let Some(field) = field else {
            return Err(AnalyzeError::InvalidModelShape {
                message: format!("component `{}` has no model field", name),
                span: span_of(item),
            });
        };
        let model = match attr.model {
            Some(model) => model,
            None => model_name_of(&field.ty).ok_or_else(|| AnalyzeError::InvalidModelShape {
                message: format!(
                    "cannot infer the model of component `{}` from `{}`",
                    name,
                    render_type(&field.ty)
                ),
                span: span_of(field),
            })?,
        };

        let observes = match &attr.observes {
            Some(text) => parse_property_paths(text).map_err(|message| {
                AnalyzeError::InvalidAttribute {
                    attribute: "component".to_string(),
                    message,
                    span: span_of(item),
                }
            })?,
            None => Vec::new(),
        };

        let mut access = AccessSet::new();
        for method in methods {
            access.merge(&method.access);
        }

        Ok(ComponentDescriptor {
            name,
            module: source.file.module.clone(),
            file: source.file.path.clone(),
            model,
            model_field: field
                .ident
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            observes,
            access,
            span: span_of(&item.ident),
        })
    }
}

/// First generator member attribute on a struct that is not a model.
fn stray_member_attribute(item: &ItemStruct) -> Option<String> {
    item.fields
        .iter()
        .flat_map(|f| f.attrs.iter())
        .find(|a| is_generator_attribute(a))
        .and_then(attribute_name)
}

fn visibility(vis: &syn::Visibility) -> Visibility {
    match vis {
        syn::Visibility::Public(_) => Visibility::Public,
        syn::Visibility::Restricted(r) if r.path.is_ident("crate") => Visibility::Crate,
        syn::Visibility::Restricted(_) => Visibility::Restricted,
        syn::Visibility::Inherited => Visibility::Private,
    }
}

fn method(f: &syn::ImplItemFn) -> MethodDescriptor {
    let params = f
        .sig
        .inputs
        .iter()
        .filter_map(|input| match input {
            syn::FnArg::Typed(typed) => Some(ParamDescriptor {
                name: match typed.pat.as_ref() {
                    Pat::Ident(ident) => ident.ident.to_string(),
                    _ => "_".to_string(),
                },
                ty: render_type(&typed.ty),
            }),
            syn::FnArg::Receiver(_) => None,
        })
        .collect();

    MethodDescriptor {
        name: f.sig.ident.to_string(),
        is_async: f.sig.asyncness.is_some(),
        has_receiver: f.sig.receiver().is_some(),
        params,
        return_type: match &f.sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => match ty.as_ref() {
                Type::Tuple(tuple) if tuple.elems.is_empty() => None,
                ty => Some(render_type(ty)),
            },
        },
        access: analyze_block(&f.block),
        span: span_of(&f.sig.ident),
    }
}

/// Fill in the used properties of every model reference.
///
/// A property counts as used when any hand-written method reads it through
/// the reference or a command trigger names it.
fn link_references(declarations: &mut Declarations) {
    let mut published: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for model in &declarations.models {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for owner in std::iter::once(model).chain(declarations.base_chain(model)) {
            names.extend(owner.properties.iter().map(|p| p.name.clone()));
        }
        published.insert(model.name.clone(), names);
    }

    for model in &mut declarations.models {
        let access = model.all_access();
        let triggered: Vec<(String, String)> = model
            .commands
            .iter()
            .flat_map(|c| c.triggers.iter())
            .filter_map(|t| {
                t.path
                    .reference
                    .clone()
                    .map(|r| (r, t.path.property.clone()))
            })
            .collect();

        for reference in &mut model.references {
            let Some(available) = published.get(&reference.model) else {
                continue;
            };
            let mut used: BTreeSet<String> = access
                .reads_through(&reference.name)
                .intersection(available)
                .cloned()
                .collect();
            used.extend(
                triggered
                    .iter()
                    .filter(|(r, p)| *r == reference.name && available.contains(p))
                    .map(|(_, p)| p.clone()),
            );
            reference.used_properties = used;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{parse_source, SourceFile};

    fn analyze(text: &str) -> Analysis {
        let source = SourceFile::new("models.rs", "crate::models", text);
        let parsed = vec![parse_source(&source).unwrap()];
        Analyzer::new(&parsed, AnalyzerOptions::default()).analyze()
    }

    const ORDER: &str = r#"
        #[model(scope = "singleton")]
        pub struct Customer {
            #[observable]
            name: String,
            #[observable]
            email: String,
        }

        #[model]
        pub struct Order {
            #[observable]
            status: String,
            customer: Arc<Customer>,
            logger: Arc<dyn Logger>,
            #[command(execute = "save", cancelable)]
            save_command: Command,
        }

        impl Order {
            fn save(&self) {
                let label = self.customer().name();
                self.set_status(label);
            }
        }
    "#;

    #[test]
    fn test_models_and_members() {
        let analysis = analyze(ORDER);
        assert!(analysis.diagnostics.is_empty());

        let order = analysis.declarations.model("Order").unwrap();
        assert_eq!(order.scope, Scope::Singleton);
        assert!(!order.scope_explicit);
        assert_eq!(order.properties.len(), 1);
        assert_eq!(order.references[0].model, "Customer");
        assert_eq!(order.services[0].name, "logger");
        assert_eq!(order.commands[0].execute, "save");
        assert!(order.method("save").is_some());

        let names: Vec<_> = order.dependencies().iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["customer", "logger"]);
    }

    #[test]
    fn test_used_properties_only_include_reads() {
        let analysis = analyze(ORDER);
        let order = analysis.declarations.model("Order").unwrap();
        let used = &order.references[0].used_properties;
        assert_eq!(used.len(), 1);
        assert!(used.contains("name"));
    }

    #[test]
    fn test_stray_member_attribute() {
        let analysis = analyze(
            r#"
            pub struct Plain {
                #[observable]
                value: i32,
            }
            "#,
        );
        assert_eq!(analysis.diagnostics.with_code("RX002").count(), 1);
        assert!(analysis.blocked.is_model_blocked("Plain"));
    }

    #[test]
    fn test_invalid_shapes_are_isolated() {
        let analysis = analyze(
            r#"
            #[model]
            pub enum NotAStruct { A }

            #[model]
            pub struct Generic<T> { value: T }

            #[model]
            pub struct Fine {
                #[observable]
                value: i32,
            }
            "#,
        );
        assert_eq!(analysis.diagnostics.with_code("RX003").count(), 2);
        assert!(analysis.blocked.is_model_blocked("NotAStruct"));
        assert!(analysis.blocked.is_model_blocked("Generic"));
        assert!(analysis.declarations.model("Fine").is_some());
    }

    #[test]
    fn test_reserved_field_name() {
        let analysis = analyze(
            r#"
            #[model]
            pub struct Clash {
                #[observable]
                core: i32,
            }
            "#,
        );
        let diag = analysis.diagnostics.with_code("RX003").next().unwrap();
        assert!(diag.message.contains("collides with a generated field"));
        assert!(analysis.blocked.is_model_blocked("Clash"));
    }

    #[test]
    fn test_component_usage() {
        let analysis = analyze(
            r#"
            #[model]
            pub struct Counter {
                #[observable]
                value: i32,
            }

            #[component(observes = "value")]
            pub struct CounterView {
                model: Arc<Counter>,
            }

            impl CounterView {
                fn render(&self) -> String {
                    format!("{}", self.model.value())
                }
            }
            "#,
        );
        let view = analysis.declarations.component("CounterView").unwrap();
        assert_eq!(view.model, "Counter");
        assert_eq!(view.model_field, "model");
        assert_eq!(view.observes.len(), 1);
        assert!(view.access.reads_through("model").contains("value"));
    }
}
