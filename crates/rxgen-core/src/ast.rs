//! Descriptor records produced by the analyzer.
//!
//! Descriptors are plain, immutable data. Every generation pass builds a fresh
//! set from the declaration sources; nothing here is shared across passes.

use crate::types::{
    is_observable_collection, normalize_type, AccessSet, PropertyPath, QualifiedName, Scope,
    SourceLocation, Span, Visibility,
};
use std::collections::BTreeSet;

/// Everything the analyzer extracted from one compilation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Declarations {
    pub models: Vec<ModelDescriptor>,
    pub components: Vec<ComponentDescriptor>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a model by its simple name.
    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Look up a component by its simple name.
    pub fn component(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Follow the base chain of a model to its root.
    ///
    /// Returns `None` when the chain names an undeclared model or loops.
    pub fn root_of<'a>(&'a self, model: &'a ModelDescriptor) -> Option<&'a ModelDescriptor> {
        let mut current = model;
        let mut seen = BTreeSet::new();
        while let Some(base) = &current.base_model {
            if !seen.insert(current.name.as_str()) {
                return None;
            }
            current = self.model(base)?;
        }
        Some(current)
    }

    /// Chain of bases from the direct base up to the root.
    pub fn base_chain<'a>(&'a self, model: &'a ModelDescriptor) -> Vec<&'a ModelDescriptor> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        seen.insert(model.name.as_str());
        let mut current = model;
        while let Some(base) = current.base_model.as_deref().and_then(|b| self.model(b)) {
            if !seen.insert(base.name.as_str()) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }
}

/// One declared observable model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelDescriptor {
    /// Simple type name.
    pub name: String,
    /// Module path the generated unit is included at (e.g. `crate::models::order`).
    pub module: String,
    /// Declaration file.
    pub file: String,
    pub visibility: Visibility,
    pub scope: Scope,
    /// Whether the scope was written out rather than defaulted.
    pub scope_explicit: bool,
    /// Base model when this model is derived.
    pub base_model: Option<String>,
    /// Trait objects this model is registered as (`dyn OrderApi`).
    pub implements: Vec<String>,
    /// Observe trigger-marked properties of referenced models even when never read.
    pub include_referenced_triggers: bool,
    pub properties: Vec<PartialPropertyDescriptor>,
    pub commands: Vec<CommandDescriptor>,
    pub references: Vec<ModelReferenceDescriptor>,
    pub services: Vec<InjectedServiceDescriptor>,
    /// Hand-written methods found in inherent impls of this model.
    pub methods: Vec<MethodDescriptor>,
    pub docs: Vec<String>,
    pub span: Span,
}

impl ModelDescriptor {
    /// Fully qualified Rust path of the model type.
    pub fn type_path(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    pub fn is_derived(&self) -> bool {
        self.base_model.is_some()
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.span)
    }

    pub fn location_of(&self, span: Span) -> SourceLocation {
        SourceLocation::new(self.file.clone(), span)
    }

    pub fn property(&self, name: &str) -> Option<&PartialPropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn command(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn reference(&self, name: &str) -> Option<&ModelReferenceDescriptor> {
        self.references.iter().find(|r| r.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether any property carries a trigger or callback hook.
    pub fn has_trigger_properties(&self) -> bool {
        self.properties.iter().any(|p| p.has_hooks())
    }

    /// Constructor dependencies (references and services) in declaration order.
    pub fn dependencies(&self) -> Vec<Dependency<'_>> {
        let mut deps: Vec<Dependency<'_>> = self
            .references
            .iter()
            .map(Dependency::Reference)
            .chain(self.services.iter().map(Dependency::Service))
            .collect();
        deps.sort_by_key(|d| d.position());
        deps
    }

    /// Every method reachable from `start` through direct `self` calls, `start` included.
    pub fn reachable_methods(&self, start: &str) -> Vec<&MethodDescriptor> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![start.to_string()];
        let mut reached = Vec::new();
        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(method) = self.method(&name) {
                stack.extend(method.access.calls.iter().cloned());
                reached.push(method);
            }
        }
        reached
    }

    /// Combined access set of a method and everything it calls on `self`.
    pub fn transitive_access(&self, start: &str) -> AccessSet {
        let mut access = AccessSet::new();
        for method in self.reachable_methods(start) {
            access.merge(&method.access);
        }
        access
    }

    /// Combined access set of all hand-written methods.
    pub fn all_access(&self) -> AccessSet {
        let mut access = AccessSet::new();
        for method in &self.methods {
            access.merge(&method.access);
        }
        access
    }
}

/// A constructor dependency.
#[derive(Debug, Clone, Copy)]
pub enum Dependency<'a> {
    Reference(&'a ModelReferenceDescriptor),
    Service(&'a InjectedServiceDescriptor),
}

impl<'a> Dependency<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Self::Reference(r) => &r.name,
            Self::Service(s) => &s.name,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            Self::Reference(r) => r.position,
            Self::Service(s) => s.position,
        }
    }
}

/// Mutable or init-only accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessorKind {
    Mutable,
    InitOnly,
}

/// Whether assigning an equal value still notifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EqualityPolicy {
    /// Skip the notification when the new value equals the old one.
    SuppressUnchanged,
    /// Notify on every assignment.
    Always,
}

/// Synchronous or asynchronous hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerMode {
    Sync,
    Async,
}

/// A method invoked when a property changes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerDescriptor {
    pub method: String,
    pub mode: TriggerMode,
    /// Optional `fn(&self) -> bool` consulted before invoking.
    pub guard: Option<String>,
    pub span: Span,
}

/// One observable property.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartialPropertyDescriptor {
    pub name: String,
    /// Declared type, rendered.
    pub ty: String,
    pub accessor: AccessorKind,
    pub equality: EqualityPolicy,
    pub triggers: Vec<TriggerDescriptor>,
    /// Generate a synchronous callback registration.
    pub callback: bool,
    /// Generate an asynchronous callback registration.
    pub callback_async: bool,
    /// Batch groups the notification is deferred into while suspended.
    pub batch_groups: Vec<String>,
    /// Initial value expression, rendered.
    pub default: Option<String>,
    /// Field was declared `pub`.
    pub public_field: bool,
    pub docs: Vec<String>,
    /// Field index inside the declaration.
    pub position: usize,
    pub span: Span,
}

impl PartialPropertyDescriptor {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::local(&self.name)
    }

    pub fn is_collection(&self) -> bool {
        is_observable_collection(&self.ty)
    }

    pub fn is_init_only(&self) -> bool {
        self.accessor == AccessorKind::InitOnly
    }

    /// Init-only properties that can never publish a change.
    pub fn is_inert(&self) -> bool {
        self.is_init_only() && !self.is_collection()
    }

    pub fn has_hooks(&self) -> bool {
        !self.triggers.is_empty() || self.callback || self.callback_async
    }
}

/// Shape of a command in the {sync|async} x {return} x {parameter} x {cancel} matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandShape {
    pub asynchronous: bool,
    /// Parameter type, rendered.
    pub parameter: Option<String>,
    /// Return type, rendered.
    pub returns: Option<String>,
    pub cancelable: bool,
}

impl CommandShape {
    /// Index in the 16-cell command matrix.
    pub fn matrix_index(&self) -> usize {
        (self.asynchronous as usize) << 3
            | (self.returns.is_some() as usize) << 2
            | (self.parameter.is_some() as usize) << 1
            | self.cancelable as usize
    }

    /// Whether `ty` matches the declared parameter type.
    pub fn accepts(&self, ty: &str) -> bool {
        self.parameter
            .as_deref()
            .map(|p| normalize_type(p) == normalize_type(ty))
            .unwrap_or(false)
    }
}

/// Binding from a property change to automatic command execution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandTrigger {
    pub path: PropertyPath,
    pub span: Span,
}

/// One user-invocable action.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandDescriptor {
    /// Field name (`save_command`).
    pub name: String,
    /// Declared type, rendered.
    pub ty: String,
    pub shape: CommandShape,
    /// Hand-written method run on execution.
    pub execute: String,
    /// Optional guard method.
    pub can_execute: Option<String>,
    pub triggers: Vec<CommandTrigger>,
    /// Classified from the field type rather than an attribute.
    pub by_convention: bool,
    pub docs: Vec<String>,
    pub position: usize,
    pub span: Span,
}

impl CommandDescriptor {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::local(&self.name)
    }
}

/// A dependency from one model onto another model instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelReferenceDescriptor {
    /// Local field name.
    pub name: String,
    /// Referenced model's simple name.
    pub model: String,
    /// Properties of the referenced model read anywhere in this model.
    pub used_properties: BTreeSet<String>,
    /// Declared with `#[model_ref]` rather than recognised by type.
    pub explicit: bool,
    pub position: usize,
    pub span: Span,
}

/// A constructor parameter resolved from the container.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InjectedServiceDescriptor {
    pub name: String,
    /// Declared field type, rendered (`Arc<dyn Logger>`).
    pub ty: String,
    /// Declared with `#[inject]`.
    pub explicit: bool,
    pub position: usize,
    pub span: Span,
}

/// A parameter of a hand-written method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamDescriptor {
    pub name: String,
    pub ty: String,
}

impl ParamDescriptor {
    pub fn is_cancellation_token(&self) -> bool {
        crate::types::type_head(&self.ty) == "CancellationToken"
    }
}

/// Summary of a hand-written method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodDescriptor {
    pub name: String,
    pub is_async: bool,
    /// Takes `&self`.
    pub has_receiver: bool,
    pub params: Vec<ParamDescriptor>,
    /// Declared return type; `None` for unit.
    pub return_type: Option<String>,
    pub access: AccessSet,
    pub span: Span,
}

impl MethodDescriptor {
    /// Parameters other than a cancellation token.
    pub fn value_params(&self) -> Vec<&ParamDescriptor> {
        self.params
            .iter()
            .filter(|p| !p.is_cancellation_token())
            .collect()
    }

    pub fn takes_cancellation(&self) -> bool {
        self.params.iter().any(ParamDescriptor::is_cancellation_token)
    }

    pub fn returns(&self, ty: Option<&str>) -> bool {
        let declared = self.return_type.as_deref().map(normalize_type);
        let expected = ty.map(normalize_type);
        let unit = Some("()".to_string());
        let declared = if declared == unit { None } else { declared };
        let expected = if expected == unit { None } else { expected };
        declared == expected
    }
}

/// A UI component consuming one model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentDescriptor {
    pub name: String,
    pub module: String,
    pub file: String,
    /// Consumed model's simple name.
    pub model: String,
    /// Field holding the model (`model`).
    pub model_field: String,
    /// Usage declared explicitly in the attribute.
    pub observes: Vec<PropertyPath>,
    /// Union of all hand-written method bodies of the component.
    pub access: AccessSet,
    pub span: Span,
}

impl ComponentDescriptor {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemberPath;

    fn method(name: &str, calls: &[&str], writes: &[&str]) -> MethodDescriptor {
        let mut access = AccessSet::new();
        access.calls = calls.iter().map(|c| c.to_string()).collect();
        access.writes = writes.iter().map(|w| MemberPath::new([*w])).collect();
        MethodDescriptor {
            name: name.to_string(),
            is_async: false,
            has_receiver: true,
            params: vec![],
            return_type: None,
            access,
            span: Span::default(),
        }
    }

    fn model(name: &str, base: Option<&str>) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            module: "crate::models".to_string(),
            file: "models.rs".to_string(),
            visibility: Visibility::Public,
            scope: Scope::Singleton,
            scope_explicit: true,
            base_model: base.map(str::to_string),
            implements: vec![],
            include_referenced_triggers: false,
            properties: vec![],
            commands: vec![],
            references: vec![],
            services: vec![],
            methods: vec![],
            docs: vec![],
            span: Span::default(),
        }
    }

    #[test]
    fn test_transitive_access_follows_self_calls() {
        let mut m = model("Order", None);
        m.methods = vec![
            method("save", &["persist"], &[]),
            method("persist", &["save"], &["set_status"]),
            method("unrelated", &[], &["set_total"]),
        ];

        let written = m.transitive_access("save").written_members();
        assert!(written.contains("status"));
        assert!(!written.contains("total"));
    }

    #[test]
    fn test_root_of_follows_base_chain() {
        let mut decls = Declarations::new();
        decls.models.push(model("Vehicle", None));
        decls.models.push(model("Car", Some("Vehicle")));
        decls.models.push(model("SportsCar", Some("Car")));

        let sports = decls.model("SportsCar").unwrap();
        assert_eq!(decls.root_of(sports).unwrap().name, "Vehicle");
        assert_eq!(decls.base_chain(sports).len(), 2);
    }

    #[test]
    fn test_root_of_detects_loops() {
        let mut decls = Declarations::new();
        decls.models.push(model("A", Some("B")));
        decls.models.push(model("B", Some("A")));

        let a = decls.model("A").unwrap();
        assert!(decls.root_of(a).is_none());
    }

    #[test]
    fn test_command_matrix_index() {
        let shape = CommandShape {
            asynchronous: true,
            parameter: Some("u32".to_string()),
            returns: None,
            cancelable: true,
        };
        assert_eq!(shape.matrix_index(), 0b1011);
        assert!(shape.accepts("u32"));
        assert!(!shape.accepts("String"));
    }

    #[test]
    fn test_method_returns_treats_unit_as_none() {
        let mut m = method("run", &[], &[]);
        assert!(m.returns(None));
        assert!(m.returns(Some("()")));
        m.return_type = Some("Vec < u8 >".to_string());
        assert!(m.returns(Some("Vec<u8>")));
        assert!(!m.returns(None));
    }
}
