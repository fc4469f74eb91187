//! Property-usage resolution.
//!
//! Computes the qualified names each consuming unit observes. A local
//! property is `Model.Prop`; a property reached through one reference is
//! `Model.Ref.Prop`. Chained references are not followed: a model observes
//! another model's properties only through its own direct references.

use indexmap::IndexMap;
use rxgen_core::{
    CommandDescriptor, ComponentDescriptor, Declarations, ModelDescriptor,
    ModelReferenceDescriptor, PropertyPath, QualifiedName,
};
use std::collections::BTreeSet;

/// How a model observes one of its references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceUsage {
    /// Local field name of the reference.
    pub reference: String,
    /// Referenced model.
    pub model: String,
    /// Property names of the referenced model that are observed.
    pub properties: BTreeSet<String>,
    /// Names as the referenced model publishes them (`Model.Name`).
    pub observed: BTreeSet<QualifiedName>,
    /// Names republished under the local prefix (`Model.Customer.Name`).
    pub republished: BTreeSet<QualifiedName>,
}

/// Names a command reacts to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandUsage {
    /// Changes that may flip the guard.
    pub guard: BTreeSet<QualifiedName>,
    /// Changes that execute the command.
    pub triggers: BTreeSet<QualifiedName>,
}

/// Everything resolved for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelUsage {
    /// Every name the model publishes, including inherited and republished ones.
    pub published: BTreeSet<QualifiedName>,
    pub references: Vec<ReferenceUsage>,
    pub commands: IndexMap<String, CommandUsage>,
}

impl ModelUsage {
    pub fn reference(&self, name: &str) -> Option<&ReferenceUsage> {
        self.references.iter().find(|r| r.reference == name)
    }
}

/// Names a component re-renders on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentUsage {
    pub observed: BTreeSet<QualifiedName>,
}

/// Resolution for a whole compilation, keyed by model or component name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub models: IndexMap<String, ModelUsage>,
    pub components: IndexMap<String, ComponentUsage>,
}

impl Resolution {
    pub fn model(&self, name: &str) -> Option<&ModelUsage> {
        self.models.get(name)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentUsage> {
        self.components.get(name)
    }
}

/// Resolves observed property sets against a set of declarations.
pub struct PropertyUsageResolver<'a> {
    declarations: &'a Declarations,
}

impl<'a> PropertyUsageResolver<'a> {
    pub fn new(declarations: &'a Declarations) -> Self {
        Self { declarations }
    }

    /// Resolve every model and component.
    pub fn resolve(&self) -> Resolution {
        let mut resolution = Resolution::default();
        for model in &self.declarations.models {
            resolution
                .models
                .insert(model.name.clone(), self.resolve_model(model));
        }
        for component in &self.declarations.components {
            resolution
                .components
                .insert(component.name.clone(), self.resolve_component(component));
        }
        resolution
    }

    pub fn resolve_model(&self, model: &ModelDescriptor) -> ModelUsage {
        let references: Vec<ReferenceUsage> = model
            .references
            .iter()
            .map(|r| self.reference_usage(model, r))
            .collect();

        let mut published = self.local_names(model);
        for base in self.declarations.base_chain(model) {
            published.extend(self.local_names(base));
        }
        for usage in &references {
            published.extend(usage.republished.iter().cloned());
        }

        let commands = model
            .commands
            .iter()
            .map(|c| (c.name.clone(), self.command_usage(model, c)))
            .collect();

        ModelUsage {
            published,
            references,
            commands,
        }
    }

    /// Names a model publishes for its own members.
    ///
    /// Init-only properties that are not collections never change and are left out.
    fn local_names(&self, model: &ModelDescriptor) -> BTreeSet<QualifiedName> {
        model
            .properties
            .iter()
            .filter(|p| !p.is_inert())
            .map(|p| p.qualified_name())
            .chain(model.commands.iter().map(CommandDescriptor::qualified_name))
            .collect()
    }

    /// Properties of the referenced model (and its bases) with trigger or callback hooks.
    fn hooked_properties(&self, model: &ModelDescriptor) -> BTreeSet<String> {
        std::iter::once(model)
            .chain(self.declarations.base_chain(model))
            .flat_map(|m| m.properties.iter())
            .filter(|p| p.has_hooks())
            .map(|p| p.name.clone())
            .collect()
    }

    /// Observation set of one reference.
    pub fn reference_usage(
        &self,
        model: &ModelDescriptor,
        reference: &ModelReferenceDescriptor,
    ) -> ReferenceUsage {
        let mut properties = reference.used_properties.clone();
        properties.extend(self.component_reads_through(model, &reference.name));
        if model.include_referenced_triggers {
            if let Some(target) = self.declarations.model(&reference.model) {
                properties.extend(self.hooked_properties(target));
            }
        }

        ReferenceUsage {
            reference: reference.name.clone(),
            model: reference.model.clone(),
            observed: properties.iter().map(|p| QualifiedName::local(p)).collect(),
            republished: properties
                .iter()
                .map(|p| QualifiedName::through(&reference.name, p))
                .collect(),
            properties,
        }
    }

    /// Local and republished names for one reference, as a single set.
    ///
    /// For a reference `ref_b` where only `x` is read this is
    /// `{"Model.X", "Model.RefB.X"}`.
    pub fn resolve_reference(
        &self,
        model: &ModelDescriptor,
        reference: &ModelReferenceDescriptor,
    ) -> BTreeSet<QualifiedName> {
        let usage = self.reference_usage(model, reference);
        usage.observed.into_iter().chain(usage.republished).collect()
    }

    pub fn command_usage(&self, model: &ModelDescriptor, command: &CommandDescriptor) -> CommandUsage {
        let guard = match &command.can_execute {
            Some(guard) => self.names_read(model, &model.transitive_access(guard).reads),
            None => BTreeSet::new(),
        };
        let triggers = command
            .triggers
            .iter()
            .map(|t| QualifiedName::from_path(&t.path))
            .collect();
        CommandUsage { guard, triggers }
    }

    /// Qualified names of the properties a set of member chains reads.
    fn names_read<'p, I>(&self, model: &ModelDescriptor, reads: I) -> BTreeSet<QualifiedName>
    where
        I: IntoIterator<Item = &'p rxgen_core::MemberPath>,
    {
        let mut names = BTreeSet::new();
        for path in reads {
            if let Some(path) = self.property_path(model, path.0.as_slice()) {
                names.insert(QualifiedName::from_path(&path));
            }
        }
        names
    }

    /// Interpret a member chain relative to `model`.
    fn property_path(&self, model: &ModelDescriptor, segments: &[String]) -> Option<PropertyPath> {
        let first = segments.first()?;
        if self.owns_property(model, first) {
            return Some(PropertyPath::local(first.clone()));
        }
        let reference = model.reference(first)?;
        let target = self.declarations.model(&reference.model)?;
        let property = segments.get(1)?;
        self.owns_property(target, property)
            .then(|| PropertyPath::through(first.clone(), property.clone()))
    }

    /// Whether `name` is a published property or command of the model or its bases.
    fn owns_property(&self, model: &ModelDescriptor, name: &str) -> bool {
        std::iter::once(model)
            .chain(self.declarations.base_chain(model))
            .any(|m| {
                m.properties.iter().any(|p| p.name == name && !p.is_inert())
                    || m.command(name).is_some()
            })
    }

    /// Observation set of a component: declared usage plus what its methods read
    /// through the model field.
    pub fn resolve_component(&self, component: &ComponentDescriptor) -> ComponentUsage {
        let mut observed: BTreeSet<QualifiedName> = component
            .observes
            .iter()
            .map(QualifiedName::from_path)
            .collect();

        if let Some(model) = self.declarations.model(&component.model) {
            observed.extend(
                self.component_paths(component, model)
                    .iter()
                    .map(QualifiedName::from_path),
            );
        }
        ComponentUsage { observed }
    }

    /// Properties a component bound to `model` observes, declared or read,
    /// that exist on the model or one of its references.
    fn component_paths(
        &self,
        component: &ComponentDescriptor,
        model: &ModelDescriptor,
    ) -> BTreeSet<PropertyPath> {
        let declared = component.observes.iter().filter_map(|path| {
            let segments: Vec<String> = path
                .reference
                .iter()
                .cloned()
                .chain(std::iter::once(path.property.clone()))
                .collect();
            self.property_path(model, &segments)
        });
        let read = component
            .access
            .reads
            .iter()
            .filter(|path| path.first() == Some(component.model_field.as_str()))
            .filter_map(|path| self.property_path(model, &path.0[1..]));
        declared.chain(read).collect()
    }

    /// Properties of `reference` observed by components bound to `model`.
    ///
    /// The model republishes these so component filters see the change.
    fn component_reads_through(&self, model: &ModelDescriptor, reference: &str) -> BTreeSet<String> {
        self.declarations
            .components
            .iter()
            .filter(|c| c.model == model.name)
            .flat_map(|c| self.component_paths(c, model))
            .filter(|path| path.reference.as_deref() == Some(reference))
            .map(|path| path.property)
            .collect()
    }
}
