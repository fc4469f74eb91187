//! DI registration and singleton aggregation emitters.

use crate::error::{CodegenError, Result};
use crate::syntax::{ident, path, trait_path};
use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use rxgen_core::{BlockSet, Declarations, ModelDescriptor, Scope};
use rxgen_resolver::{DependencyGraph, EdgeKind};
use std::collections::BTreeSet;
use syn::Path;

/// Models that receive a container registration.
///
/// Derived models ride on their base's registration, private models are
/// unreachable from the registration unit, and blocked models were not
/// generated. Each model name is registered once.
pub fn registered_models<'a>(
    declarations: &'a Declarations,
    blocked: &BlockSet,
) -> Vec<&'a ModelDescriptor> {
    let mut seen = BTreeSet::new();
    declarations
        .models
        .iter()
        .filter(|m| !m.is_derived() && !m.visibility.is_private())
        .filter(|m| !blocked.is_model_blocked(&m.name) && !blocked.is_file_blocked(&m.file))
        .filter(|m| seen.insert(m.name.as_str()))
        .collect()
}

/// Extension trait name for an entry point: `add_generated_models` becomes
/// `GeneratedModelsExt`.
pub fn trait_name(entry_point: &str) -> String {
    let stem = entry_point.strip_prefix("add_").unwrap_or(entry_point);
    format!("{}Ext", stem.to_case(Case::Pascal))
}

fn add_method(scope: Scope) -> &'static str {
    match scope {
        Scope::Singleton => "add_singleton",
        Scope::Scoped => "add_scoped",
        Scope::Transient => "add_transient",
    }
}

fn registration(model: &ModelDescriptor) -> Result<TokenStream> {
    let model_path = path(&model.type_path())?;
    let add = format_ident!("{}", add_method(model.scope));
    let add_as = format_ident!("{}_as", add_method(model.scope));
    let count = model.dependencies().len();
    let provider = if count == 0 {
        quote! { _provider }
    } else {
        quote! { provider }
    };
    let resolves = (0..count).map(|_| quote! { provider.resolve()? });

    let mut out = quote! {
        self.#add::<::std::sync::Arc<#model_path>, _>(|#provider| Ok(#model_path::new(#(#resolves),*)));
    };
    for interface in &model.implements {
        let interface = trait_path(&model.module, interface)?;
        out.extend(quote! {
            self.#add_as::<::std::sync::Arc<dyn #interface>, ::std::sync::Arc<#model_path>>(|model| {
                model as ::std::sync::Arc<dyn #interface>
            });
        });
    }
    Ok(out)
}

/// The `ServiceCollection` extension trait registering every model.
pub fn emit_registration(
    declarations: &Declarations,
    blocked: &BlockSet,
    runtime: &Path,
    entry_point: &str,
) -> Result<TokenStream> {
    let trait_ident = ident(&trait_name(entry_point))?;
    let entry = ident(entry_point)?;
    let registrations = registered_models(declarations, blocked)
        .into_iter()
        .map(registration)
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        /// Registers every generated model with its declared lifetime.
        pub trait #trait_ident {
            fn #entry(&mut self) -> &mut Self;
        }

        impl #trait_ident for #runtime::ServiceCollection {
            fn #entry(&mut self) -> &mut Self {
                #(#registrations)*
                self
            }
        }
    })
}

/// `initialize_singletons`, resolving every singleton model once with
/// referenced models ahead of the models holding them.
pub fn emit_singletons(
    declarations: &Declarations,
    blocked: &BlockSet,
    graph: &DependencyGraph,
    runtime: &Path,
) -> Result<TokenStream> {
    let singletons: Vec<&ModelDescriptor> = registered_models(declarations, blocked)
        .into_iter()
        .filter(|m| m.scope == Scope::Singleton)
        .collect();

    let mut ordered: Vec<&ModelDescriptor> = Vec::with_capacity(singletons.len());
    for node in graph.topological_order(&[EdgeKind::Reference]) {
        if let Some(model) = singletons.iter().find(|m| m.name == node) {
            ordered.push(model);
        }
    }
    if ordered.len() != singletons.len() {
        let missing = singletons
            .iter()
            .find(|m| !ordered.iter().any(|o| o.name == m.name))
            .map(|m| m.name.clone())
            .unwrap_or_default();
        return Err(CodegenError::UnknownModel(missing));
    }

    if ordered.is_empty() {
        return Ok(quote! {
            /// Resolves every singleton model once, dependencies first.
            pub fn initialize_singletons(
                _provider: &#runtime::ServiceProvider,
            ) -> ::std::result::Result<#runtime::SingletonRegistry, #runtime::ServiceError> {
                Ok(#runtime::SingletonRegistry::new())
            }
        });
    }

    let names: Vec<&str> = ordered.iter().map(|m| m.name.as_str()).collect();
    let paths = ordered
        .iter()
        .map(|m| path(&m.type_path()))
        .collect::<Result<Vec<_>>>()?;
    Ok(quote! {
        /// Resolves every singleton model once, dependencies first.
        pub fn initialize_singletons(
            provider: &#runtime::ServiceProvider,
        ) -> ::std::result::Result<#runtime::SingletonRegistry, #runtime::ServiceError> {
            let mut registry = #runtime::SingletonRegistry::new();
            #(registry.initialize::<::std::sync::Arc<#paths>>(#names, provider)?;)*
            Ok(registry)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::fixture;

    const SHOP: &str = r#"
        #[model(scope = "scoped", implements = "OrderApi")]
        pub struct Order {
            #[observable]
            status: String,
            customer: Arc<Customer>,
            settings: Arc<Settings>,
        }

        #[model(scope = "singleton")]
        pub struct Customer {
            #[observable]
            name: String,
            settings: Arc<Settings>,
        }

        #[model(scope = "singleton")]
        pub struct Settings {
            #[observable]
            theme: String,
        }

        #[model(scope = "scoped", base = "Order")]
        pub struct RushOrder {
            #[observable]
            priority: u8,
        }

        #[model]
        struct Hidden {
            #[observable]
            value: i32,
        }
    "#;

    #[test]
    fn test_trait_name_from_entry_point() {
        assert_eq!(trait_name("add_generated_models"), "GeneratedModelsExt");
        assert_eq!(trait_name("register_shop"), "RegisterShopExt");
    }

    #[test]
    fn test_derived_and_private_models_are_skipped() {
        let f = fixture(SHOP);
        let names: Vec<&str> = registered_models(&f.declarations, &f.blocked)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["Order", "Customer", "Settings"]);
    }

    #[test]
    fn test_registration_table() {
        let f = fixture(SHOP);
        let out = emit_registration(&f.declarations, &f.blocked, &f.runtime, "add_generated_models")
            .unwrap()
            .to_string();
        assert!(out.contains(&quote!(pub trait GeneratedModelsExt).to_string()));
        assert!(out.contains(&quote!(impl GeneratedModelsExt for ::rxgen_runtime::ServiceCollection).to_string()));
        assert!(out.contains(
            &quote!(self.add_scoped::<::std::sync::Arc<crate::models::Order>, _>(|provider| Ok(crate::models::Order::new(provider.resolve()?, provider.resolve()?)));)
                .to_string()
        ));
        assert!(out.contains(
            &quote!(self.add_singleton::<::std::sync::Arc<crate::models::Settings>, _>(|_provider| Ok(crate::models::Settings::new()));)
                .to_string()
        ));
        assert!(out.contains(
            &quote!(self.add_scoped_as::<::std::sync::Arc<dyn crate::models::OrderApi>, ::std::sync::Arc<crate::models::Order>>)
                .to_string()
        ));
        assert!(!out.contains("RushOrder"));
        assert!(!out.contains("Hidden"));
    }

    #[test]
    fn test_singletons_initialize_dependencies_first() {
        let f = fixture(SHOP);
        let out = emit_singletons(&f.declarations, &f.blocked, &f.graph, &f.runtime)
            .unwrap()
            .to_string();
        let settings = out.find("\"Settings\"").unwrap();
        let customer = out.find("\"Customer\"").unwrap();
        assert!(settings < customer);
        assert!(!out.contains("\"Order\""));
    }
}
