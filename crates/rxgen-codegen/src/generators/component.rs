//! Component emitter: re-render filtering for `#[component]` structs.

use super::name_list;
use crate::error::Result;
use crate::syntax::ident;
use proc_macro2::TokenStream;
use quote::quote;
use rxgen_analyzer::is_generator_attribute;
use rxgen_core::ComponentDescriptor;
use rxgen_resolver::ComponentUsage;
use syn::{ItemStruct, Path};

/// The component struct without generator attributes, plus its observation impl.
pub fn emit_component(
    component: &ComponentDescriptor,
    usage: &ComponentUsage,
    item: &ItemStruct,
    runtime: &Path,
) -> Result<TokenStream> {
    let mut stripped = item.clone();
    stripped.attrs.retain(|a| !is_generator_attribute(a));
    for field in stripped.fields.iter_mut() {
        field.attrs.retain(|a| !is_generator_attribute(a));
    }

    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let observed = name_list(&usage.observed);
    let model_field = ident(&component.model_field)?;
    let subscribe = if usage.observed.is_empty() {
        quote! {
            let _ = callback;
            #runtime::Subscription::empty()
        }
    } else {
        quote! {
            self.#model_field.core().observe(Self::OBSERVED_PROPERTIES, callback)
        }
    };

    Ok(quote! {
        #stripped

        impl #impl_generics #name #ty_generics #where_clause {
            /// Qualified names whose changes re-render this component.
            pub const OBSERVED_PROPERTIES: &'static [&'static str] = #observed;

            /// Whether a change set concerns this component.
            pub fn should_render(changed: &[&str]) -> bool {
                #runtime::RenderFilter::new(Self::OBSERVED_PROPERTIES).should_render(changed)
            }

            /// Run `callback` for every change set this component observes.
            pub fn subscribe<F>(&self, callback: F) -> #runtime::Subscription
            where
                F: Fn(&[&'static str]) + Send + Sync + 'static,
            {
                #subscribe
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::fixture;

    const VIEWS: &str = r#"
        #[model]
        pub struct Counter {
            #[observable]
            value: i32,
            #[observable]
            step: i32,
        }

        #[component(observes = "step")]
        pub struct CounterView {
            model: Arc<Counter>,
        }

        impl CounterView {
            fn render(&self) -> String {
                format!("{}", self.model.value())
            }
        }

        #[component(model = "Counter")]
        pub struct Badge {
            model: Arc<Counter>,
        }
    "#;

    fn emit(name: &str) -> String {
        let f = fixture(VIEWS);
        let component = f.declarations.component(name).unwrap();
        let item = f
            .parsed
            .syntax
            .items
            .iter()
            .find_map(|item| match item {
                syn::Item::Struct(s) if s.ident == name => Some(s),
                _ => None,
            })
            .unwrap();
        emit_component(component, f.resolution.component(name).unwrap(), item, &f.runtime)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_declared_and_read_names_are_observed() {
        let out = emit("CounterView");
        assert!(out.contains(&quote!(pub struct CounterView { model: Arc<Counter>, }).to_string()));
        assert!(!out.contains("# [component"));
        assert!(out.contains(
            &quote!(pub const OBSERVED_PROPERTIES: &'static [&'static str] = &["Model.Step", "Model.Value"];)
                .to_string()
        ));
        assert!(out.contains(
            &quote!(self.model.core().observe(Self::OBSERVED_PROPERTIES, callback)).to_string()
        ));
    }

    #[test]
    fn test_component_without_reads_never_subscribes() {
        let out = emit("Badge");
        assert!(out.contains(&quote!(::rxgen_runtime::Subscription::empty()).to_string()));
        assert!(out.contains(&quote!(= &[];).to_string()));
    }
}
