//! Parsing of generator attributes.
//!
//! Attribute arguments accept either string literals or bare identifiers
//! wherever a name is expected, so `guard = can_persist` and
//! `guard = "can_persist"` are equivalent.

use crate::source::span_of;
use quote::ToTokens;
use rxgen_core::{AnalyzeError, EqualityPolicy, Scope};
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Expr, Ident, LitStr, Meta};

/// Attribute names owned by the generator. They are stripped from the emitted unit.
pub const GENERATOR_ATTRIBUTES: &[&str] = &[
    "model",
    "component",
    "observable",
    "trigger",
    "command",
    "model_ref",
    "inject",
];

/// Whether `attr` is one of the generator's own attributes.
pub fn is_generator_attribute(attr: &Attribute) -> bool {
    attribute_name(attr)
        .map(|name| GENERATOR_ATTRIBUTES.contains(&name.as_str()))
        .unwrap_or(false)
}

/// Name of an attribute, taken from the last path segment.
pub(crate) fn attribute_name(attr: &Attribute) -> Option<String> {
    attr.path().segments.last().map(|s| s.ident.to_string())
}

/// Find the first attribute named `name`.
pub(crate) fn find<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attrs
        .iter()
        .find(|a| attribute_name(a).as_deref() == Some(name))
}

/// Every attribute named `name`, in order.
pub(crate) fn find_all<'a>(
    attrs: &'a [Attribute],
    name: &'a str,
) -> impl Iterator<Item = &'a Attribute> + 'a {
    attrs
        .iter()
        .filter(move |a| attribute_name(a).as_deref() == Some(name))
}

/// Doc comment lines.
pub(crate) fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// `#[model(..)]`
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ModelAttr {
    pub scope: Option<Scope>,
    pub base: Option<String>,
    pub implements: Vec<String>,
    pub include_referenced_triggers: bool,
}

/// `#[observable(..)]`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ObservableAttr {
    pub init: bool,
    pub equality: EqualityPolicy,
    pub batch: Vec<String>,
    pub default: Option<String>,
    pub callback: bool,
    pub callback_async: bool,
}

impl Default for ObservableAttr {
    fn default() -> Self {
        Self {
            init: false,
            equality: EqualityPolicy::SuppressUnchanged,
            batch: Vec::new(),
            default: None,
            callback: false,
            callback_async: false,
        }
    }
}

/// `#[trigger(..)]`
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TriggerAttr {
    pub method: String,
    pub asynchronous: bool,
    pub guard: Option<String>,
}

/// `#[command(..)]`
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CommandAttr {
    pub execute: Option<String>,
    pub can_execute: Option<String>,
    pub triggers: Vec<String>,
    pub cancelable: bool,
}

/// `#[component(..)]`
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ComponentAttr {
    pub model: Option<String>,
    pub field: Option<String>,
    pub observes: Option<String>,
}

fn invalid(attr: &Attribute, name: &str, err: syn::Error) -> AnalyzeError {
    let span = span_of(&err.span());
    AnalyzeError::InvalidAttribute {
        attribute: name.to_string(),
        message: err.to_string(),
        span: if span.line == 0 { span_of(attr) } else { span },
    }
}

/// Value of `key = "text"` or `key = ident`.
fn name_value(meta: &ParseNestedMeta) -> syn::Result<String> {
    let value = meta.value()?;
    if value.peek(LitStr) {
        Ok(value.parse::<LitStr>()?.value())
    } else {
        Ok(value.parse::<Ident>()?.to_string())
    }
}

/// Value of `key = "expr"` or `key = expr`, rendered.
fn expr_value(meta: &ParseNestedMeta) -> syn::Result<String> {
    let value = meta.value()?;
    if value.peek(LitStr) {
        let text = value.parse::<LitStr>()?;
        syn::parse_str::<Expr>(&text.value())
            .map_err(|err| syn::Error::new(text.span(), err.to_string()))?;
        Ok(text.value())
    } else {
        Ok(value.parse::<Expr>()?.to_token_stream().to_string())
    }
}

/// Split `"a, b"` into trimmed, non-empty names.
fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run `parse` over the attribute's arguments; a bare `#[name]` has none.
fn parse_args<F>(attr: &Attribute, name: &str, parse: F) -> Result<(), AnalyzeError>
where
    F: FnMut(ParseNestedMeta) -> syn::Result<()>,
{
    if let Meta::Path(_) = attr.meta {
        return Ok(());
    }
    attr.parse_nested_meta(parse)
        .map_err(|err| invalid(attr, name, err))
}

pub(crate) fn parse_model(attr: &Attribute) -> Result<ModelAttr, AnalyzeError> {
    let mut out = ModelAttr::default();
    parse_args(attr, "model", |meta| {
        if meta.path.is_ident("scope") {
            let value = name_value(&meta)?;
            out.scope = Some(Scope::parse(&value).ok_or_else(|| {
                meta.error(format!(
                    "unknown scope `{}`, expected singleton, scoped or transient",
                    value
                ))
            })?);
        } else if meta.path.is_ident("base") {
            out.base = Some(name_value(&meta)?);
        } else if meta.path.is_ident("implements") {
            out.implements.extend(split_list(&name_value(&meta)?));
        } else if meta.path.is_ident("include_referenced_triggers") {
            out.include_referenced_triggers = true;
        } else {
            return Err(meta.error("unsupported model argument"));
        }
        Ok(())
    })?;
    Ok(out)
}

pub(crate) fn parse_observable(attr: &Attribute) -> Result<ObservableAttr, AnalyzeError> {
    let mut out = ObservableAttr::default();
    parse_args(attr, "observable", |meta| {
        if meta.path.is_ident("init") {
            out.init = true;
        } else if meta.path.is_ident("equality") {
            out.equality = match name_value(&meta)?.as_str() {
                "always" => EqualityPolicy::Always,
                "changed" => EqualityPolicy::SuppressUnchanged,
                other => {
                    return Err(meta.error(format!(
                        "unknown equality policy `{}`, expected always or changed",
                        other
                    )))
                }
            };
        } else if meta.path.is_ident("batch") {
            out.batch.extend(split_list(&name_value(&meta)?));
        } else if meta.path.is_ident("default") {
            out.default = Some(expr_value(&meta)?);
        } else if meta.path.is_ident("callback") {
            out.callback = true;
        } else if meta.path.is_ident("callback_async") {
            out.callback_async = true;
        } else {
            return Err(meta.error("unsupported observable argument"));
        }
        Ok(())
    })?;
    Ok(out)
}

pub(crate) fn parse_trigger(attr: &Attribute) -> Result<TriggerAttr, AnalyzeError> {
    let mut out = TriggerAttr::default();
    parse_args(attr, "trigger", |meta| {
        if meta.path.is_ident("asynchronous") {
            out.asynchronous = true;
        } else if meta.path.is_ident("guard") {
            out.guard = Some(name_value(&meta)?);
        } else if meta.path.is_ident("method") {
            out.method = name_value(&meta)?;
        } else if let Some(ident) = meta.path.get_ident() {
            if !out.method.is_empty() {
                return Err(meta.error("trigger names more than one method"));
            }
            out.method = ident.to_string();
        } else {
            return Err(meta.error("unsupported trigger argument"));
        }
        Ok(())
    })?;
    if out.method.is_empty() {
        return Err(invalid(
            attr,
            "trigger",
            syn::Error::new_spanned(attr, "trigger requires a method name"),
        ));
    }
    Ok(out)
}

pub(crate) fn parse_command(attr: &Attribute) -> Result<CommandAttr, AnalyzeError> {
    let mut out = CommandAttr::default();
    parse_args(attr, "command", |meta| {
        if meta.path.is_ident("execute") {
            out.execute = Some(name_value(&meta)?);
        } else if meta.path.is_ident("can_execute") {
            out.can_execute = Some(name_value(&meta)?);
        } else if meta.path.is_ident("trigger") {
            out.triggers.push(meta.value()?.parse::<LitStr>()?.value());
        } else if meta.path.is_ident("cancelable") {
            out.cancelable = true;
        } else {
            return Err(meta.error("unsupported command argument"));
        }
        Ok(())
    })?;
    Ok(out)
}

pub(crate) fn parse_component(attr: &Attribute) -> Result<ComponentAttr, AnalyzeError> {
    let mut out = ComponentAttr::default();
    parse_args(attr, "component", |meta| {
        if meta.path.is_ident("model") {
            out.model = Some(name_value(&meta)?);
        } else if meta.path.is_ident("field") {
            out.field = Some(name_value(&meta)?);
        } else if meta.path.is_ident("observes") {
            out.observes = Some(meta.value()?.parse::<LitStr>()?.value());
        } else {
            return Err(meta.error("unsupported component argument"));
        }
        Ok(())
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_bare_model_attribute() {
        let attr: Attribute = parse_quote!(#[model]);
        assert_eq!(parse_model(&attr).unwrap(), ModelAttr::default());
    }

    #[test]
    fn test_model_arguments() {
        let attr: Attribute = parse_quote!(
            #[model(scope = "scoped", implements = "OrderApi, Auditable", include_referenced_triggers)]
        );
        let parsed = parse_model(&attr).unwrap();
        assert_eq!(parsed.scope, Some(Scope::Scoped));
        assert_eq!(parsed.implements, vec!["OrderApi", "Auditable"]);
        assert!(parsed.include_referenced_triggers);
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        let attr: Attribute = parse_quote!(#[model(scope = "forever")]);
        let err = parse_model(&attr).unwrap_err();
        assert!(err.to_string().contains("unknown scope `forever`"));
    }

    #[test]
    fn test_observable_arguments() {
        let attr: Attribute =
            parse_quote!(#[observable(equality = "always", batch = "totals", default = 10, callback)]);
        let parsed = parse_observable(&attr).unwrap();
        assert_eq!(parsed.equality, EqualityPolicy::Always);
        assert_eq!(parsed.batch, vec!["totals"]);
        assert_eq!(parsed.default.as_deref(), Some("10"));
        assert!(parsed.callback);
        assert!(!parsed.init);
    }

    #[test]
    fn test_trigger_arguments() {
        let attr: Attribute = parse_quote!(#[trigger(persist, asynchronous, guard = can_persist)]);
        let parsed = parse_trigger(&attr).unwrap();
        assert_eq!(parsed.method, "persist");
        assert!(parsed.asynchronous);
        assert_eq!(parsed.guard.as_deref(), Some("can_persist"));

        let attr: Attribute = parse_quote!(#[trigger]);
        assert!(parse_trigger(&attr).is_err());
    }

    #[test]
    fn test_command_triggers_accumulate() {
        let attr: Attribute =
            parse_quote!(#[command(execute = "save", trigger = "total", trigger = "customer.name")]);
        let parsed = parse_command(&attr).unwrap();
        assert_eq!(parsed.execute.as_deref(), Some("save"));
        assert_eq!(parsed.triggers, vec!["total", "customer.name"]);
    }

    #[test]
    fn test_generator_attribute_detection() {
        let ours: Attribute = parse_quote!(#[rxgen::observable]);
        let theirs: Attribute = parse_quote!(#[serde(skip)]);
        assert!(is_generator_attribute(&ours));
        assert!(!is_generator_attribute(&theirs));
    }
}
