//! Template engine for the text envelope around generated units.
//!
//! Items themselves are built as token streams and pretty-printed; the
//! handlebars templates only render the comment header every generated file
//! starts with.

use crate::error::{CodegenError, Result};
use handlebars::Handlebars;
use serde::Serialize;

/// Header of a generated declaration unit.
pub const UNIT_HEADER: &str = "unit_header";

/// Header of the registration unit.
pub const REGISTRATION_HEADER: &str = "registration_header";

const UNIT_HEADER_TEMPLATE: &str = "\
// @generated by rxgen {{version}} from `{{source}}`. Do not edit.
{{#if models}}// Models: {{join models \", \"}}
{{/if}}{{#if components}}// Components: {{join components \", \"}}
{{/if}}";

const REGISTRATION_HEADER_TEMPLATE: &str = "\
// @generated by rxgen {{version}}. Do not edit.
// Registers {{count}} model type(s) through `{{trait_name}}::{{entry_point}}`.
";

/// Data rendered into [`UNIT_HEADER`].
#[derive(Debug, Clone, Serialize)]
pub struct UnitHeader<'a> {
    pub version: &'a str,
    pub source: &'a str,
    pub models: Vec<&'a str>,
    pub components: Vec<&'a str>,
}

/// Data rendered into [`REGISTRATION_HEADER`].
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationHeader<'a> {
    pub version: &'a str,
    pub trait_name: &'a str,
    pub entry_point: &'a str,
    pub count: usize,
}

/// Template engine using Handlebars.
pub struct TemplateEngine<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> TemplateEngine<'a> {
    /// Create an engine with the built-in header templates registered.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Output is Rust source, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        Self::register_helpers(&mut handlebars);

        let mut engine = Self { handlebars };
        engine.register_template(UNIT_HEADER, UNIT_HEADER_TEMPLATE)?;
        engine.register_template(REGISTRATION_HEADER, REGISTRATION_HEADER_TEMPLATE)?;
        Ok(engine)
    }

    /// Register a template.
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(CodegenError::InvalidTemplate)?;
        Ok(())
    }

    /// Render a template.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        self.handlebars
            .render(name, data)
            .map_err(CodegenError::TemplateError)
    }

    /// Render a template string directly.
    pub fn render_string<T: Serialize>(&self, template: &str, data: &T) -> Result<String> {
        self.handlebars
            .render_template(template, data)
            .map_err(CodegenError::TemplateError)
    }

    /// Register custom helpers.
    fn register_helpers(handlebars: &mut Handlebars) {
        // Join helper
        handlebars.register_helper(
            "join",
            Box::new(
                |h: &handlebars::Helper,
                 _r: &Handlebars,
                 _ctx: &handlebars::Context,
                 _rc: &mut handlebars::RenderContext,
                 out: &mut dyn handlebars::Output| {
                    let arr = h.param(0).and_then(|v| v.value().as_array());
                    let sep = h
                        .param(1)
                        .and_then(|v| v.value().as_str())
                        .unwrap_or(", ");

                    if let Some(items) = arr {
                        let joined = items
                            .iter()
                            .filter_map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(sep);
                        out.write(&joined)?;
                    }
                    Ok(())
                },
            ),
        );
    }
}
