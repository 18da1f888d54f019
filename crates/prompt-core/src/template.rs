//! Template engine glue
//!
//! Each reload pass builds one `Handlebars` registry holding that pass's
//! partials and prompt templates, with HTML escaping disabled. Invocation
//! closures capture the finished set behind an `Arc`, so a later rebuild
//! can never pull a template out from under an in-flight render.

use std::sync::Arc;

use handlebars::Handlebars;
use serde_json::{Map, Value};

use crate::config::Language;
use crate::partials::PartialRegistry;

/// Validate a template body without registering it anywhere.
///
/// # Errors
///
/// Returns the engine's message when the body does not compile.
pub fn check_template(source: &str) -> std::result::Result<(), String> {
    handlebars::Template::compile(source)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Builder for one pass's render set.
pub struct RenderSetBuilder {
    hb: Handlebars<'static>,
}

impl RenderSetBuilder {
    /// Start a new set seeded with `partials`.
    ///
    /// A partial that fails to compile is logged and skipped; the prompts
    /// referencing it will render it as missing, which their dependency
    /// check already flagged.
    pub fn new(partials: &PartialRegistry) -> Self {
        let mut hb = Handlebars::new();
        hb.register_escape_fn(handlebars::no_escape);
        for (name, source) in partials.iter() {
            if let Err(e) = hb.register_partial(name, source) {
                tracing::warn!(partial = %name, error = %e, "partial does not compile, skipping");
            }
        }
        Self { hb }
    }

    /// Register one prompt template under `id`.
    ///
    /// # Errors
    ///
    /// Returns the compile error message; the caller records it as a
    /// per-document failure.
    pub fn add_template(&mut self, id: &str, source: &str) -> std::result::Result<(), String> {
        self.hb
            .register_template_string(id, source)
            .map_err(|e| e.to_string())
    }

    pub fn finish(self) -> RenderSet {
        RenderSet {
            hb: Arc::new(self.hb),
        }
    }
}

/// Immutable, shareable render set for one pass.
#[derive(Clone)]
pub struct RenderSet {
    hb: Arc<Handlebars<'static>>,
}

impl RenderSet {
    /// Render the template registered under `id` with `ctx`.
    pub fn render(&self, id: &str, ctx: &Value) -> std::result::Result<String, String> {
        self.hb.render(id, ctx).map_err(|e| e.to_string())
    }
}

/// Build the render context for one invocation: coerced arguments plus the
/// ambient language variables.
///
/// `sys_lang` and `output_lang_rule` are only injected when the prompt
/// does not define arguments of the same name.
pub fn build_context(mut args: Map<String, Value>, language: Language) -> Value {
    args.entry("sys_lang".to_string())
        .or_insert_with(|| Value::String(language.as_str().to_string()));
    args.entry("output_lang_rule".to_string())
        .or_insert_with(|| Value::String(output_lang_rule(language).to_string()));
    Value::Object(args)
}

/// The instruction injected so rendered prompts answer in the configured
/// language.
pub fn output_lang_rule(language: Language) -> &'static str {
    match language {
        Language::En => "Respond in English.",
        Language::Zh => "请使用中文回复。",
    }
}
