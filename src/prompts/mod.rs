use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

/// System prompt used when no other prompt has been selected.
pub const DEFAULT_PROMPT: &str = include_str!("default.hbs");

static PROMPT_REGISTRY: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("default", DEFAULT_PROMPT);
    m.insert("context", include_str!("context.hbs"));
    m
});

fn engine(strict: bool) -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(strict);
    // Diffs and source code must reach the agent byte for byte.
    hb.register_escape_fn(handlebars::no_escape);
    hb
}

/// Render a built-in prompt by name using Handlebars.
///
/// Usage:
///     render("context", &json!({"source_branch": "feature", ...}))
///
pub fn render(name: &str, ctx: &Value) -> anyhow::Result<String> {
    let template = PROMPT_REGISTRY
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("unknown prompt '{name}'"))?;

    engine(true)
        .render_template(template, ctx)
        .map_err(|e| anyhow::anyhow!("rendering prompt '{name}' failed: {e}"))
}

/// Render a user-supplied template. Missing variables render as empty text.
pub fn render_user_template(template: &str, ctx: &Value) -> anyhow::Result<String> {
    engine(false)
        .render_template(template, ctx)
        .map_err(|e| anyhow::anyhow!("rendering prompt template failed: {e}"))
}

/// True when the text uses Handlebars expressions and needs rendering.
pub fn is_template(text: &str) -> bool {
    text.contains("{{")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_prompt_is_an_error() {
        assert!(render("nope", &json!({})).is_err());
    }

    #[test]
    fn user_templates_are_lenient_and_unescaped() {
        let out = render_user_template(
            "Branch {{source_branch}} {{missing}}<{{diff}}>",
            &json!({"source_branch": "feature", "diff": "a < b && c"}),
        )
        .unwrap();
        assert_eq!(out, "Branch feature <a < b && c>");
    }

    #[test]
    fn detects_template_syntax() {
        assert!(is_template("Use {{title}}"));
        assert!(!is_template(DEFAULT_PROMPT));
    }
}
