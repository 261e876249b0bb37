//! Token substitution for filter state templates.
//!
//! Filter state may reference the content item a resolution runs for, so one
//! profile can produce per-item output (e.g. a focal point stored on the
//! item). Tokens are written `{Content.Id}`, `{Content.ContentType}` and
//! `{Content.Fields.<Name>}`.
//!
//! Tokens that cannot be resolved (unknown name, no content item, missing
//! field) are left in the output verbatim, so a misconfigured template is
//! visible in the parsed state instead of silently collapsing to an empty
//! value.
//!
//! Substituted values are form-encoded. Filter state is a query string, and a
//! field value holding `&` or `=` must stay one value instead of adding
//! parameters of its own.

use crate::types::ContentItem;
use url::form_urlencoded;

/// Values available to a template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenContext<'a> {
    pub content: Option<&'a ContentItem>,
}

impl<'a> TokenContext<'a> {
    pub fn with_content(content: Option<&'a ContentItem>) -> Self {
        Self { content }
    }

    fn value(&self, token: &str) -> Option<String> {
        let rest = token.strip_prefix("Content.")?;
        let content = self.content?;
        match rest {
            "Id" => Some(content.id.to_string()),
            "ContentType" => Some(content.content_type.clone()),
            _ => rest
                .strip_prefix("Fields.")
                .and_then(|field| content.fields.get(field))
                .cloned(),
        }
    }
}

pub trait Tokenizer: Send + Sync {
    fn replace(&self, template: &str, context: &TokenContext<'_>) -> String;
}

/// `{Token}` substitution over [`TokenContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateTokenizer;

impl Tokenizer for TemplateTokenizer {
    fn replace(&self, template: &str, context: &TokenContext<'_>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    let token = &after[..end];
                    match context.value(token) {
                        Some(value) => out.extend(form_urlencoded::byte_serialize(value.as_bytes())),
                        None => {
                            out.push('{');
                            out.push_str(token);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
