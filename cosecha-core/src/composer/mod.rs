//! Prompt template parsing and request composition.
//!
//! A [`PromptTemplate`] is parsed once at flow registration and interpolated
//! per request. `{{field}}` renders the field as text; `{{media field}}`
//! embeds the field's data-URI payload as an inline binary part, so flows
//! with and without media share one composition path. Composition is pure:
//! the same document always yields byte-identical parts.

use std::fmt::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

use crate::schema::{FieldKind, Schema};

/// One segment of a composed reasoning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    /// Plain text.
    Text(String),
    /// Binary media carried as base64, with its mime type.
    InlineMedia { mime_type: String, data: String },
}

/// Template parse errors, raised at flow registration.
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
    #[error("empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),
}

/// Composition errors, raised per request.
#[derive(Debug, Clone, Error)]
pub enum ComposeError {
    #[error("template references unknown field '{0}'")]
    MissingField(String),
    #[error("media field '{0}' is not a string")]
    MediaNotText(String),
    #[error("media field '{field}' rejected: {source}")]
    InvalidMedia {
        field: String,
        #[source]
        source: DataUriError,
    },
}

#[derive(Debug, Clone)]
enum Token {
    Literal(String),
    Field(String),
    Media(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    tokens: Vec<Token>,
}

impl PromptTemplate {
    /// Parse `source`, resolving placeholders eagerly so a malformed template
    /// fails at registration instead of on the first request.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut tokens = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                tokens.push(Token::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(TemplateError::Unterminated(offset + start))?;
            let inner = after[..end].trim();
            if inner.is_empty() {
                return Err(TemplateError::EmptyPlaceholder(offset + start));
            }
            let token = match inner.strip_prefix("media ") {
                Some(field) => Token::Media(field.trim().to_string()),
                None => Token::Field(inner.to_string()),
            };
            tokens.push(token);

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            tokens.push(Token::Literal(rest.to_string()));
        }

        Ok(Self { tokens })
    }

    /// Interpolate `document` into the template.
    ///
    /// Text accumulates into one part until a media placeholder splits it;
    /// media payloads are decoded once here to reject corrupt attachments
    /// before they reach the wire.
    pub fn compose(&self, document: &Value) -> Result<Vec<PromptPart>, ComposeError> {
        let mut parts = Vec::new();
        let mut text = String::new();

        for token in &self.tokens {
            match token {
                Token::Literal(literal) => text.push_str(literal),
                Token::Field(name) => text.push_str(&render_field(document, name)?),
                Token::Media(name) => {
                    let raw = document
                        .get(name)
                        .ok_or_else(|| ComposeError::MissingField(name.clone()))?;
                    let raw = raw
                        .as_str()
                        .ok_or_else(|| ComposeError::MediaNotText(name.clone()))?;
                    let uri = DataUri::parse(raw).map_err(|source| ComposeError::InvalidMedia {
                        field: name.clone(),
                        source,
                    })?;
                    uri.verify_payload()
                        .map_err(|source| ComposeError::InvalidMedia {
                            field: name.clone(),
                            source,
                        })?;

                    if !text.is_empty() {
                        parts.push(PromptPart::Text(std::mem::take(&mut text)));
                    }
                    parts.push(PromptPart::InlineMedia {
                        mime_type: uri.mime_type.to_string(),
                        data: uri.payload.to_string(),
                    });
                }
            }
        }
        if !text.is_empty() {
            parts.push(PromptPart::Text(text));
        }

        Ok(parts)
    }
}

fn render_field(document: &Value, name: &str) -> Result<String, ComposeError> {
    let value = document
        .get(name)
        .ok_or_else(|| ComposeError::MissingField(name.to_string()))?;
    Ok(match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    })
}

/// Data URI parse errors.
#[derive(Debug, Clone, Error)]
pub enum DataUriError {
    #[error("missing 'data:' scheme")]
    MissingScheme,
    #[error("missing ';base64,' marker")]
    NotBase64,
    #[error("missing mime type")]
    MissingMime,
    #[error("payload is not valid base64")]
    InvalidPayload,
}

/// A structurally parsed "data:<mime>;base64,<payload>" URI.
///
/// Parsing checks structure only; [`DataUri::verify_payload`] decodes the
/// base64 body, which can be large for photographs.
#[derive(Debug, Clone, Copy)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Split a data URI into mime type and base64 payload.
    pub fn parse(raw: &'a str) -> Result<Self, DataUriError> {
        let rest = raw.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
        let (mime_type, payload) = rest.split_once(";base64,").ok_or(DataUriError::NotBase64)?;
        if mime_type.is_empty() {
            return Err(DataUriError::MissingMime);
        }
        Ok(Self { mime_type, payload })
    }

    /// Decode the payload to prove it is well-formed base64.
    pub fn verify_payload(&self) -> Result<(), DataUriError> {
        BASE64
            .decode(self.payload)
            .map(|_| ())
            .map_err(|_| DataUriError::InvalidPayload)
    }
}

/// Render a schema into response-format instructions for the reasoner.
///
/// The reasoner is told the exact JSON shape to return; the same schema then
/// enforces the shape on whatever comes back.
pub fn response_instructions(schema: &Schema) -> String {
    let mut out = String::from(
        "Respond with ONLY a single JSON object. No prose around it, no code fences.\nFields:\n",
    );
    append_schema_fields(&mut out, schema, 0);
    out
}

fn append_schema_fields(out: &mut String, schema: &Schema, depth: usize) {
    let indent = "  ".repeat(depth);
    for field in &schema.fields {
        let required = if field.required { "required" } else { "optional" };
        let _ = writeln!(
            out,
            "{}- {} ({}, {})",
            indent,
            field.name,
            kind_hint(&field.kind),
            required
        );
        if let Some(nested) = nested_schema(&field.kind) {
            append_schema_fields(out, nested, depth + 1);
        }
    }
}

fn nested_schema(kind: &FieldKind) -> Option<&Schema> {
    match kind {
        FieldKind::Object(schema) => Some(schema),
        FieldKind::List { item, .. } => nested_schema(item),
        _ => None,
    }
}

fn kind_hint(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Bool => "boolean".to_string(),
        FieldKind::Number { min, max } => match (min, max) {
            (Some(min), Some(max)) => format!("number, {} to {}", min, max),
            (Some(min), None) => format!("number, at least {}", min),
            (None, Some(max)) => format!("number, at most {}", max),
            (None, None) => "number".to_string(),
        },
        FieldKind::Text { .. } => "string".to_string(),
        FieldKind::Choice { values } => format!("one of {:?}", values),
        FieldKind::List {
            min_len, max_len, ..
        } => match (min_len, max_len) {
            (Some(min), Some(max)) => format!("list of {} to {} objects with fields", min, max),
            (Some(min), None) => format!("list of at least {} objects with fields", min),
            _ => "list of objects with fields".to_string(),
        },
        FieldKind::Object(_) => "object with fields".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    // A 1x1 transparent PNG is enough to exercise the media path.
    const TINY_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_text_only_composition() {
        let template = PromptTemplate::parse("Batch {{batchId}} weighed {{kilos}} kg.").unwrap();
        let parts = template
            .compose(&json!({"batchId": "L014", "kilos": 420.5}))
            .unwrap();
        assert_eq!(
            parts,
            vec![PromptPart::Text("Batch L014 weighed 420.5 kg.".to_string())]
        );
    }

    #[test]
    fn test_media_placeholder_splits_parts() {
        let template =
            PromptTemplate::parse("Look at this photo: {{media photo}} Description: {{desc}}")
                .unwrap();
        let uri = format!("data:image/png;base64,{}", TINY_PNG);
        let parts = template
            .compose(&json!({"photo": uri, "desc": "yellow leaves"}))
            .unwrap();

        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], PromptPart::Text(t) if t.ends_with("photo: ")));
        assert!(matches!(
            &parts[1],
            PromptPart::InlineMedia { mime_type, data }
                if mime_type == "image/png" && data == TINY_PNG
        ));
        assert!(matches!(&parts[2], PromptPart::Text(t) if t.contains("yellow leaves")));
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let template = PromptTemplate::parse("{{absent}}").unwrap();
        let err = template.compose(&json!({})).unwrap_err();
        assert!(matches!(err, ComposeError::MissingField(name) if name == "absent"));
    }

    #[test]
    fn test_corrupt_media_payload_rejected() {
        let template = PromptTemplate::parse("{{media photo}}").unwrap();
        let err = template
            .compose(&json!({"photo": "data:image/png;base64,@@not-base64@@"}))
            .unwrap_err();
        assert!(matches!(err, ComposeError::InvalidMedia { .. }));
    }

    #[test]
    fn test_unterminated_placeholder_fails_to_parse() {
        assert!(matches!(
            PromptTemplate::parse("hello {{name"),
            Err(TemplateError::Unterminated(_))
        ));
    }

    #[test]
    fn test_composition_is_deterministic() {
        let template =
            PromptTemplate::parse("{{a}} then {{b}} over {{history}}").unwrap();
        let document = json!({"a": 1, "b": true, "history": "[{\"x\":1}]"});
        let first = template.compose(&document).unwrap();
        let second = template.compose(&document).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_data_uri_parse() {
        let uri = DataUri::parse("data:image/jpeg;base64,aGk=").unwrap();
        assert_eq!(uri.mime_type, "image/jpeg");
        assert_eq!(uri.payload, "aGk=");
        assert!(uri.verify_payload().is_ok());

        assert!(matches!(
            DataUri::parse("http://example.com/a.png"),
            Err(DataUriError::MissingScheme)
        ));
        assert!(matches!(
            DataUri::parse("data:image/png,plain"),
            Err(DataUriError::NotBase64)
        ));
        assert!(matches!(
            DataUri::parse("data:;base64,aGk="),
            Err(DataUriError::MissingMime)
        ));
    }

    #[test]
    fn test_response_instructions_render_nested_fields() {
        let entry = Schema::new("alert")
            .field(FieldSpec::required("risk", FieldKind::text()))
            .field(FieldSpec::required(
                "urgency",
                FieldKind::choice(&["Alta", "Media", "Baja"]),
            ));
        let schema = Schema::new("alerts").field(FieldSpec::required(
            "alerts",
            FieldKind::list_bounded(FieldKind::Object(entry), Some(1), None),
        ));

        let rendered = response_instructions(&schema);
        assert!(rendered.contains("alerts (list of at least 1 objects with fields, required)"));
        assert!(rendered.contains("  - risk (string, required)"));
        assert!(rendered.contains(r#"urgency (one of ["Alta", "Media", "Baja"], required)"#));
        assert!(rendered.starts_with("Respond with ONLY a single JSON object"));
    }
}
