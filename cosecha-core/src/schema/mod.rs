//! Schema declarations and validation.
//!
//! A [`Schema`] describes the shape a JSON document must satisfy: field
//! names, types, numeric ranges, text rules, enumerations, and cardinality.
//! One generic walk serves both enforcement points of the pipeline:
//! - caller input is checked before any external call is made
//! - reasoner output is checked for structural conformance plus whatever
//!   ranges the schema declares; prose content is trusted verbatim once the
//!   structure holds

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::composer::DataUri;

/// Text constraints beyond "is a string".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRule {
    /// At least one non-whitespace character.
    NonEmpty,
    /// One ASCII letter followed by exactly `n` ASCII digits (e.g. "L014").
    LetterThenDigits(usize),
    /// A base64 data URI ("data:<mime>;base64,<payload>").
    DataUri,
}

impl TextRule {
    fn holds(&self, text: &str) -> bool {
        match self {
            TextRule::NonEmpty => !text.trim().is_empty(),
            TextRule::LetterThenDigits(digits) => {
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) if first.is_ascii_alphabetic() => {
                        let rest: Vec<char> = chars.collect();
                        rest.len() == *digits && rest.iter().all(char::is_ascii_digit)
                    }
                    _ => false,
                }
            }
            TextRule::DataUri => DataUri::parse(text).is_ok(),
        }
    }

    fn describe(&self) -> String {
        match self {
            TextRule::NonEmpty => "must not be empty".to_string(),
            TextRule::LetterThenDigits(digits) => {
                format!("must be one letter followed by exactly {} digits", digits)
            }
            TextRule::DataUri => "must be a base64 data URI".to_string(),
        }
    }
}

/// Field type and constraints.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A boolean.
    Bool,
    /// A number with optional inclusive bounds.
    Number { min: Option<f64>, max: Option<f64> },
    /// A string, optionally constrained by [`TextRule`]s.
    Text { rules: Vec<TextRule> },
    /// A string restricted to a declared value set.
    Choice { values: Vec<&'static str> },
    /// A homogeneous array with optional inclusive length bounds.
    List {
        item: Box<FieldKind>,
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    /// A nested object described by its own schema.
    Object(Schema),
}

impl FieldKind {
    /// Unconstrained number.
    pub fn number() -> Self {
        FieldKind::Number {
            min: None,
            max: None,
        }
    }

    /// Number with an inclusive lower bound.
    pub fn number_min(min: f64) -> Self {
        FieldKind::Number {
            min: Some(min),
            max: None,
        }
    }

    /// Number within an inclusive range.
    pub fn number_range(min: f64, max: f64) -> Self {
        FieldKind::Number {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Unconstrained string.
    pub fn text() -> Self {
        FieldKind::Text { rules: Vec::new() }
    }

    /// String constrained by a single rule.
    pub fn text_matching(rule: TextRule) -> Self {
        FieldKind::Text { rules: vec![rule] }
    }

    /// String restricted to the given values.
    pub fn choice(values: &[&'static str]) -> Self {
        FieldKind::Choice {
            values: values.to_vec(),
        }
    }

    /// Unbounded list of `item`.
    pub fn list(item: FieldKind) -> Self {
        FieldKind::List {
            item: Box::new(item),
            min_len: None,
            max_len: None,
        }
    }

    /// List of `item` with inclusive length bounds.
    pub fn list_bounded(item: FieldKind, min_len: Option<usize>, max_len: Option<usize>) -> Self {
        FieldKind::List {
            item: Box::new(item),
            min_len,
            max_len,
        }
    }

    fn check(&self, path: &str, value: &Value, out: &mut Vec<Violation>) {
        match self {
            FieldKind::Bool => {
                if !value.is_boolean() {
                    out.push(Violation::new(path, "expected a boolean"));
                }
            }
            FieldKind::Number { min, max } => match value.as_f64() {
                None => out.push(Violation::new(path, "expected a number")),
                Some(n) => {
                    if let Some(min) = min {
                        if n < *min {
                            out.push(Violation::new(path, format!("{} is below minimum {}", n, min)));
                        }
                    }
                    if let Some(max) = max {
                        if n > *max {
                            out.push(Violation::new(path, format!("{} is above maximum {}", n, max)));
                        }
                    }
                }
            },
            FieldKind::Text { rules } => match value.as_str() {
                None => out.push(Violation::new(path, "expected a string")),
                Some(text) => {
                    for rule in rules {
                        if !rule.holds(text) {
                            out.push(Violation::new(path, rule.describe()));
                        }
                    }
                }
            },
            FieldKind::Choice { values } => match value.as_str() {
                None => out.push(Violation::new(path, "expected a string")),
                Some(text) => {
                    if !values.contains(&text) {
                        out.push(Violation::new(
                            path,
                            format!("'{}' is not one of {:?}", text, values),
                        ));
                    }
                }
            },
            FieldKind::List {
                item,
                min_len,
                max_len,
            } => match value.as_array() {
                None => out.push(Violation::new(path, "expected a list")),
                Some(items) => {
                    if let Some(min) = min_len {
                        if items.len() < *min {
                            out.push(Violation::new(
                                path,
                                format!("needs at least {} item(s), got {}", min, items.len()),
                            ));
                        }
                    }
                    if let Some(max) = max_len {
                        if items.len() > *max {
                            out.push(Violation::new(
                                path,
                                format!("allows at most {} item(s), got {}", max, items.len()),
                            ));
                        }
                    }
                    for (index, entry) in items.iter().enumerate() {
                        item.check(&format!("{}[{}]", path, index), entry, out);
                    }
                }
            },
            FieldKind::Object(schema) => {
                if let Err(nested) = schema.validate(value) {
                    out.extend(nested.violations.into_iter().map(|v| v.prefixed(path)));
                }
            }
        }
    }
}

/// One named field of a schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Wire name of the field.
    pub name: &'static str,
    /// Whether absence (or JSON null) is a violation.
    pub required: bool,
    /// Type and constraints.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// A field that must be present and non-null.
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: true,
            kind,
        }
    }

    /// A field that may be absent or null; constraints apply when present.
    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: false,
            kind,
        }
    }
}

/// Declarative shape of a JSON document.
///
/// Unknown extra fields are tolerated on both sides of the pipeline; only
/// declared fields are enforced.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Schema name, used in violation reports.
    pub name: &'static str,
    /// Declared fields.
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Add a field declaration.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Check `document` against this schema, collecting every violation.
    pub fn validate(&self, document: &Value) -> Result<(), SchemaViolations> {
        let mut violations = Vec::new();
        match document.as_object() {
            Some(map) => {
                for field in &self.fields {
                    match map.get(field.name) {
                        None | Some(Value::Null) => {
                            if field.required {
                                violations
                                    .push(Violation::new(field.name, "required field is missing"));
                            }
                        }
                        Some(value) => field.kind.check(field.name, value, &mut violations),
                    }
                }
            }
            None => violations.push(Violation::new("$", "document must be a JSON object")),
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolations {
                schema: self.name,
                violations,
            })
        }
    }
}

/// One rejected field.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Path of the offending field ("alerts[2].urgency").
    pub path: String,
    /// What was wrong with it.
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    fn prefixed(mut self, parent: &str) -> Self {
        self.path = format!("{}.{}", parent, self.path);
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// All violations found in one document.
#[derive(Debug, Clone, Error)]
#[error("schema '{}' rejected: {}", .schema, format_violations(.violations))]
pub struct SchemaViolations {
    /// Name of the rejecting schema.
    pub schema: &'static str,
    /// Every violation found, in declaration order.
    pub violations: Vec<Violation>,
}

impl SchemaViolations {
    /// A single-violation report, for rejections raised outside the walk.
    pub fn single(
        schema: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            violations: vec![Violation::new(path, message)],
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
