// ABOUTME: Upgrade template loading and rendering with mustache.
// ABOUTME: Checks that template placeholders and parameter fields match before rendering.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::types::{EnvironmentType, ImageRef};

/// Fields substituted into the upgrade template.
///
/// Field names are the placeholder names. [`UpgradeTemplate::render`] refuses
/// to render when the two sets differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeParameters {
    pub image: ImageRef,
    pub skip_pull_image: bool,
    pub updater_image: ImageRef,
    pub license: String,
    pub env_type: EnvironmentType,
    pub version: String,
}

impl UpgradeParameters {
    /// Names of the fields as seen by the template.
    pub fn field_names(&self) -> Result<BTreeSet<String>, TemplateError> {
        match serde_json::to_value(self).map_err(TemplateError::Serialize)? {
            serde_json::Value::Object(fields) => Ok(fields.keys().cloned().collect()),
            _ => Ok(BTreeSet::new()),
        }
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.version.trim().is_empty() {
            return Err(TemplateError::InvalidParameters(
                "version cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid template: {0}")]
    Compile(#[source] mustache::Error),

    #[error("placeholders must use triple braces, found escaped {0:?}")]
    EscapedPlaceholder(Vec<String>),

    #[error(
        "template and parameters disagree (placeholders without field: {missing_fields:?}, fields without placeholder: {unused_fields:?})"
    )]
    FieldMismatch {
        missing_fields: Vec<String>,
        unused_fields: Vec<String>,
    },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("failed to serialize parameters: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("{0}")]
    Render(#[source] mustache::Error),
}

/// A compiled upgrade template together with its placeholder names.
pub struct UpgradeTemplate {
    template: mustache::Template,
    placeholders: BTreeSet<String>,
}

impl std::fmt::Debug for UpgradeTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeTemplate")
            .field("placeholders", &self.placeholders)
            .finish()
    }
}

impl UpgradeTemplate {
    pub async fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TemplateError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::compile(&source)
    }

    /// Compile a template whose variables are all `{{{triple}}}` or `{{&name}}`.
    ///
    /// Values are substituted as complete quoted YAML scalars, so HTML escaping
    /// would corrupt them.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let tags = scan(source);
        if !tags.escaped.is_empty() {
            return Err(TemplateError::EscapedPlaceholder(
                tags.escaped.into_iter().collect(),
            ));
        }
        let template = mustache::compile_str(source).map_err(TemplateError::Compile)?;
        Ok(Self {
            template,
            placeholders: tags.names,
        })
    }

    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    pub fn render(&self, parameters: &UpgradeParameters) -> Result<String, TemplateError> {
        parameters.validate()?;
        self.check_fields(&parameters.field_names()?)?;
        let data = serde_json::to_value(parameters).map_err(TemplateError::Serialize)?;
        self.template
            .render_to_string(&quote_strings(data)?)
            .map_err(TemplateError::Render)
    }

    fn check_fields(&self, fields: &BTreeSet<String>) -> Result<(), TemplateError> {
        let missing_fields: Vec<String> =
            self.placeholders.difference(fields).cloned().collect();
        let unused_fields: Vec<String> = fields.difference(&self.placeholders).cloned().collect();

        if missing_fields.is_empty() && unused_fields.is_empty() {
            Ok(())
        } else {
            Err(TemplateError::FieldMismatch {
                missing_fields,
                unused_fields,
            })
        }
    }
}

/// Turn every string into a double-quoted YAML scalar so a value can never
/// leave the node it is substituted into. Booleans stay as they are for
/// sections.
fn quote_strings(value: Value) -> Result<Value, TemplateError> {
    match value {
        Value::String(s) => {
            let json = serde_json::to_string(&s).map_err(TemplateError::Serialize)?;
            Ok(Value::String(escape_non_printable(&json)))
        }
        Value::Array(items) => items
            .into_iter()
            .map(quote_strings)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(fields) => fields
            .into_iter()
            .map(|(key, value)| quote_strings(value).map(|value| (key, value)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other),
    }
}

/// JSON leaves some characters raw that YAML treats as line breaks (NEL, LS,
/// PS) or rejects outright (DEL, C1 controls, BOM, noncharacters).
fn escape_non_printable(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '\u{7f}'..='\u{9f}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{feff}'
            | '\u{fffe}'
            | '\u{ffff}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out
}

/// Collect the variable and section names referenced by a mustache template.
///
/// Comments, partials and delimiter changes are skipped. Dotted names count
/// by their first segment.
pub fn placeholders(source: &str) -> BTreeSet<String> {
    scan(source).names
}

struct Tags {
    names: BTreeSet<String>,
    /// Plain `{{name}}` variables, which mustache HTML-escapes.
    escaped: BTreeSet<String>,
}

fn scan(source: &str) -> Tags {
    let mut names = BTreeSet::new();
    let mut escaped = BTreeSet::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        let tag = after_open[..end].trim();
        rest = &after_open[end + 2..];

        // Triple mustache leaves one extra closing brace behind.
        let (tag, triple) = match tag.strip_prefix('{') {
            Some(inner) => {
                rest = rest.strip_prefix('}').unwrap_or(rest);
                (inner, true)
            }
            None => (tag, false),
        };

        let (name, plain) = match tag.chars().next() {
            Some('!' | '>' | '=') | None => continue,
            Some('#' | '^' | '/' | '&') => (&tag[1..], false),
            Some(_) => (tag, !triple),
        };

        let name = name.trim();
        if name.is_empty() || name == "." {
            continue;
        }
        let root = name.split('.').next().unwrap_or(name);
        if plain {
            escaped.insert(root.to_string());
        }
        names.insert(root.to_string());
    }

    Tags { names, escaped }
}
