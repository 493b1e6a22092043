//! Gemspec manifest decoding.
//!
//! The `metadata` member of a `.gem` is YAML written by Psych, with Ruby
//! object tags on the spec itself and on nested versions, requirements and
//! dependencies. Decoding never fails: a manifest that references a tag
//! outside [`ALLOWED_TAGS`], or that does not have the expected shape,
//! degrades to [`Metadata::default`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::Span;

/// Ruby tags a gemspec may carry. Anything else is untrusted.
pub const ALLOWED_TAGS: &[&str] = &[
    "ruby/object:Gem::Specification",
    "ruby/object:Gem::Dependency",
    "ruby/object:Gem::Requirement",
    "ruby/object:Gem::Version",
    "ruby/object:Gem::Version::Requirement",
    "ruby/object:Gem::Platform",
    "ruby/object:Time",
    "ruby/sym",
    "ruby/symbol",
    "binary",
    "tag:yaml.org,2002:binary",
];

const VERSION_TAG: &str = "ruby/object:Gem::Version";
const BINARY_TAGS: &[&str] = &["binary", "tag:yaml.org,2002:binary"];
const REQUIREMENT_TAGS: &[&str] = &[
    "ruby/object:Gem::Requirement",
    "ruby/object:Gem::Version::Requirement",
];

/// Deserialized gem manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(deserialize_with = "string_or_empty")]
    pub version: String,
    #[serde(deserialize_with = "optional_string")]
    pub summary: Option<String>,
    #[serde(deserialize_with = "optional_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "string_list")]
    pub authors: Vec<String>,
    /// Psych writes a single address as a scalar and several as a list.
    #[serde(deserialize_with = "string_list")]
    pub email: Vec<String>,
    #[serde(deserialize_with = "optional_string")]
    pub homepage: Option<String>,
    #[serde(deserialize_with = "string_list")]
    pub licenses: Vec<String>,
    /// Every path shipped in the payload, relative to `data/`.
    #[serde(deserialize_with = "string_list")]
    pub files: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub require_paths: Vec<String>,
    /// Constraints such as `>= 3.1`.
    #[serde(deserialize_with = "string_list")]
    pub required_ruby_version: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub dependencies: Vec<Dependency>,
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: BTreeMap<String, String>,
}

impl Metadata {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn runtime_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(|dep| dep.kind == DependencyKind::Runtime)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Version constraints, e.g. `["~> 7.1", ">= 7.1.3"]`.
    #[serde(default, deserialize_with = "string_list")]
    pub requirement: Vec<String>,
    #[serde(default, rename = "type")]
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    #[default]
    #[serde(alias = ":runtime")]
    Runtime,
    #[serde(alias = ":development")]
    Development,
}

/// Why a manifest was rejected. Never surfaced; logged and replaced with an
/// empty record.
#[derive(Debug, thiserror::Error)]
enum DecodeError {
    #[error("disallowed tag !{tag}")]
    DisallowedTag { tag: String },

    #[error("binary scalar is not base64-encoded UTF-8")]
    Binary,

    #[error("malformed manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Decodes manifests against the [`ALLOWED_TAGS`] allow-list.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataCodec;

impl MetadataCodec {
    /// Read and decode the manifest at `path`.
    ///
    /// Diagnostics are emitted inside `span` so they carry the gem's name and
    /// version.
    #[must_use]
    pub fn load(self, path: &Path, span: &Span) -> Metadata {
        match std::fs::read_to_string(path) {
            Ok(raw) => self.decode(&raw, span),
            Err(error) => {
                tracing::warn!(
                    parent: span,
                    path = %path.display(),
                    %error,
                    "metadata unreadable; using empty manifest"
                );
                Metadata::default()
            }
        }
    }

    /// Decode a manifest, falling back to an empty record on any failure.
    #[must_use]
    pub fn decode(self, raw: &str, span: &Span) -> Metadata {
        match decode_checked(raw) {
            Ok(metadata) => metadata,
            Err(error) => {
                tracing::debug!(parent: span, %error, "metadata rejected; using empty manifest");
                Metadata::default()
            }
        }
    }
}

fn decode_checked(raw: &str) -> Result<Metadata, DecodeError> {
    let value: Value = serde_yaml::from_str(raw)?;
    let plain = untag(value)?;
    Ok(serde_yaml::from_value(plain)?)
}

/// Check every tag against the allow-list and rewrite tagged Ruby objects
/// into plain YAML: versions collapse to their number, requirements to a list
/// of `op version` strings, other objects to their mapping.
fn untag(value: Value) -> Result<Value, DecodeError> {
    match value {
        Value::Tagged(tagged) => {
            let tag = tag_name(&tagged.tag);
            if !ALLOWED_TAGS.contains(&tag.as_str()) {
                return Err(DecodeError::DisallowedTag { tag });
            }
            let inner = untag(tagged.value)?;
            Ok(if BINARY_TAGS.contains(&tag.as_str()) {
                decode_binary(&inner)?
            } else if tag == VERSION_TAG {
                collapse_version(inner)
            } else if REQUIREMENT_TAGS.contains(&tag.as_str()) {
                collapse_requirement(inner)
            } else {
                inner
            })
        }
        Value::Sequence(items) => items
            .into_iter()
            .map(untag)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (key, value) in map {
                out.insert(untag(key)?, untag(value)?);
            }
            Ok(Value::Mapping(out))
        }
        scalar => Ok(scalar),
    }
}

/// Psych writes strings that are not valid UTF-8 in its source encoding as
/// `!binary` base64. Only payloads that decode to UTF-8 text are kept.
fn decode_binary(value: &Value) -> Result<Value, DecodeError> {
    let Value::String(encoded) = value else {
        return Err(DecodeError::Binary);
    };
    let compact: String = encoded.split_whitespace().collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|_| DecodeError::Binary)?;
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|_| DecodeError::Binary)
}

fn tag_name(tag: &serde_yaml::value::Tag) -> String {
    tag.to_string().trim_start_matches('!').to_string()
}

fn collapse_version(value: Value) -> Value {
    let number = match &value {
        Value::Mapping(map) => map.get("version").map(scalar_text),
        _ => None,
    };
    number.map_or(value, Value::String)
}

fn collapse_requirement(value: Value) -> Value {
    let Value::Mapping(map) = &value else {
        return value;
    };
    let Some(Value::Sequence(pairs)) = map.get("requirements") else {
        return value;
    };
    let constraints = pairs
        .iter()
        .filter_map(|pair| match pair {
            Value::Sequence(parts) if parts.len() == 2 => Some(Value::String(format!(
                "{} {}",
                scalar_text(&parts[0]),
                scalar_text(&parts[1])
            ))),
            _ => None,
        })
        .collect();
    Value::Sequence(constraints)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

// ── Lenient field decoders ─────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Scalar),
    Many(Vec<Option<Scalar>>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Num(serde_yaml::Number),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Num(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item.to_string()],
        Some(OneOrMany::Many(items)) => items.into_iter().flatten().map(|s| s.to_string()).collect(),
    })
}

fn optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty()))
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(optional_string(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
