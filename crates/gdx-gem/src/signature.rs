//! RBS signature rendering.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::GemError;
use crate::analysis::{MethodKind, MethodSpec, Namespace, NamespaceKind};
use crate::samples::TypeSample;

const UNTYPED: &str = "untyped";

impl Namespace {
    /// Render this namespace as RBS.
    ///
    /// `samples` may hold observations for any receiver; only those for this
    /// namespace are used. With `require_samples`, unsampled methods are
    /// left out and a namespace without sampled methods renders nothing.
    #[must_use]
    pub fn rbs_signature(&self, samples: &[TypeSample], require_samples: bool) -> Option<String> {
        let own: Vec<&TypeSample> = samples
            .iter()
            .filter(|s| s.receiver == self.qualified_name)
            .collect();

        let mut body = String::new();
        for method in &self.methods {
            let observed: Vec<&TypeSample> = own
                .iter()
                .copied()
                .filter(|s| s.method_name == method.name)
                .collect();
            if observed.is_empty() && require_samples {
                continue;
            }
            let _ = writeln!(body, "  {}", method_line(method, &observed));
        }

        if body.is_empty() && require_samples {
            return None;
        }

        let header = match (self.kind, &self.superclass) {
            (NamespaceKind::Class, Some(superclass)) => {
                format!("class {} < {superclass}", self.qualified_name)
            }
            (NamespaceKind::Class, None) => format!("class {}", self.qualified_name),
            (NamespaceKind::Module, _) => format!("module {}", self.qualified_name),
        };
        Some(format!("{header}\n{body}end"))
    }
}

fn method_line(method: &MethodSpec, observed: &[&TypeSample]) -> String {
    let name = match method.kind {
        MethodKind::Instance => method.name.clone(),
        MethodKind::Class => format!("self.{}", method.name),
    };
    if observed.is_empty() {
        return format!("def {name}: (?) -> {UNTYPED}");
    }

    let arity = observed.iter().map(|s| s.parameters.len()).max().unwrap_or(0);
    let params: Vec<String> = (0..arity)
        .map(|position| {
            let mut types = BTreeSet::new();
            let mut always_present = true;
            for sample in observed {
                match sample.parameters.get(position) {
                    Some(param) => {
                        types.insert(param.type_name.as_str());
                    }
                    None => always_present = false,
                }
            }
            let union = union_of(types);
            if always_present { union } else { format!("?{union}") }
        })
        .collect();

    let returns = union_of(
        observed
            .iter()
            .filter_map(|s| s.return_type.as_deref())
            .collect(),
    );
    format!("def {name}: ({}) -> {returns}", params.join(", "))
}

fn union_of(types: BTreeSet<&str>) -> String {
    match types.len() {
        0 => UNTYPED.to_string(),
        1 => types.into_iter().collect(),
        _ => format!("({})", types.into_iter().collect::<Vec<_>>().join(" | ")),
    }
}

/// Render every namespace and join the non-empty fragments with a blank line.
pub fn render_signatures<'a>(
    namespaces: impl IntoIterator<Item = &'a Namespace>,
    samples: &[TypeSample],
    require_samples: bool,
) -> String {
    namespaces
        .into_iter()
        .filter_map(|ns| ns.rbs_signature(samples, require_samples))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Return the contents of `path` if it exists; otherwise run `render`, write
/// its output to `path` and return it.
///
/// Concurrent callers for the same path may both render; the content is
/// deterministic so the last write wins harmlessly.
///
/// # Errors
///
/// Returns [`GemError::Io`] if the cache cannot be read or written, or any
/// error from `render`.
pub fn cached_or_render(
    path: &Path,
    render: impl FnOnce() -> Result<String, GemError>,
) -> Result<String, GemError> {
    if path.is_file() {
        tracing::debug!(path = %path.display(), "signature cache hit");
        return Ok(std::fs::read_to_string(path)?);
    }
    let content = render()?;
    std::fs::write(path, &content)?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "signature cache written");
    Ok(content)
}
