//! Typing progress: how many of a gem's methods have recorded observations.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::{Analysis, MethodKind};
use crate::samples::TypeSample;

/// A (namespace, method) pair with at least one resolvable observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampledMethod {
    /// Qualified name of the resolved namespace.
    pub namespace: String,
    pub method: String,
    pub kind: MethodKind,
    /// Number of observations recorded for the pair.
    pub count: usize,
}

/// Group `samples` by (receiver, method name) and keep the groups whose
/// receiver resolves to a namespace declaring that method. Ordered by
/// (receiver, method name).
#[must_use]
pub fn sampled_methods(analysis: &Analysis, samples: &[TypeSample]) -> Vec<SampledMethod> {
    let mut groups: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for sample in samples {
        *groups
            .entry((sample.receiver.as_str(), sample.method_name.as_str()))
            .or_default() += 1;
    }

    groups
        .into_iter()
        .filter_map(|((receiver, method_name), count)| {
            let namespace = analysis.find_namespace(receiver)?;
            let method = namespace.find_method(method_name)?;
            Some(SampledMethod {
                namespace: namespace.qualified_name.clone(),
                method: method.name.clone(),
                kind: method.kind,
                count,
            })
        })
        .collect()
}

/// `covered / total` as a percentage rounded to one decimal; `0.0` when
/// there are no methods.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn typing_progress(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = covered as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}
