use crate::distro::{DistroCatalog, DistroPerLanguage};
use crate::rules::InstrumentationRule;

/// Merges the catalog defaults with distro overrides from the rules that
/// apply to a workload.
///
/// Rules are applied in ascending `(ruleName, name)` order and the last
/// override for a language wins, so the result never depends on the order
/// the rules were listed in. Unknown distro names are skipped.
pub fn resolve_distro_per_language(
    catalog: &DistroCatalog,
    rules: &[&InstrumentationRule],
) -> DistroPerLanguage {
    let mut per_language = catalog.default_distro_names().clone();

    let mut ordered: Vec<&InstrumentationRule> = rules
        .iter()
        .copied()
        .filter(|rule| !rule.disabled && rule.otel_distros.is_some())
        .collect();
    ordered.sort_by(|a, b| a.priority_key().cmp(&b.priority_key()));

    for rule in ordered {
        let Some(distros) = &rule.otel_distros else {
            continue;
        };
        for name in &distros.otel_distro_names {
            if let Some(distro) = catalog.get(name) {
                per_language.insert(distro.language, distro.name.clone());
            }
        }
    }

    per_language
}
