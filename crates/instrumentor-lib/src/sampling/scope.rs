use crate::models::{PodWorkload, ProgrammingLanguage};
use crate::rules::SourceScope;

fn field_matches(expected: Option<&str>, actual: &str) -> bool {
    match expected {
        None | Some("") => true,
        Some(expected) => expected == actual,
    }
}

impl SourceScope {
    /// Every field set on the scope must equal the actual value
    pub fn matches(
        &self,
        workload: &PodWorkload,
        container_name: &str,
        language: ProgrammingLanguage,
    ) -> bool {
        field_matches(self.workload_name.as_deref(), &workload.name)
            && field_matches(self.workload_namespace.as_deref(), &workload.namespace)
            && field_matches(self.container_name.as_deref(), container_name)
            && self.workload_kind.map_or(true, |kind| kind == workload.kind)
            && self.workload_language.map_or(true, |lang| lang == language)
    }
}

/// An empty scope list applies to every source; otherwise any entry may match
pub fn is_in_scope(
    scopes: &[SourceScope],
    workload: &PodWorkload,
    container_name: &str,
    language: ProgrammingLanguage,
) -> bool {
    scopes.is_empty()
        || scopes
            .iter()
            .any(|scope| scope.matches(workload, container_name, language))
}
