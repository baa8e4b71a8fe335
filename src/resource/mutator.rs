//! Validation rule construction.
//!
//! Pure functions only: no I/O, no mutation of the input list.

use crate::resource::model::{Backend, PathRule, ServicePort};

/// Pattern under which the domain-validation challenge is served.
pub const VALIDATION_PATH: &str = "/.well-known/*";

/// Path type attached to the validation rule. The wildcard pattern is only
/// meaningful to implementation-specific matchers.
pub const VALIDATION_PATH_TYPE: &str = "ImplementationSpecific";

/// Return `rules` with the synthetic validation rule appended.
pub fn add_validation_rule(
    rules: &[PathRule],
    service_name: &str,
    service_port: impl Into<ServicePort>,
) -> Vec<PathRule> {
    let mut next = Vec::with_capacity(rules.len() + 1);
    next.extend_from_slice(rules);
    next.push(validation_rule(service_name, service_port));
    next
}

/// The synthetic rule on its own.
pub fn validation_rule(service_name: &str, service_port: impl Into<ServicePort>) -> PathRule {
    PathRule::new(VALIDATION_PATH, Backend::new(service_name, service_port))
        .with_path_type(VALIDATION_PATH_TYPE)
}

/// True when `rules` already routes the validation pattern somewhere.
pub fn has_validation_rule(rules: &[PathRule]) -> bool {
    rules.iter().any(|r| r.path == VALIDATION_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original() -> Vec<PathRule> {
        vec![
            PathRule::new("/a", Backend::new("svc-a", 80)).with_path_type("Prefix"),
            PathRule::new("/b", Backend::new("svc-b", 8080)),
        ]
    }

    #[test]
    fn test_appends_rule_targeting_service() {
        let rules = original();
        let next = add_validation_rule(&rules, "svc-validate", 8080);

        assert_eq!(next.len(), 3);
        assert_eq!(&next[..2], &rules[..]);
        let added = &next[2];
        assert_eq!(added.path, VALIDATION_PATH);
        assert_eq!(added.path_type.as_deref(), Some(VALIDATION_PATH_TYPE));
        assert_eq!(added.backend.to_string(), "svc-validate:8080");
    }

    #[test]
    fn test_input_untouched_and_output_deterministic() {
        let rules = original();
        let before = rules.clone();

        let first = add_validation_rule(&rules, "svc-validate", 8080);
        let second = add_validation_rule(&rules, "svc-validate", 8080);

        assert_eq!(first, second);
        assert_eq!(rules, before);
    }

    #[test]
    fn test_empty_list() {
        let next = add_validation_rule(&[], "svc-validate", ServicePort::Name("http".into()));
        assert_eq!(next, vec![validation_rule("svc-validate", ServicePort::Name("http".into()))]);
    }

    #[test]
    fn test_detects_leftover_rule() {
        assert!(!has_validation_rule(&original()));
        let next = add_validation_rule(&original(), "svc-validate", 8080);
        assert!(has_validation_rule(&next));
    }
}
