use std::collections::HashSet;

use heck::{ToLowerCamelCase, ToPascalCase, ToSnakeCase};

pub fn convert<T: NamingConvention>(source: &str) -> String {
    T::apply(source)
}

pub trait NamingConvention {
    fn apply(name: &str) -> String;
}

pub struct SnakeCase;

impl NamingConvention for SnakeCase {
    fn apply(name: &str) -> String {
        name.to_snake_case()
    }
}

pub struct CamelCase;

impl NamingConvention for CamelCase {
    fn apply(name: &str) -> String {
        name.to_lower_camel_case()
    }
}

pub struct PascalCase;

impl NamingConvention for PascalCase {
    fn apply(name: &str) -> String {
        name.to_pascal_case()
    }
}

/// Like [`convert`], but keeps a trailing [`DISAMBIGUATION_SUFFIX`] so that `Foo` and `Foo_` stay
/// apart.
pub fn convert_disambiguated<T: NamingConvention>(name: &str) -> String {
    let trimmed = name.trim_end_matches(DISAMBIGUATION_SUFFIX);
    T::apply(trimmed) + &name[trimmed.len()..]
}

/// The display name of a schema identifier: PascalCase, or `None` if nothing usable is left
/// (e.g. for `"_"`).
pub fn normalize(name: &str) -> Option<String> {
    let normalized = convert::<PascalCase>(name);
    (!normalized.is_empty()).then_some(normalized)
}

/// Name for a field, option or parameter without a usable name of its own.
pub fn synthesize(prefix: &str, position: impl std::fmt::Display) -> String {
    format!("{prefix}{position}")
}

/// Suffix appended when a name is already taken in its scope.
pub const DISAMBIGUATION_SUFFIX: &str = "_";

/// Picks the first free name among `candidate` and `candidate` + [`DISAMBIGUATION_SUFFIX`], in
/// that order. Returns `None` when both are reserved.
///
/// A name that already carries the suffix maps to itself as long as it is free, so applying the
/// rule twice changes nothing.
pub fn disambiguate(candidate: &str, reserved: &HashSet<String>) -> Option<String> {
    if !reserved.contains(candidate) {
        return Some(candidate.to_string());
    }
    let suffixed = format!("{candidate}{DISAMBIGUATION_SUFFIX}");
    (!reserved.contains(&suffixed)).then_some(suffixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserved(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn pascal_case_normalization() {
        assert_eq!(normalize("record").as_deref(), Some("Record"));
        assert_eq!(normalize("get_proposal_info").as_deref(), Some("GetProposalInfo"));
        assert_eq!(normalize("e8s").as_deref(), Some("E8s"));
        assert_eq!(normalize("Ok").as_deref(), Some("Ok"));
        assert_eq!(normalize("_"), None);
    }

    #[test]
    fn other_conventions() {
        assert_eq!(convert::<SnakeCase>("GetProposalInfo"), "get_proposal_info");
        assert_eq!(convert::<CamelCase>("account_balance"), "accountBalance");
        assert_eq!(convert_disambiguated::<SnakeCase>("Record_"), "record_");
        assert_eq!(convert_disambiguated::<CamelCase>("AccountId_"), "accountId_");
        assert_eq!(convert_disambiguated::<SnakeCase>("AccountId"), "account_id");
    }

    #[test]
    fn synthesized_names() {
        assert_eq!(synthesize("F", 0u32), "F0");
        assert_eq!(synthesize("arg", 2usize), "arg2");
    }

    #[test]
    fn free_name_is_kept() {
        assert_eq!(
            disambiguate("Owner", &reserved(&["Record"])).as_deref(),
            Some("Owner")
        );
    }

    #[test]
    fn taken_name_gets_suffix() {
        let taken = reserved(&["Record"]);
        let once = disambiguate("Record", &taken).unwrap();
        assert_eq!(once, "Record_");
        // Idempotent
        assert_eq!(disambiguate(&once, &taken).as_deref(), Some("Record_"));
    }

    #[test]
    fn exhausted_attempts() {
        assert_eq!(disambiguate("A", &reserved(&["A", "A_"])), None);
    }
}
