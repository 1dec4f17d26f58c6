use std::collections::HashSet;

use tracing::warn;

/// Maximum sheet name length accepted by Excel.
pub const MAX_SHEET_NAME_LEN: usize = 31;
/// Characters Excel refuses in sheet names.
pub const FORBIDDEN_SHEET_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

const FALLBACK_SHEET_NAME: &str = "Sheet";

/// Removes forbidden characters and truncates to 31 characters.
///
/// Nothing is substituted for the removed characters, so the result may be
/// empty. Applying it to its own output is a no-op.
pub fn sheet_name(label: &str) -> String {
    label
        .chars()
        .filter(|ch| !FORBIDDEN_SHEET_CHARS.contains(ch))
        .take(MAX_SHEET_NAME_LEN)
        .collect()
}

/// Hands out sheet names that are unique within one workbook.
///
/// Excel compares sheet names case-insensitively, so the registry does too.
#[derive(Debug, Default)]
pub struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    /// Derives a name for `label` that no earlier call has returned.
    pub fn assign(&mut self, label: &str) -> String {
        let cleaned = sheet_name(label);
        let trimmed = cleaned.trim_matches('\'');
        let base = if trimmed.is_empty() {
            FALLBACK_SHEET_NAME.to_string()
        } else {
            trimmed.to_string()
        };

        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let max_len = MAX_SHEET_NAME_LEN - suffix.chars().count();
            let prefix: String = base.chars().take(max_len).collect();
            let candidate = format!("{}{suffix}", prefix.trim_end_matches('\''));
            if self.used.insert(candidate.to_lowercase()) {
                warn!(label, sheet = %candidate, "sheet name collision, using suffixed name");
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid(name: &str) -> bool {
        name.chars().count() <= MAX_SHEET_NAME_LEN
            && !name.chars().any(|ch| FORBIDDEN_SHEET_CHARS.contains(&ch))
    }

    #[test]
    fn strips_forbidden_characters_without_substitution() {
        assert_eq!(sheet_name("TXO__G/L [Accounts]?"), "TXO__GL Accounts");
    }

    #[test]
    fn truncates_to_31_characters() {
        let name = sheet_name("CRONUS International Ltd.__IntercompanyPartner");
        assert_eq!(name, "CRONUS International Ltd.__Inte");
        assert_eq!(name.chars().count(), 31);
    }

    #[test]
    fn only_forbidden_characters_yields_empty_name() {
        assert_eq!(sheet_name(":\\/?*[]"), "");
    }

    #[test]
    fn derivation_is_idempotent_and_valid() {
        let samples = [
            "",
            "plain",
            "a:b\\c/d?e*f[g]h",
            "ÅÄÖ-company with a rather long name__Customers",
            "[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[]]]]",
            "x".repeat(100).as_str(),
        ]
        .map(str::to_string);
        for sample in samples {
            let once = sheet_name(&sample);
            assert!(is_valid(&once), "{once:?} is not a valid sheet name");
            assert_eq!(sheet_name(&once), once);
        }
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let name = sheet_name(&"é".repeat(40));
        assert_eq!(name.chars().count(), 31);
    }

    #[test]
    fn registry_disambiguates_collisions() {
        let mut registry = SheetNameRegistry::default();
        let long = "A".repeat(40);
        let first = registry.assign(&format!("{long}__X"));
        let second = registry.assign(&format!("{long}__Y"));

        assert_eq!(first, "A".repeat(31));
        assert_eq!(second, format!("{}_1", "A".repeat(29)));
        assert!(is_valid(&second));
    }

    #[test]
    fn registry_treats_names_case_insensitively() {
        let mut registry = SheetNameRegistry::default();
        assert_eq!(registry.assign("TXO__Items"), "TXO__Items");
        assert_eq!(registry.assign("txo__items"), "txo__items_1");
    }

    #[test]
    fn registry_replaces_empty_names() {
        let mut registry = SheetNameRegistry::default();
        assert_eq!(registry.assign("::"), "Sheet");
        assert_eq!(registry.assign("//"), "Sheet_1");
        assert_eq!(registry.assign("'quoted'"), "quoted");
    }
}
