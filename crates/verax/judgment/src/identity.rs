//! Deterministic finding identity
//!
//! Both hashes are SHA-256 truncated to 16 hex characters. The identity
//! hash is a function of the finding's structural coordinates only; the
//! determinism hash additionally covers the judged content, but never
//! timestamps or generated ids.

use sha2::{Digest, Sha256};
use verax_types::{Interaction, Judgment, Severity, SignalKind};

const HASH_LEN: usize = 16;

/// SHA-256 of a canonical payload, truncated to 16 hex characters.
pub fn short_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let mut hash = hex::encode(hasher.finalize());
    hash.truncate(HASH_LEN);
    hash
}

/// Stable identity across runs for a fixed source.
///
/// Covers exactly (finding type, interaction type, interaction selector,
/// promise target path, interaction URL path). Nothing else may enter.
pub fn identity_hash(
    finding_type: &str,
    interaction: Option<&Interaction>,
    target_path: Option<&str>,
) -> String {
    let (itype, selector, url_path) = match interaction {
        Some(i) => (
            i.interaction_type.as_str(),
            i.selector.as_str(),
            i.url_path.as_str(),
        ),
        None => ("", "", ""),
    };
    let payload = format!(
        "{finding_type}|{itype}|{selector}|{target}|{url_path}",
        target = target_path.unwrap_or("")
    );
    short_hash(&payload)
}

/// Content fingerprint excluding volatile fields.
pub fn determinism_hash(
    identity: &str,
    judgment: Judgment,
    severity: Severity,
    signals_present: &[SignalKind],
) -> String {
    let mut sorted = signals_present.to_vec();
    sorted.sort();
    sorted.dedup();
    let signals = sorted
        .iter()
        .map(|s| format!("{s:?}"))
        .collect::<Vec<_>>()
        .join(",");
    let payload = format!("{identity}|{judgment:?}|{severity:?}|{signals}");
    short_hash(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction() -> Interaction {
        Interaction::new("click", "#save", "/settings")
    }

    #[test]
    fn test_hash_is_sixteen_hex_chars() {
        let h = short_hash("payload");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identity_depends_only_on_coordinates() {
        let a = identity_hash("promise-verification", Some(&interaction()), Some("/done"));
        let b = identity_hash("promise-verification", Some(&interaction()), Some("/done"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_changes_with_selector() {
        let a = identity_hash("promise-verification", Some(&interaction()), Some("/done"));
        let other = Interaction::new("click", "#cancel", "/settings");
        let b = identity_hash("promise-verification", Some(&other), Some("/done"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_without_interaction_is_stable() {
        let a = identity_hash("promise-verification", None, Some("/done"));
        let b = identity_hash("promise-verification", None, Some("/done"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_determinism_hash_sorts_signals() {
        let id = "abcdef0123456789";
        let a = determinism_hash(
            id,
            Judgment::Pass,
            Severity::Low,
            &[SignalKind::RouteChanged, SignalKind::DomChanged],
        );
        let b = determinism_hash(
            id,
            Judgment::Pass,
            Severity::Low,
            &[SignalKind::DomChanged, SignalKind::RouteChanged],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_determinism_hash_sees_judgment() {
        let id = "abcdef0123456789";
        let a = determinism_hash(id, Judgment::Pass, Severity::Low, &[]);
        let b = determinism_hash(id, Judgment::FailureSilent, Severity::Low, &[]);
        assert_ne!(a, b);
    }

    mod laws {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_short_hash_is_16_hex(payload in ".{0,64}") {
                let h = short_hash(&payload);
                prop_assert_eq!(h.len(), 16);
                prop_assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
            }

            #[test]
            fn prop_identity_is_a_pure_function(
                selector in "[a-z#.-]{1,12}",
                target in "/[a-z/]{0,12}",
            ) {
                let i = Interaction::new("click", selector, "/from");
                let a = identity_hash("promise-verification", Some(&i), Some(&target));
                let b = identity_hash("promise-verification", Some(&i), Some(&target));
                prop_assert_eq!(a, b);
            }
        }
    }
}
