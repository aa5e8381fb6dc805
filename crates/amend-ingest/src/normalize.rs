// SPDX-License-Identifier: Apache-2.0

//! Record normalizer: resolves free-text municipality names to the
//! canonical census table loaded once at step start.

use amend_model::{MatchOutcome, MatchReport, MunicipalityMatchPolicy, TownPopulation};
use regex::Regex;
use std::sync::OnceLock;

/// Immutable canonical-name index built from the census table.
#[derive(Debug, Clone)]
pub struct TownIndex {
    names_sorted: Vec<String>,
    policy: MunicipalityMatchPolicy,
}

impl TownIndex {
    #[must_use]
    pub fn new(towns: &[TownPopulation], policy: MunicipalityMatchPolicy) -> Self {
        let mut names_sorted: Vec<String> = towns.iter().map(|t| t.name.clone()).collect();
        names_sorted.sort();
        names_sorted.dedup();
        Self {
            names_sorted,
            policy,
        }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names_sorted
    }

    /// Resolve one name, tallying the outcome.
    #[must_use]
    pub fn resolve(&self, raw: &str, report: &mut MatchReport) -> MatchOutcome {
        let outcome = self.policy.resolve(raw, &self.names_sorted);
        report.record(raw, &outcome);
        outcome
    }

    /// Exact-or-alias resolution only. Used for prose annotation, where
    /// most candidate phrases are not place names at all and fuzzy
    /// matching (and unmatched tallies) would be noise.
    #[must_use]
    pub fn resolve_exact(&self, raw: &str) -> Option<String> {
        let folded = self.policy.fold(raw);
        if folded.is_empty() {
            return None;
        }
        self.names_sorted
            .iter()
            .find(|n| n.to_lowercase() == folded)
            .cloned()
            .or_else(|| self.policy.aliases.get(&folded).cloned())
    }
}

fn proper_noun_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:\s*\b[A-Z][a-z\-]+\b)+").expect("proper noun regex"))
}

/// Extract maximal runs of capitalized words ("Rever Copper Products, Inc.
/// of New Bedford" → ["Rever Copper Products", "Inc", "New Bedford"]).
#[must_use]
pub fn extract_proper_nouns(text: &str) -> Vec<String> {
    proper_noun_re()
        .find_iter(text)
        .map(|m| m.as_str().trim_start().to_string())
        .collect()
}

/// Canonical municipalities named in free prose: every proper-noun phrase
/// that exactly resolves against the town index, deduplicated and sorted.
#[must_use]
pub fn annotate_municipalities(text: &str, index: &TownIndex) -> Vec<String> {
    let mut out: Vec<String> = extract_proper_nouns(text)
        .iter()
        .filter_map(|phrase| index.resolve_exact(phrase))
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> TownIndex {
        let towns = vec![
            TownPopulation::new("Boston", 667_137).expect("town"),
            TownPopulation::new("New Bedford", 95_078).expect("town"),
            TownPopulation::new("Worcester", 184_508).expect("town"),
        ];
        TownIndex::new(&towns, MunicipalityMatchPolicy::default())
    }

    #[test]
    fn proper_noun_runs_are_extracted() {
        let phrases =
            extract_proper_nouns("Rever Copper Products, Inc. of New Bedford was cited");
        assert!(phrases.contains(&"Rever Copper Products".to_string()));
        assert!(phrases.contains(&"New Bedford".to_string()));
    }

    #[test]
    fn prose_annotation_finds_only_real_towns() {
        let text = "MassDEP entered into a Consent Order with Glyptal, Inc. for violations \
                    at a work site in Worcester and another in New Bedford.";
        let towns = annotate_municipalities(text, &index());
        assert_eq!(towns, vec!["New Bedford".to_string(), "Worcester".to_string()]);
    }

    #[test]
    fn alias_known_to_the_policy_resolves_in_prose() {
        let policy = MunicipalityMatchPolicy::default().with_aliases(
            [("hub of the universe".to_string(), "Boston".to_string())].into(),
        );
        let towns = vec![TownPopulation::new("Boston", 667_137).expect("town")];
        let index = TownIndex::new(&towns, policy);
        assert_eq!(index.resolve_exact("City of Boston").as_deref(), Some("Boston"));
        assert_eq!(
            index.resolve_exact("Hub of the Universe").as_deref(),
            Some("Boston")
        );
    }

    #[test]
    fn resolve_tallies_into_the_report() {
        let idx = index();
        let mut report = MatchReport::default();
        idx.resolve("Worcester", &mut report);
        idx.resolve("Atlantis", &mut report);
        assert_eq!(report.exact, 1);
        assert_eq!(report.unmatched, 1);
    }
}
