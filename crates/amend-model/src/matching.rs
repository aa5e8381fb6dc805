// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Similarity threshold below which a fuzzy candidate is rejected.
pub const MATCH_THRESHOLD_DEFAULT: f64 = 0.84;

/// Outcome of resolving a free-text entity name against the canonical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MatchOutcome {
    Exact { canonical: String },
    Alias { canonical: String },
    Fuzzy { canonical: String, similarity: f64 },
    Unmatched,
}

impl MatchOutcome {
    #[must_use]
    pub fn canonical(&self) -> Option<&str> {
        match self {
            Self::Exact { canonical }
            | Self::Alias { canonical }
            | Self::Fuzzy { canonical, .. } => Some(canonical),
            Self::Unmatched => None,
        }
    }
}

/// Name-resolution policy for municipalities and facilities.
///
/// Matching order: exact (case-folded) → alias table → fuzzy similarity
/// above `threshold`. Fuzzy ties break by highest similarity, then by
/// alphabetical canonical name; the canonical list is kept sorted so the
/// first candidate at the best score wins deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct MunicipalityMatchPolicy {
    /// Civic prefixes stripped before matching ("City of Boston" → "Boston").
    pub strip_prefixes: Vec<String>,
    /// Explicit alias → canonical overrides, keyed by folded alias.
    pub aliases: BTreeMap<String, String>,
    pub threshold: f64,
}

impl Default for MunicipalityMatchPolicy {
    fn default() -> Self {
        Self {
            strip_prefixes: vec![
                "city of ".to_string(),
                "town of ".to_string(),
                "village of ".to_string(),
            ],
            aliases: BTreeMap::new(),
            threshold: MATCH_THRESHOLD_DEFAULT,
        }
    }
}

impl MunicipalityMatchPolicy {
    #[must_use]
    pub fn with_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Case-fold and strip civic prefixes and surrounding whitespace.
    #[must_use]
    pub fn fold(&self, raw: &str) -> String {
        let mut s = raw.trim().to_lowercase();
        for prefix in &self.strip_prefixes {
            if let Some(rest) = s.strip_prefix(prefix.as_str()) {
                s = rest.trim().to_string();
                break;
            }
        }
        s
    }

    /// Resolve `raw` against `canonical_sorted`, which must be sorted
    /// ascending (the caller loads it once at process start).
    #[must_use]
    pub fn resolve(&self, raw: &str, canonical_sorted: &[String]) -> MatchOutcome {
        let folded = self.fold(raw);
        if folded.is_empty() {
            return MatchOutcome::Unmatched;
        }

        for name in canonical_sorted {
            if name.to_lowercase() == folded {
                return MatchOutcome::Exact {
                    canonical: name.clone(),
                };
            }
        }

        if let Some(canonical) = self.aliases.get(&folded) {
            return MatchOutcome::Alias {
                canonical: canonical.clone(),
            };
        }

        let mut best: Option<(f64, &String)> = None;
        for name in canonical_sorted {
            let sim = similarity(&folded, &name.to_lowercase());
            let better = match best {
                None => sim >= self.threshold,
                // Strict > keeps the alphabetically-first name on ties.
                Some((best_sim, _)) => sim >= self.threshold && sim > best_sim,
            };
            if better {
                best = Some((sim, name));
            }
        }
        match best {
            Some((similarity, name)) => MatchOutcome::Fuzzy {
                canonical: name.clone(),
                similarity,
            },
            None => MatchOutcome::Unmatched,
        }
    }
}

/// Normalized Levenshtein similarity: 1 - distance / max_len, in [0,1].
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let max_len = a_chars.len().max(b_chars.len());
    if max_len == 0 {
        return 1.0;
    }
    let dist = levenshtein(&a_chars, &b_chars);
    1.0 - (dist as f64) / (max_len as f64)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Tally of name-resolution outcomes for one dataset build. Unmatched
/// inputs are counted and listed, never silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct MatchReport {
    pub exact: u64,
    pub alias: u64,
    pub fuzzy: u64,
    pub unmatched: u64,
    pub unmatched_names: Vec<String>,
}

impl MatchReport {
    pub fn record(&mut self, raw: &str, outcome: &MatchOutcome) {
        match outcome {
            MatchOutcome::Exact { .. } => self.exact += 1,
            MatchOutcome::Alias { .. } => self.alias += 1,
            MatchOutcome::Fuzzy { .. } => self.fuzzy += 1,
            MatchOutcome::Unmatched => {
                self.unmatched += 1;
                self.unmatched_names.push(raw.to_string());
            }
        }
    }
}
