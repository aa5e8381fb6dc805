// SPDX-License-Identifier: Apache-2.0

//! Penalty-amount extraction from enforcement prose.
//!
//! Keeps the archive's documented approximation: the first dollar amount
//! in the text is the penalty, refined only when that amount is the lead
//! of a "$X million" phrase. Prose listing several amounts (partial
//! suspensions, multi-year schedules) keeps the first amount and is
//! flagged `Ambiguous`.

use amend_model::PenaltyConfidence;
use regex::Regex;
use std::sync::OnceLock;

fn currency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$[0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})?\b").expect("currency regex")
    })
}

fn currency_millions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$[0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{1,2})? million\b")
            .expect("currency millions regex")
    })
}

/// Extract the penalty amount in dollars, with a confidence flag.
#[must_use]
pub fn extract_penalty(text: &str) -> (Option<f64>, PenaltyConfidence) {
    let matches: Vec<_> = currency_re().find_iter(text).collect();
    let Some(first) = matches.first() else {
        return (None, PenaltyConfidence::None);
    };

    let confidence = if matches.len() > 1 {
        PenaltyConfidence::Ambiguous
    } else {
        PenaltyConfidence::Single
    };

    // "$1.3 million": the plain pattern stops at "$1"; when a millions
    // phrase starts at the same offset, its full figure wins.
    if let Some(millions) = currency_millions_re()
        .find_iter(text)
        .find(|m| m.start() == first.start())
    {
        let figure = millions
            .as_str()
            .trim_start_matches('$')
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .replace(',', "");
        if let Ok(v) = figure.parse::<f64>() {
            return (Some(v * 1e6), confidence);
        }
    }

    let figure = first.as_str().trim_start_matches('$').replace(',', "");
    match figure.parse::<f64>() {
        Ok(v) => (Some(v), confidence),
        Err(_) => (None, PenaltyConfidence::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_penalty_with_thousands_separator() {
        let (v, c) = extract_penalty(
            "MassDEP entered into a Consent Order with a $53,938 Penalty involving \
             Charles Wilmot, a home improvement contractor.",
        );
        assert_eq!(v, Some(53938.0));
        assert_eq!(c, PenaltyConfidence::Single);
    }

    #[test]
    fn cents_are_preserved() {
        let (v, c) = extract_penalty("assessed a $2,524.50 Penalty");
        assert_eq!(v, Some(2524.5));
        assert_eq!(c, PenaltyConfidence::Single);
    }

    #[test]
    fn million_phrase_scales_the_figure() {
        let (v, _) = extract_penalty("agreed to pay a $1.3 million settlement");
        assert_eq!(v, Some(1.3e6));
        let (v, _) = extract_penalty("a $2 million supplemental environmental project");
        assert_eq!(v, Some(2.0e6));
    }

    #[test]
    fn first_amount_wins_and_is_flagged_ambiguous() {
        // Documented approximation: later amounts (suspensions, balances)
        // are ignored, and the multi-amount prose is flagged.
        let (v, c) = extract_penalty(
            "a $30,000 Penalty; the respondent has agreed to pay $5,000 with the \
             remaining $25,000 suspended pending compliance",
        );
        assert_eq!(v, Some(30000.0));
        assert_eq!(c, PenaltyConfidence::Ambiguous);
    }

    #[test]
    fn text_without_dollars_yields_none() {
        let (v, c) = extract_penalty("MassDEP issued a Notice of Noncompliance in Worcester.");
        assert_eq!(v, None);
        assert_eq!(c, PenaltyConfidence::None);
    }
}
