// SPDX-License-Identifier: Apache-2.0

//! MassDEP enforcement-action scraping.
//!
//! Each year's news archive is one HTML page of `<p>` paragraphs; an
//! action paragraph leads with its date (`M/D/YY:`). Parsing is
//! best-effort prose heuristics: penalty amounts and municipality mentions
//! carry explicit confidence flags rather than any guarantee.

use crate::fetch::FetchClient;
use crate::logging::{BuildLog, BuildStage};
use crate::normalize::{annotate_municipalities, TownIndex};
use crate::penalty::extract_penalty;
use crate::IngestError;
use amend_model::EnforcementAction;
use regex::Regex;
use std::sync::OnceLock;

/// Order-type keywords tested (lowercased) against every action's prose.
pub const ORDER_TYPES: &[&str] = &[
    "consent order",
    "unilateral order",
    "demand",
    "demand notice",
    "agreement",
    "notice of noncompliance",
    "boil water order",
    "settlement agreement",
    "amendment",
    "penalty assessment notice",
    "civil administrative penalty",
    "water supply",
    "attorney general",
    "hazardous waste",
    "sewer",
    "civil penalty",
    "supplemental environmental project",
    "gasoline",
    "asbestos",
    "wetlands",
    "stormwater",
];

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("paragraph regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex"))
}

fn dated_action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]{1,2}/[0-9]{1,2}/[0-9]{2,4}):\s*(.+)$").expect("dated action regex")
    })
}

/// Fetch one year archive page per year from `base_url_template`
/// (`{year}` placeholder). A failed fetch aborts the step.
pub fn fetch_enforcement_pages(
    client: &FetchClient,
    base_url_template: &str,
    years: &[u16],
) -> Result<Vec<(u16, String)>, IngestError> {
    let mut pages = Vec::with_capacity(years.len());
    for &year in years {
        let url = base_url_template.replace("{year}", &year.to_string());
        let html = client.get_text(&url)?;
        pages.push((year, html));
    }
    Ok(pages)
}

#[derive(Debug)]
pub struct EnforcementBuild {
    pub actions: Vec<EnforcementAction>,
    /// Paragraphs that did not lead with a date (navigation, alerts).
    pub skipped_paragraphs: u64,
    pub log: BuildLog,
}

pub fn build_enforcement(
    pages: &[(u16, String)],
    towns: &TownIndex,
) -> Result<EnforcementBuild, IngestError> {
    let mut log = BuildLog::default();
    let mut actions = Vec::new();
    let mut skipped_paragraphs = 0u64;

    for (year, html) in pages {
        let mut year_count = 0u64;
        for cap in paragraph_re().captures_iter(html) {
            let text = html_to_text(&cap[1]);
            let Some(dated) = dated_action_re().captures(&text) else {
                skipped_paragraphs += 1;
                continue;
            };
            let date = dated[1].to_string();
            let prose = dated[2].trim().to_string();
            let (penalty_dollars, penalty_confidence) = extract_penalty(&prose);
            let lower = prose.to_lowercase();
            let order_types = ORDER_TYPES
                .iter()
                .filter(|t| lower.contains(**t))
                .map(ToString::to_string)
                .collect();
            let municipalities = annotate_municipalities(&prose, towns);
            actions.push(EnforcementAction {
                year: *year,
                date,
                text: prose,
                penalty_dollars,
                penalty_confidence,
                order_types,
                municipalities,
            });
            year_count += 1;
        }
        if year_count == 0 {
            return Err(IngestError(format!(
                "MADEP_enforcement: year {year} page yielded no dated actions; page layout changed?"
            )));
        }
        log.emit_count(
            BuildStage::Parse,
            format!("enforcement.actions.{year}"),
            year_count,
        );
    }

    log.emit_count(BuildStage::Parse, "enforcement.actions", actions.len() as u64);
    log.emit_count(
        BuildStage::Parse,
        "enforcement.paragraphs.skipped",
        skipped_paragraphs,
    );
    Ok(EnforcementBuild {
        actions,
        skipped_paragraphs,
        log,
    })
}

/// Strip tags and collapse entity/whitespace noise from a paragraph body.
fn html_to_text(raw: &str) -> String {
    let no_tags = tag_re().replace_all(raw, " ");
    let decoded = no_tags
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
