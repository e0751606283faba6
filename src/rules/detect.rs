//! Roof-system detection
//!
//! Rules are evaluated in priority order and the first match wins: vendor
//! identity, then vendor line-item wording, then the job description.
//! With no match the job is treated as a non-metal roof.

use crate::core::buildings::RoofSystem;
use crate::rules::AutoSelectionContext;

/// Which part of the context a detection rule reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Vendor names on the job's quotes
    VendorName,
    /// Item names on the job's quotes
    VendorLine,
    /// Free-text job description
    Description,
}

/// One priority-ordered detection rule
#[derive(Debug, Clone, Copy)]
pub struct DetectionRule {
    pub description: &'static str,
    pub signal: Signal,
    /// Any of these (case-insensitive substring) triggers the rule
    pub keywords: &'static [&'static str],
    /// None of these may be present in the matched text
    pub excludes: &'static [&'static str],
    pub roof_system: RoofSystem,
}

/// Detection rules in evaluation order
pub const DETECTION_RULES: &[DetectionRule] = &[
    DetectionRule {
        description: "metal panel vendor on the job",
        signal: Signal::VendorName,
        keywords: &["schafer", "rollfab", "sheffield metals", "metal sales"],
        excludes: &[],
        roof_system: RoofSystem::Metal,
    },
    DetectionRule {
        description: "vendor quote lists metal panel items",
        signal: Signal::VendorLine,
        keywords: &["standing seam", "panel", "seam", "coil"],
        excludes: &[],
        roof_system: RoofSystem::Metal,
    },
    DetectionRule {
        description: "description names Brava synthetic tile",
        signal: Signal::Description,
        keywords: &["brava", "synthetic tile", "synthetic slate"],
        excludes: &[],
        roof_system: RoofSystem::Brava,
    },
    DetectionRule {
        description: "description names DaVinci synthetic shake",
        signal: Signal::Description,
        keywords: &["davinci", "da vinci", "synthetic shake"],
        excludes: &[],
        roof_system: RoofSystem::Davinci,
    },
    DetectionRule {
        description: "description names a synthetic roof",
        signal: Signal::Description,
        keywords: &["synthetic"],
        excludes: &["synthetic underlayment"],
        roof_system: RoofSystem::Brava,
    },
    DetectionRule {
        description: "description names Presidential shingles",
        signal: Signal::Description,
        keywords: &["presidential"],
        excludes: &[],
        roof_system: RoofSystem::PresidentialAsphalt,
    },
    DetectionRule {
        description: "description names asphalt shingles",
        signal: Signal::Description,
        keywords: &["asphalt", "shingle", "composition", "comp roof"],
        excludes: &[],
        roof_system: RoofSystem::Asphalt,
    },
    DetectionRule {
        description: "description names a metal roof",
        signal: Signal::Description,
        keywords: &["metal", "standing seam"],
        excludes: &["non-metal", "non metal"],
        roof_system: RoofSystem::Metal,
    },
    DetectionRule {
        description: "description names a non-metal roof",
        signal: Signal::Description,
        keywords: &["non-metal", "non metal", "tile", "shake", "slate"],
        excludes: &[],
        roof_system: RoofSystem::NonMetal,
    },
];

/// Outcome of detection, with the audit line describing why
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub roof_system: RoofSystem,
    pub reason: String,
}

fn matched_keyword<'a>(text: &str, rule: &'a DetectionRule) -> Option<&'a str> {
    let lower = text.to_lowercase();
    if rule.excludes.iter().any(|ex| lower.contains(ex)) {
        return None;
    }
    rule.keywords.iter().copied().find(|kw| lower.contains(kw))
}

/// Texts a signal reads from the context
fn signal_texts<'a>(ctx: &'a AutoSelectionContext, signal: Signal) -> Vec<&'a str> {
    match signal {
        Signal::VendorName => ctx
            .vendor_items
            .iter()
            .filter_map(|v| v.vendor.as_deref())
            .collect(),
        Signal::VendorLine => ctx.vendor_items.iter().map(|v| v.name.as_str()).collect(),
        Signal::Description => vec![ctx.job_description.as_str()],
    }
}

/// Detect the roof system, short-circuiting at the first matching rule
pub fn detect_roof_system(ctx: &AutoSelectionContext) -> Detection {
    for rule in DETECTION_RULES {
        for text in signal_texts(ctx, rule.signal) {
            if let Some(keyword) = matched_keyword(text, rule) {
                tracing::debug!(rule = rule.description, keyword, "roof system detected");
                return Detection {
                    roof_system: rule.roof_system,
                    reason: format!(
                        "Roof system {}: {} (matched '{}')",
                        rule.roof_system, rule.description, keyword
                    ),
                };
            }
        }
    }
    Detection {
        roof_system: RoofSystem::NonMetal,
        reason: "Roof system non-metal: no rule matched, using default".to_string(),
    }
}
