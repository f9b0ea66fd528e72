//! Scoring tables for heading candidates.
//!
//! Each table is an ordered list of (predicate, delta) rows. A subject's score
//! is the sum of the deltas whose predicate holds, so every rule can be
//! tested on its own.

use super::adaptive::{DocumentPattern, NumberingKind, SectionCandidate};

/// One row of a scoring table.
pub struct ScoreRule<C: ?Sized + 'static> {
    /// Short name, used in debug output
    pub name: &'static str,
    /// Whether the row applies
    pub applies: fn(&C) -> bool,
    /// Score added when it does
    pub delta: f32,
}

/// Sum the deltas of every applicable rule.
pub fn apply_rules<C: ?Sized>(rules: &[ScoreRule<C>], subject: &C) -> f32 {
    rules
        .iter()
        .filter(|rule| (rule.applies)(subject))
        .map(|rule| rule.delta)
        .sum()
}

/// Names of the rules that fire for a subject.
pub fn matching_rules<C: ?Sized>(rules: &[ScoreRule<C>], subject: &C) -> Vec<&'static str> {
    rules
        .iter()
        .filter(|rule| (rule.applies)(subject))
        .map(|rule| rule.name)
        .collect()
}

fn size_at_least_12(c: &SectionCandidate) -> bool {
    c.font_size >= 12.0
}

fn size_at_least_14(c: &SectionCandidate) -> bool {
    c.font_size >= 14.0
}

fn is_bold(c: &SectionCandidate) -> bool {
    c.bold
}

fn left_aligned(c: &SectionCandidate) -> bool {
    c.x < 100.0
}

fn single_level_number(c: &SectionCandidate) -> bool {
    c.numbering == Some(NumberingKind::Numeric)
}

fn multi_level_number(c: &SectionCandidate) -> bool {
    c.numbering == Some(NumberingKind::Hierarchical)
}

fn has_keyword(c: &SectionCandidate) -> bool {
    c.strong_keyword
}

/// Initial confidence bonuses for a heading candidate. Capped at 1.0 by the caller.
pub static CANDIDATE_RULES: &[ScoreRule<SectionCandidate>] = &[
    ScoreRule { name: "size>=12", applies: size_at_least_12, delta: 0.3 },
    ScoreRule { name: "size>=14", applies: size_at_least_14, delta: 0.2 },
    ScoreRule { name: "bold", applies: is_bold, delta: 0.3 },
    ScoreRule { name: "left-aligned", applies: left_aligned, delta: 0.2 },
    ScoreRule { name: "numbered", applies: single_level_number, delta: 0.3 },
    ScoreRule { name: "multi-level", applies: multi_level_number, delta: 0.4 },
    ScoreRule { name: "keyword", applies: has_keyword, delta: 0.2 },
];

/// One row of the learned-pattern table.
pub struct PatternRule {
    /// Short name, used in debug output
    pub name: &'static str,
    /// Whether the row applies to (candidate, pattern, size tolerance)
    pub applies: fn(&SectionCandidate, &DocumentPattern, f32) -> bool,
    /// Score added when it does
    pub delta: f32,
}

fn learned_size(c: &SectionCandidate, p: &DocumentPattern, tolerance: f32) -> bool {
    p.font_sizes
        .iter()
        .any(|size| (c.font_size - size).abs() <= tolerance)
}

fn learned_bold(c: &SectionCandidate, p: &DocumentPattern, _: f32) -> bool {
    p.bold && c.bold
}

fn learned_italic(c: &SectionCandidate, p: &DocumentPattern, _: f32) -> bool {
    p.italic && c.italic
}

fn learned_numbering(c: &SectionCandidate, p: &DocumentPattern, _: f32) -> bool {
    c.numbering.is_some_and(|kind| p.numbering_kinds.contains(&kind))
}

/// How well a candidate fits the learned document pattern.
pub static PATTERN_RULES: &[PatternRule] = &[
    PatternRule { name: "size", applies: learned_size, delta: 0.4 },
    PatternRule { name: "bold", applies: learned_bold, delta: 0.3 },
    PatternRule { name: "italic", applies: learned_italic, delta: 0.1 },
    PatternRule { name: "numbering", applies: learned_numbering, delta: 0.2 },
];

/// Score a candidate against a pattern.
pub fn pattern_score(candidate: &SectionCandidate, pattern: &DocumentPattern, size_tolerance: f32) -> f32 {
    PATTERN_RULES
        .iter()
        .filter(|rule| (rule.applies)(candidate, pattern, size_tolerance))
        .map(|rule| rule.delta)
        .sum()
}
