//! Section scoring rules
//!
//! Each rule set starts from a base score and applies rewards and penalties.
//! Findings are ordered by the size of their penalty so the most severe
//! issue is reported first.

use std::cmp::Reverse;

use once_cell::sync::Lazy;
use regex::Regex;

use super::tables::{
    KeywordTable, ResumeSection, ACTION_VERBS, PASSIVE_PHRASES, UNUSUAL_BULLETS,
};
use super::text::ResumeDocument;
use crate::domain::score::SectionScore;

static QUANTIFIED_ACHIEVEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:[$€£]\s?\d[\d,]*(?:\.\d+)?\s?[kmb]?\b)|(?:\b\d+(?:\.\d+)?\s?%)|(?:\b\d{1,3}(?:,\d{3})+\b)|(?:\b\d+\+?\s+(?:people|employees|engineers|clients|customers|users|projects|members|reports|accounts|stores|countries|teams|products|locations)\b)|(?:\b\d+x\b)",
    )
    .expect("valid achievement regex")
});

static PASSIVE_VOICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:was|were|been|being|is|are)\s+[a-z]+ed\b").expect("valid passive regex")
});

static COLUMN_GAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S {4,}\S").expect("valid column gap regex"));

/// Lines longer than this are flagged as unbroken paragraphs
const LONG_LINE_CHARS: usize = 200;

/// Saturation point for keyword stuffing detection
const STUFFING_REPEAT_LIMIT: usize = 8;

#[derive(Debug)]
struct Finding {
    severity: i32,
    issue: String,
    improvement: Option<String>,
}

/// Accumulates a section's score and findings
#[derive(Debug)]
pub(crate) struct SectionAudit {
    score: i32,
    findings: Vec<Finding>,
    suggestions: Vec<String>,
}

impl SectionAudit {
    pub fn starting_at(score: i32) -> Self {
        Self {
            score,
            findings: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn reward(&mut self, points: i32) {
        self.score += points;
    }

    pub fn penalize(
        &mut self,
        points: i32,
        issue: impl Into<String>,
        improvement: impl Into<String>,
    ) {
        self.score -= points;
        self.note(points, issue, Some(improvement.into()));
    }

    /// Record a finding without changing the score
    pub fn note(&mut self, severity: i32, issue: impl Into<String>, improvement: Option<String>) {
        self.findings.push(Finding {
            severity,
            issue: issue.into(),
            improvement,
        });
    }

    pub fn suggest(&mut self, improvement: impl Into<String>) {
        self.suggestions.push(improvement.into());
    }

    pub fn cap(&mut self, max: i32) {
        self.score = self.score.min(max);
    }

    pub fn finish(mut self) -> SectionScore {
        self.findings.sort_by_key(|f| Reverse(f.severity));

        let issues = self.findings.iter().map(|f| f.issue.clone()).collect();

        let mut improvements: Vec<String> = Vec::new();
        let candidates = self
            .findings
            .into_iter()
            .filter_map(|f| f.improvement)
            .chain(self.suggestions);

        for improvement in candidates {
            if !improvements.contains(&improvement) {
                improvements.push(improvement);
            }
        }

        SectionScore::new(self.score.clamp(0, 100) as u8, issues, improvements)
    }
}

pub(crate) fn formatting(doc: &ResumeDocument) -> SectionAudit {
    let mut audit = SectionAudit::starting_at(100);
    let lines = doc.lines();

    let table_lines = lines
        .iter()
        .enumerate()
        .filter(|(index, line)| {
            let pipes = line.matches('|').count();
            (*index >= 3 && pipes >= 2)
                || line.chars().any(|c| ('\u{2500}'..='\u{257F}').contains(&c))
                || line.trim().contains('\t')
        })
        .count();

    if table_lines > 0 {
        audit.penalize(
            15,
            format!(
                "Tables or column separators detected on {} line(s); ATS parsers often scramble them",
                table_lines
            ),
            "Replace tables and tab-aligned columns with plain text lines",
        );
    }

    let column_lines = lines.iter().filter(|l| COLUMN_GAP.is_match(l)).count();
    if column_lines >= 3 {
        audit.penalize(
            10,
            "Multi-column layout detected; text may be read out of order",
            "Use a single-column layout",
        );
    }

    let bullets: Vec<String> = UNUSUAL_BULLETS
        .iter()
        .filter(|b| doc.text().contains(**b))
        .map(|b| b.to_string())
        .collect();

    if !bullets.is_empty() {
        audit.penalize(
            10,
            format!(
                "Non-standard bullet characters ({}) may not parse correctly",
                bullets.join(" ")
            ),
            "Use simple bullets such as '-' or '•'",
        );
    }

    let unknown_headings: Vec<String> = doc
        .headings()
        .iter()
        .filter(|h| h.section.is_none())
        .map(|h| format!("'{}'", h.text))
        .collect();

    if !unknown_headings.is_empty() {
        let penalty = (5 * unknown_headings.len() as i32).min(15);
        audit.penalize(
            penalty,
            format!("Non-standard section headings: {}", unknown_headings.join(", ")),
            "Use conventional headings such as Experience, Education and Skills",
        );
    }

    if !doc.has_email() {
        audit.penalize(
            15,
            "No email address found",
            "Add a professional email address to the contact block",
        );
    }

    if !doc.has_phone() {
        audit.penalize(
            10,
            "No phone number found",
            "Add a phone number to the contact block",
        );
    }

    let garbled = doc
        .text()
        .chars()
        .filter(|c| {
            *c == '\u{FFFD}'
                || ('\u{E000}'..='\u{F8FF}').contains(c)
                || (c.is_control() && !matches!(c, '\n' | '\t'))
        })
        .count();

    if garbled > 0 {
        let ratio = garbled as f64 / doc.char_count().max(1) as f64;

        if garbled >= 5 || ratio > 0.01 {
            audit.penalize(
                15,
                format!("{} unreadable or garbled character(s) found", garbled),
                "Export the résumé as plain text or a simple document to avoid encoding problems",
            );
        }
    }

    let long_lines = lines
        .iter()
        .filter(|l| l.chars().count() > LONG_LINE_CHARS)
        .count();

    if long_lines > 0 {
        audit.penalize(
            5,
            format!(
                "{} line(s) exceed {} characters",
                long_lines, LONG_LINE_CHARS
            ),
            "Break long paragraphs into concise bullet points",
        );
    }

    if !doc.text().to_lowercase().contains("linkedin.com") {
        audit.suggest("Include a LinkedIn profile URL in the contact block");
    }

    audit
}

pub(crate) fn content(doc: &ResumeDocument) -> SectionAudit {
    let mut audit = SectionAudit::starting_at(40);

    let quantified = QUANTIFIED_ACHIEVEMENT.find_iter(doc.text()).count() as i32;
    if quantified == 0 {
        audit.note(
            12,
            "No quantified achievements (numbers, percentages or amounts) found",
            Some("Quantify results, e.g. 'reduced costs by 15%' or 'managed a team of 8'".into()),
        );
    } else {
        audit.reward((quantified * 5).min(25));
        if quantified < 3 {
            audit.suggest("Add more measurable outcomes to your bullet points");
        }
    }

    let verb_count = ACTION_VERBS
        .iter()
        .filter(|verb| doc.words().iter().any(|w| w == *verb))
        .count() as i32;
    if verb_count < 3 {
        audit.note(
            10,
            format!("Few strong action verbs ({} found)", verb_count),
            Some("Start bullet points with action verbs such as 'led', 'built' or 'improved'".into()),
        );
    }
    audit.reward((verb_count * 3).min(20));

    let lower = doc.text().to_lowercase();
    let phrase_hits: usize = PASSIVE_PHRASES
        .iter()
        .map(|phrase| lower.matches(phrase).count())
        .sum();
    let passive = (phrase_hits + PASSIVE_VOICE.find_iter(doc.text()).count()) as i32;

    if passive > 0 {
        audit.penalize(
            (passive * 4).min(20),
            format!("Passive or duty-focused phrasing found {} time(s)", passive),
            "Replace phrases like 'responsible for' with what you achieved",
        );
    }

    for section in ResumeSection::REQUIRED {
        if !doc.has_section(section) {
            audit.penalize(
                10,
                format!("Missing {} section", section.label()),
                format!("Add a clearly labeled '{}' section", section.heading()),
            );
        }
    }

    let words = doc.word_count();
    if words < 150 {
        audit.penalize(
            15,
            format!("Content is too brief ({} words)", words),
            "Describe your roles, responsibilities and results in more detail",
        );
    } else if words > 1200 {
        audit.penalize(
            5,
            format!("Content is very long ({} words)", words),
            "Keep the résumé to one or two pages of relevant material",
        );
    }

    audit
}

pub(crate) fn keywords(
    doc: &ResumeDocument,
    table: &KeywordTable,
    industry_known: bool,
    requested_industry: Option<&str>,
    saturation: usize,
) -> SectionAudit {
    let occurrences: Vec<(&str, usize)> = table
        .keywords
        .iter()
        .map(|keyword| (*keyword, doc.keyword_occurrences(keyword)))
        .collect();

    let matched = occurrences.iter().filter(|(_, n)| *n > 0).count();
    let saturation = saturation.clamp(1, table.keywords.len().max(1));

    let mut audit = SectionAudit::starting_at(coverage_score(matched, saturation));

    if matched == 0 {
        audit.note(
            100,
            format!("No {} keywords found", table.industry),
            None,
        );
    } else if matched * 3 < saturation {
        audit.note(
            30,
            format!(
                "Low keyword coverage: {} of {} tracked {} keywords found",
                matched,
                table.keywords.len(),
                table.industry
            ),
            None,
        );
    }

    if let Some((keyword, count)) = occurrences
        .iter()
        .filter(|(_, n)| *n > STUFFING_REPEAT_LIMIT)
        .max_by_key(|(_, n)| *n)
    {
        audit.penalize(
            10,
            format!(
                "Keyword '{}' repeated {} times; this may be flagged as keyword stuffing",
                keyword, count
            ),
            "Use keywords naturally in context rather than repeating them",
        );
    }

    if !industry_known {
        if let Some(industry) = requested_industry {
            audit.note(
                1,
                format!(
                    "Unrecognized industry '{}'; scored against general professional keywords",
                    industry.trim()
                ),
                None,
            );
        }
    }

    let missing: Vec<&str> = occurrences
        .iter()
        .filter(|(_, n)| *n == 0)
        .map(|(keyword, _)| *keyword)
        .take(5)
        .collect();

    if !missing.is_empty() && matched < saturation {
        audit.suggest(format!(
            "Consider adding relevant keywords such as: {}",
            missing.join(", ")
        ));
    }

    audit.suggest("Mirror the exact terminology used in the job description");

    audit
}

/// Linear up to the saturation point, then diminishing returns for the last 15 points
pub(crate) fn coverage_score(matched: usize, saturation: usize) -> i32 {
    let saturation = saturation.max(1) as f64;
    let matched = matched as f64;

    let score = if matched <= saturation {
        85.0 * matched / saturation
    } else {
        85.0 + 15.0 * (1.0 - (-(matched - saturation) / saturation).exp())
    };

    score.round() as i32
}

pub(crate) fn structure(doc: &ResumeDocument) -> SectionAudit {
    let mut audit = SectionAudit::starting_at(100);

    let missing: Vec<ResumeSection> = ResumeSection::REQUIRED
        .into_iter()
        .filter(|s| !doc.has_section(*s))
        .collect();

    if !missing.is_empty() {
        let labels: Vec<&str> = missing.iter().map(|s| s.label()).collect();
        let headings: Vec<&str> = missing.iter().map(|s| s.heading()).collect();

        audit.penalize(
            20 * missing.len() as i32,
            format!("Missing sections: {}", labels.join(", ")),
            format!("Add standard section headings: {}", headings.join(", ")),
        );
    }

    if doc.headings().iter().all(|h| h.section.is_none()) {
        audit.penalize(
            10,
            "No recognizable section headings",
            "Organize the résumé under clear headings on their own lines",
        );
    }

    let mut seen = Vec::new();
    for heading in doc.headings() {
        if let Some(section) = heading.section {
            if seen.contains(&section) {
                audit.penalize(
                    5,
                    format!("Duplicate {} section", section.label()),
                    "Merge duplicate sections into one",
                );
            } else {
                seen.push(section);
            }
        }
    }

    if (doc.has_email() || doc.has_phone()) && !doc.contact_within_first_lines(5) {
        audit.penalize(
            5,
            "Contact information is not at the top",
            "Place your name and contact details at the very top",
        );
    }

    let experience = doc.section_position(ResumeSection::Experience);
    let education = doc.section_position(ResumeSection::Education);
    let summary = doc.section_position(ResumeSection::Summary);

    if let (Some(experience), Some(education)) = (experience, education) {
        if education < experience {
            audit.penalize(
                5,
                "Education appears before experience",
                "List experience before education unless you are a recent graduate",
            );
        }
    }

    if let (Some(experience), Some(summary)) = (experience, summary) {
        if summary > experience {
            audit.penalize(
                5,
                "Summary appears after experience",
                "Move the summary to the top, just below your contact details",
            );
        }
    }

    let styles = doc.date_styles();
    if styles.len() > 1 {
        let described: Vec<&str> = styles.iter().map(|s| s.describe()).collect();
        audit.penalize(
            10,
            format!("Inconsistent date formats ({})", described.join(", ")),
            "Use one date format throughout, e.g. 'Jan 2020 - Mar 2022'",
        );
    } else if styles.is_empty() && experience.is_some() {
        audit.penalize(
            10,
            "No dates found for your experience",
            "Add start and end dates to each role",
        );
    }

    audit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_orders_findings_by_severity() {
        let mut audit = SectionAudit::starting_at(100);
        audit.penalize(5, "minor", "fix minor");
        audit.penalize(20, "major", "fix major");
        audit.penalize(10, "medium", "fix major");

        let section = audit.finish();

        assert_eq!(section.score, 65);
        assert_eq!(section.issues, vec!["major", "medium", "minor"]);
        assert_eq!(section.improvements, vec!["fix major", "fix minor"]);
    }

    #[test]
    fn test_audit_clamps_score() {
        let mut audit = SectionAudit::starting_at(10);
        audit.penalize(50, "bad", "fix");
        assert_eq!(audit.finish().score, 0);

        let mut audit = SectionAudit::starting_at(90);
        audit.reward(50);
        assert_eq!(audit.finish().score, 100);
    }

    #[test]
    fn test_coverage_score_has_diminishing_returns() {
        assert_eq!(coverage_score(0, 12), 0);
        assert_eq!(coverage_score(6, 12), 43);
        assert_eq!(coverage_score(12, 12), 85);

        let beyond = coverage_score(18, 12);
        let far_beyond = coverage_score(24, 12);
        assert!(beyond > 85 && beyond < 100);
        assert!(far_beyond > beyond && far_beyond <= 100);
        assert!(far_beyond - beyond < beyond - 85);
    }

    #[test]
    fn test_formatting_flags_tables_and_bullets() {
        let doc = ResumeDocument::parse(
            "Jane Doe\njane@example.com\n555-123-4567\n\n| Skill | Level |\n● Rust\n",
        );
        let section = formatting(&doc).finish();

        assert_eq!(section.score, 75);
        assert!(section.issues[0].starts_with("Tables"));
        assert!(section.issues[1].starts_with("Non-standard bullet"));
    }

    #[test]
    fn test_content_rewards_achievements() {
        let weak = ResumeDocument::parse("Responsible for reports. Worked on things.");
        let strong = ResumeDocument::parse(
            "Led a team of 8 engineers. Increased revenue by 25%. Reduced costs by $40k. Built pipelines.",
        );

        assert!(content(&strong).finish().score > content(&weak).finish().score);
    }

    #[test]
    fn test_keyword_stuffing_penalized() {
        let table = &super::super::tables::GENERAL_KEYWORDS;
        let natural = ResumeDocument::parse("leadership and communication and budget");
        let stuffed = ResumeDocument::parse(&"leadership communication budget ".repeat(10));

        let natural_score = keywords(&natural, table, true, None, 12).finish();
        let stuffed_score = keywords(&stuffed, table, true, None, 12).finish();

        assert!(stuffed_score.score < natural_score.score);
        assert!(stuffed_score.issues.iter().any(|i| i.contains("stuffing")));
    }

    #[test]
    fn test_structure_reports_missing_sections() {
        let doc = ResumeDocument::parse("Just a line of text with nothing in it at all.");
        let section = structure(&doc).finish();

        assert_eq!(section.score, 30);
        assert_eq!(
            section.issues[0],
            "Missing sections: experience, education, skills"
        );
    }
}
