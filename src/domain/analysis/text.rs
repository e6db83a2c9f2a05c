//! Résumé text parsing: lines, headings, tokens and contact patterns

use once_cell::sync::Lazy;
use regex::Regex;

use super::tables::{section_for_heading, ResumeSection};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}")
        .expect("valid phone regex")
});

static MONTH_NAME_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+(?:19|20)\d{2}\b",
    )
    .expect("valid month-name date regex")
});

static SLASH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:0?[1-9]|1[0-2])/(?:19|20)\d{2}\b").expect("valid slash date regex")
});

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:19|20)\d{2}-(?:0[1-9]|1[0-2])\b").expect("valid iso date regex")
});

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

/// Date notation styles found in a résumé
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateStyle {
    /// `Jan 2020`, `March 2021`
    MonthName,
    /// `01/2020`
    Slash,
    /// `2020-01`
    Iso,
    /// Bare years such as `2019 - 2021`
    YearOnly,
}

impl DateStyle {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::MonthName => "month name",
            Self::Slash => "MM/YYYY",
            Self::Iso => "YYYY-MM",
            Self::YearOnly => "year only",
        }
    }
}

/// A line recognized as a section heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Index into [`ResumeDocument::lines`]
    pub line: usize,
    pub text: String,
    /// `None` when the line looks like a heading but uses non-standard wording
    pub section: Option<ResumeSection>,
}

/// Parsed view over résumé text
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    text: String,
    lines: Vec<String>,
    headings: Vec<Heading>,
    words: Vec<String>,
    tokens: Vec<String>,
}

impl ResumeDocument {
    pub fn parse(text: &str) -> Self {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
        let headings = detect_headings(&lines);
        let words = split_words(&text);
        let tokens = tokenize(&text);

        Self {
            text,
            lines,
            headings,
            words,
            tokens,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn headings(&self) -> &[Heading] {
        &self.headings
    }

    /// Lowercase words, punctuation stripped
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Normalized, stemmed tokens for keyword matching
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn has_email(&self) -> bool {
        EMAIL_PATTERN.is_match(&self.text)
    }

    pub fn has_phone(&self) -> bool {
        PHONE_PATTERN.is_match(&self.text)
    }

    /// Whether an email or phone number appears within the first `n` non-empty lines
    pub fn contact_within_first_lines(&self, n: usize) -> bool {
        self.lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .take(n)
            .any(|l| EMAIL_PATTERN.is_match(l) || PHONE_PATTERN.is_match(l))
    }

    /// First heading line for a canonical section
    pub fn section_position(&self, section: ResumeSection) -> Option<usize> {
        self.headings
            .iter()
            .find(|h| h.section == Some(section))
            .map(|h| h.line)
    }

    pub fn has_section(&self, section: ResumeSection) -> bool {
        self.section_position(section).is_some()
    }

    /// Sorted, distinct date styles used anywhere in the text
    pub fn date_styles(&self) -> Vec<DateStyle> {
        let mut styles = Vec::new();

        if MONTH_NAME_DATE.is_match(&self.text) {
            styles.push(DateStyle::MonthName);
        }
        if SLASH_DATE.is_match(&self.text) {
            styles.push(DateStyle::Slash);
        }
        if ISO_DATE.is_match(&self.text) {
            styles.push(DateStyle::Iso);
        }
        if styles.is_empty() && YEAR.is_match(&self.text) {
            styles.push(DateStyle::YearOnly);
        }

        styles
    }

    /// Number of occurrences of a keyword, matched on stemmed token boundaries
    pub fn keyword_occurrences(&self, keyword: &str) -> usize {
        let needle = tokenize(keyword);

        if needle.is_empty() || needle.len() > self.tokens.len() {
            return 0;
        }

        self.tokens
            .windows(needle.len())
            .filter(|window| *window == needle.as_slice())
            .count()
    }
}

fn detect_headings(lines: &[String]) -> Vec<Heading> {
    let mut headings = Vec::new();

    for (index, raw) in lines.iter().enumerate() {
        let cleaned = clean_heading(raw);

        if cleaned.is_empty() || cleaned.split_whitespace().count() > 5 {
            continue;
        }

        if let Some(section) = section_for_heading(&cleaned) {
            headings.push(Heading {
                line: index,
                text: cleaned,
                section: Some(section),
            });
        } else if index >= 3 && looks_like_heading(raw, &cleaned) {
            // The first lines are usually the name and contact block
            headings.push(Heading {
                line: index,
                text: cleaned,
                section: None,
            });
        }
    }

    headings
}

fn clean_heading(line: &str) -> String {
    line.trim()
        .trim_start_matches(['#', '=', '-', '*', '_'])
        .trim_end_matches(['#', '=', '-', '*', '_', ':'])
        .trim()
        .replace('&', "and")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_heading(raw: &str, cleaned: &str) -> bool {
    let words = cleaned.split_whitespace().count();
    if words == 0 || words > 4 {
        return false;
    }

    let letters: Vec<char> = cleaned.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 3 || cleaned.chars().any(|c| c.is_ascii_digit() || c == '@') {
        return false;
    }

    let all_caps = letters.iter().all(|c| c.is_uppercase());
    let colon_terminated = raw.trim_end().ends_with(':');

    all_caps || colon_terminated
}

fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Lowercase, split on non-word characters and stem.
///
/// `+`, `#` and `/` stay inside tokens so `c++`, `c#` and `ci/cd` survive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '/')))
        .map(|t| t.trim_matches('/'))
        .filter(|t| !t.is_empty())
        .map(stem)
        .collect()
}

/// Light suffix stripping so plural and tense variants match
pub fn stem(word: &str) -> String {
    let len = word.chars().count();

    if len > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if len > 5 && word.ends_with("ing") {
        return word[..word.len() - 3].to_string();
    }
    if len > 4 && word.ends_with("ed") {
        return word[..word.len() - 2].to_string();
    }
    // "-sis" nouns (analysis, basis) are singular; "apis", "kpis" are plurals
    if len > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("sis")
    {
        return word[..word.len() - 1].to_string();
    }

    word.to_string()
}
