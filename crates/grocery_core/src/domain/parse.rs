//! Quick-add text parsing.
//!
//! # Responsibility
//! - Split one free-text entry into item chunks.
//! - Normalize each chunk into canonical and display names.
//!
//! # Invariants
//! - `name_canonical` is always the lowercase of `name_original`.
//! - In `Verbatim` mode digits stay part of the name and no quantity is set.

use once_cell::sync::Lazy;
use regex::Regex;

static CHUNK_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;\r\n]+").expect("valid chunk separator regex"));
static LINE_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid line separator regex"));
static LIST_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*•·–]\s*|\d+\)\s*|\d+\.\s+)").expect("valid list marker regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static LEADING_QUANTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(?:\s*[xX])?\s*([a-zA-Z]{1,4})?\s+(.+)$")
        .expect("valid leading quantity regex")
});
static TRAILING_QUANTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\s+(?:[xX]\s*)?(\d+(?:\.\d+)?)(?:\s*([a-zA-Z]{1,4}))?$")
        .expect("valid trailing quantity regex")
});

/// How quick-add text is turned into names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Whole text is the name; quantity and unit stay unset.
    #[default]
    Verbatim,
    /// Leading or trailing numbers become quantity and unit.
    ExtractQuantity,
}

/// Unit recognised by the quantity extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUnit {
    Lb,
    Oz,
    G,
    Kg,
    Ct,
    Pcs,
    Pc,
}

impl QuantityUnit {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "lb" | "lbs" => Some(Self::Lb),
            "oz" => Some(Self::Oz),
            "g" => Some(Self::G),
            "kg" => Some(Self::Kg),
            "ct" => Some(Self::Ct),
            "pcs" => Some(Self::Pcs),
            "pc" => Some(Self::Pc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lb => "lb",
            Self::Oz => "oz",
            Self::G => "g",
            Self::Kg => "kg",
            Self::Ct => "ct",
            Self::Pcs => "pcs",
            Self::Pc => "pc",
        }
    }
}

/// Structured result of parsing one quick-add chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub name_canonical: String,
    pub name_original: String,
    pub quantity: Option<f64>,
    pub unit: Option<QuantityUnit>,
}

impl ItemDraft {
    fn empty() -> Self {
        Self {
            name_canonical: String::new(),
            name_original: String::new(),
            quantity: None,
            unit: None,
        }
    }

    fn named(name: &str, quantity: Option<f64>, unit: Option<QuantityUnit>) -> Self {
        let original = collapse_whitespace(name);
        if original.is_empty() {
            return Self::empty();
        }
        Self {
            name_canonical: canonical_name(&original),
            name_original: original,
            quantity,
            unit,
        }
    }

    /// Empty drafts are skipped by quick-add.
    pub fn is_empty(&self) -> bool {
        self.name_canonical.is_empty()
    }
}

/// Returns the canonical lookup key for a display name.
pub fn canonical_name(input: &str) -> String {
    collapse_whitespace(input).to_lowercase()
}

/// Parses one quick-add chunk.
pub fn parse_quick_add(input: &str, mode: ParseMode) -> ItemDraft {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ItemDraft::empty();
    }

    match mode {
        ParseMode::Verbatim => ItemDraft::named(trimmed, None, None),
        ParseMode::ExtractQuantity => extract_quantity(trimmed),
    }
}

/// Splits raw quick-add text into trimmed, non-empty chunks.
///
/// Commas, semicolons and line breaks all separate chunks. Text separated by
/// line breaks only is treated as a pasted list, so leading bullet and
/// numbering markers are removed from every line.
pub fn split_quick_add(input: &str) -> Vec<String> {
    let pasted_list = input.contains(['\n', '\r']) && !input.contains([',', ';']);
    if pasted_list {
        return LINE_SEPARATOR_RE
            .split(input)
            .map(|line| LIST_MARKER_RE.replace(line.trim(), "").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
    }

    CHUNK_SEPARATOR_RE
        .split(input)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits and parses, dropping chunks without a usable name.
pub fn parse_quick_add_batch(input: &str, mode: ParseMode) -> Vec<ItemDraft> {
    split_quick_add(input)
        .iter()
        .map(|chunk| parse_quick_add(chunk, mode))
        .filter(|draft| !draft.is_empty())
        .collect()
}

fn extract_quantity(text: &str) -> ItemDraft {
    if let Some(caps) = LEADING_QUANTITY_RE.captures(text) {
        let quantity = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
        let unit_text = caps.get(2).map(|m| m.as_str());
        let unit = unit_text.and_then(QuantityUnit::parse);
        let remainder = caps.get(3).map_or("", |m| m.as_str().trim());
        let name = join_name_parts(unit.is_none().then_some(unit_text).flatten(), remainder, true);
        return ItemDraft::named(&name, quantity, unit);
    }

    if let Some(caps) = TRAILING_QUANTITY_RE.captures(text) {
        let remainder = caps.get(1).map_or("", |m| m.as_str().trim());
        let quantity = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
        let unit_text = caps.get(3).map(|m| m.as_str());
        let unit = unit_text.and_then(QuantityUnit::parse);
        let name = join_name_parts(unit.is_none().then_some(unit_text).flatten(), remainder, false);
        return ItemDraft::named(&name, quantity, unit);
    }

    ItemDraft::named(text, None, None)
}

// Unrecognised unit-like words stay in the name on the side they came from.
fn join_name_parts(word: Option<&str>, remainder: &str, word_first: bool) -> String {
    let parts = match (word, word_first) {
        (Some(word), true) => [word, remainder],
        (Some(word), false) => [remainder, word],
        (None, _) => [remainder, ""],
    };
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::{
        canonical_name, parse_quick_add, parse_quick_add_batch, split_quick_add, ParseMode,
        QuantityUnit,
    };

    #[test]
    fn verbatim_keeps_digits_in_name() {
        let draft = parse_quick_add("  2   Percent  Milk ", ParseMode::Verbatim);
        assert_eq!(draft.name_original, "2 Percent Milk");
        assert_eq!(draft.name_canonical, "2 percent milk");
        assert_eq!(draft.quantity, None);
        assert_eq!(draft.unit, None);
    }

    #[test]
    fn blank_input_yields_empty_draft() {
        let draft = parse_quick_add(" \t ", ParseMode::Verbatim);
        assert!(draft.is_empty());
        assert_eq!(draft.name_original, "");
    }

    #[test]
    fn split_handles_mixed_separators() {
        assert_eq!(
            split_quick_add("apples, bananas; carrots"),
            vec!["apples", "bananas", "carrots"]
        );
        assert_eq!(split_quick_add(" , ;; \n"), Vec::<String>::new());
    }

    #[test]
    fn split_handles_crlf_lines() {
        assert_eq!(
            split_quick_add("apples\r\nbananas\r\ncarrots"),
            vec!["apples", "bananas", "carrots"]
        );
    }

    #[test]
    fn split_strips_bullet_markers() {
        assert_eq!(
            split_quick_add("- apples\n• bananas\n* carrots"),
            vec!["apples", "bananas", "carrots"]
        );
    }

    #[test]
    fn split_strips_numbered_markers() {
        assert_eq!(
            split_quick_add("1) apples\n2. bananas\n10) carrots"),
            vec!["apples", "bananas", "carrots"]
        );
    }

    #[test]
    fn split_keeps_decimal_quantities_on_pasted_lines() {
        assert_eq!(
            split_quick_add("2.5 lb flour\n1 cup sugar"),
            vec!["2.5 lb flour", "1 cup sugar"]
        );
    }

    #[test]
    fn split_leaves_markers_when_commas_are_present() {
        assert_eq!(split_quick_add("- apples, pears"), vec!["- apples", "pears"]);
    }

    #[test]
    fn single_line_keeps_its_leading_marker() {
        assert_eq!(split_quick_add("2. eggs"), vec!["2. eggs"]);
        assert_eq!(split_quick_add("- 5% yogurt"), vec!["- 5% yogurt"]);
        assert_eq!(split_quick_add("- apples\n- pears"), vec!["apples", "pears"]);
    }

    #[test]
    fn batch_parses_pasted_recipe_lines() {
        let drafts = parse_quick_add_batch("1 cup sugar\n2 eggs\n\n1 cup flour", ParseMode::Verbatim);
        let names: Vec<&str> = drafts.iter().map(|d| d.name_canonical.as_str()).collect();
        assert_eq!(names, vec!["1 cup sugar", "2 eggs", "1 cup flour"]);
    }

    #[test]
    fn extractor_reads_leading_and_trailing_quantities() {
        let cases = [
            ("2 milk", Some(2.0), None, "milk"),
            ("milk 2", Some(2.0), None, "milk"),
            ("2x milk", Some(2.0), None, "milk"),
            ("milk x2", Some(2.0), None, "milk"),
            ("1.5 lb chicken", Some(1.5), Some(QuantityUnit::Lb), "chicken"),
            ("3 apples", Some(3.0), None, "apples"),
            ("apples (honeycrisp) 6", Some(6.0), None, "apples (honeycrisp)"),
            ("1 cup sugar", Some(1.0), None, "cup sugar"),
            ("bag of milkish x?", None, None, "bag of milkish x?"),
        ];

        for (input, quantity, unit, canonical) in cases {
            let draft = parse_quick_add(input, ParseMode::ExtractQuantity);
            assert_eq!(draft.quantity, quantity, "quantity for `{input}`");
            assert_eq!(draft.unit, unit, "unit for `{input}`");
            assert_eq!(draft.name_canonical, canonical, "name for `{input}`");
        }
    }

    #[test]
    fn extractor_normalizes_plural_pounds() {
        let draft = parse_quick_add("2 LBS Ground Beef", ParseMode::ExtractQuantity);
        assert_eq!(draft.unit, Some(QuantityUnit::Lb));
        assert_eq!(draft.name_original, "Ground Beef");
    }

    #[test]
    fn canonical_name_collapses_and_lowercases() {
        assert_eq!(canonical_name("  Greek   YOGURT "), "greek yogurt");
    }
}
