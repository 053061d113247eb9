//! Facts extracted from free-text listing titles.
//!
//! Every function here is total: unparsable input degrades to the documented
//! default instead of failing, so a single odd title can never abort a batch.

use std::sync::LazyLock;

use regex::Regex;

use crate::rows::CaseHit;

/// `OutOf` value for titles that carry no serial-numbering denominator.
/// Sorts after every real print run.
pub const NOT_NUMBERED: u32 = 999_999;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})(?:-\d{2})?\b").expect("valid year regex"));

static OUT_OF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:#\d+/(\d{1,5}))|(?:/(\d{1,5})(?:\s|$))").expect("valid out-of regex")
});

static PSA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PSA (\d{1,2})").expect("valid psa regex"));

static PATCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:patch|relic|jersey)\b").expect("valid patch regex"));

static AUTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:auto|autograph|autographed)\b").expect("valid auto regex")
});

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

/// First four-digit token, optionally followed by a `-YY` season suffix.
/// `"2023-24 Prizm"` → `"2023"`. Empty when absent.
pub fn parse_year(title: &str) -> String {
    YEAR_RE
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Serial-numbering denominator: `#12/99` → 99, `... /150` → 150.
/// A bare `#5` or no match at all yields [`NOT_NUMBERED`].
pub fn parse_out_of(title: &str) -> u32 {
    let Some(caps) = OUT_OF_RE.captures(title) else {
        return NOT_NUMBERED;
    };
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(NOT_NUMBERED)
}

/// Grade from the first `PSA <n>` marker, `"0"` when ungraded.
pub fn parse_psa(title: &str) -> String {
    PSA_RE
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// `"Yes"` when the title contains ` rc ` or ` rookie ` (space bounded).
pub fn parse_rookie(title: &str) -> String {
    let lower = title.to_lowercase();
    yes_no(lower.contains(" rc ") || lower.contains(" rookie "))
}

pub fn parse_patch(title: &str) -> String {
    yes_no(PATCH_RE.is_match(title))
}

pub fn parse_auto(title: &str) -> String {
    yes_no(AUTO_RE.is_match(title))
}

/// `"Yes"` when any named case hit appears in the title (case-insensitive).
pub fn parse_case_hit(title: &str, case_hits: &[CaseHit]) -> String {
    let lower = title.to_lowercase();
    yes_no(
        case_hits
            .iter()
            .map(|c| c.name.trim())
            .filter(|name| !name.is_empty())
            .any(|name| lower.contains(&name.to_lowercase())),
    )
}

/// Doubles embedded quote characters so the title survives delimited output.
pub fn parse_title(title: Option<&str>) -> String {
    title.map(|t| t.replace('"', "\"\"")).unwrap_or_default()
}

/// Quotes a URL (doubling inner quotes) when it contains `,` or `"`.
pub fn format_url(url: &str) -> String {
    if url.contains(',') || url.contains('"') {
        format!("\"{}\"", url.replace('"', "\"\""))
    } else {
        url.to_string()
    }
}
