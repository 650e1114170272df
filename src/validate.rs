//! Input validation and normalization.
//!
//! Identifier checks guard every id a language model hands to the tool
//! dispatcher. The synonym maps let both people and models use natural
//! words for task statuses, priorities and project phases. Resolution is
//! three-tier: exact match → synonym lookup → error with suggestion.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Length of a canonical hyphenated UUID.
pub const IDENTIFIER_LEN: usize = 36;

// ── Valid value sets (O(1) lookups) ──────────────────────────

pub static VALID_TASK_STATUSES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["task_redline", "progress_update", "done_completed"]
        .into_iter()
        .collect()
});

pub static VALID_PRIORITIES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["low", "medium", "high", "urgent"].into_iter().collect());

pub static VALID_PROJECT_STATUSES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["pending", "active", "completed", "archived"]
        .into_iter()
        .collect()
});

/// Project phases in lifecycle order.
pub const PROJECT_PHASES: [&str; 4] = ["Pre-Design", "Design", "Permit", "Build"];

// ── Synonym maps ─────────────────────────────────────────────

pub static TASK_STATUS_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("todo", "task_redline"),
        ("open", "task_redline"),
        ("new", "task_redline"),
        ("redline", "task_redline"),
        ("pending", "task_redline"),
        ("wip", "progress_update"),
        ("in_progress", "progress_update"),
        ("progress", "progress_update"),
        ("started", "progress_update"),
        ("active", "progress_update"),
        ("working", "progress_update"),
        ("done", "done_completed"),
        ("complete", "done_completed"),
        ("completed", "done_completed"),
        ("closed", "done_completed"),
        ("finished", "done_completed"),
        ("resolved", "done_completed"),
    ]
    .into_iter()
    .collect()
});

pub static PRIORITY_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("p0", "urgent"),
        ("critical", "urgent"),
        ("crit", "urgent"),
        ("asap", "urgent"),
        ("highest", "urgent"),
        ("p1", "high"),
        ("important", "high"),
        ("p2", "medium"),
        ("normal", "medium"),
        ("default", "medium"),
        ("med", "medium"),
        ("p3", "low"),
        ("minor", "low"),
        ("trivial", "low"),
        ("lowest", "low"),
    ]
    .into_iter()
    .collect()
});

pub static PROJECT_STATUS_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("new", "pending"),
        ("planned", "pending"),
        ("open", "active"),
        ("in_progress", "active"),
        ("wip", "active"),
        ("done", "completed"),
        ("finished", "completed"),
        ("closed", "archived"),
        ("archive", "archived"),
    ]
    .into_iter()
    .collect()
});

// ── Identifiers ──────────────────────────────────────────────

/// Validate an identifier argument.
///
/// Rejects empty values, values containing whitespace (usually a display
/// name passed where an id was expected), values shorter than a UUID, and
/// anything that is not a hyphenated hex UUID. Returns the id lower-cased.
///
/// # Errors
///
/// Returns `RequiredField` for empty input and `InvalidIdentifier` otherwise.
pub fn validate_identifier(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::RequiredField(field.to_string()));
    }

    let invalid = |reason: &str| Error::InvalidIdentifier {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    if trimmed.len() < IDENTIFIER_LEN {
        return Err(invalid("too short for a UUID"));
    }
    if !is_hyphenated_uuid(trimmed) {
        return Err(invalid("not a hyphenated UUID"));
    }

    Ok(trimmed.to_lowercase())
}

/// Structural check for the 8-4-4-4-12 hex layout.
#[must_use]
pub fn is_hyphenated_uuid(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != IDENTIFIER_LEN {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => *b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

/// Require a non-blank text argument, returning it trimmed.
///
/// # Errors
///
/// Returns `RequiredField` when the value is missing or blank.
pub fn require_text(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::RequiredField(field.to_string())),
    }
}

// ── Normalization ────────────────────────────────────────────

/// Normalize a task status via exact match or synonym lookup.
///
/// Returns the canonical status, or an error with the original input
/// and an optional suggestion.
pub fn normalize_task_status(input: &str) -> std::result::Result<String, (String, Option<String>)> {
    normalize_with(input, &VALID_TASK_STATUSES, &TASK_STATUS_SYNONYMS)
}

/// Normalize a task priority. Accepts names, synonyms and P0-P3 notation.
pub fn normalize_priority(input: &str) -> std::result::Result<String, (String, Option<String>)> {
    normalize_with(input, &VALID_PRIORITIES, &PRIORITY_SYNONYMS)
}

/// Normalize a project status.
pub fn normalize_project_status(
    input: &str,
) -> std::result::Result<String, (String, Option<String>)> {
    normalize_with(input, &VALID_PROJECT_STATUSES, &PROJECT_STATUS_SYNONYMS)
}

/// Normalize a project phase, ignoring case, spaces and hyphens.
pub fn normalize_phase(input: &str) -> std::result::Result<String, (String, Option<String>)> {
    let squash = |s: &str| -> String {
        s.chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_lowercase()
    };
    let wanted = squash(input);
    if let Some(phase) = PROJECT_PHASES.iter().find(|p| squash(p) == wanted) {
        return Ok((*phase).to_string());
    }

    let suggestion = PROJECT_PHASES
        .iter()
        .map(|p| (levenshtein_distance(&wanted, &squash(p)), *p))
        .filter(|(d, _)| *d <= 3)
        .min_by_key(|(d, _)| *d)
        .map(|(_, p)| p.to_string());
    Err((input.to_string(), suggestion))
}

/// Turn a normalization failure into a crate error.
#[must_use]
pub fn invalid_value(kind: &str, (input, suggestion): (String, Option<String>)) -> Error {
    match suggestion {
        Some(s) => Error::InvalidArgument(format!("invalid {kind} '{input}' (did you mean '{s}'?)")),
        None => Error::InvalidArgument(format!("invalid {kind} '{input}'")),
    }
}

fn normalize_with(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> std::result::Result<String, (String, Option<String>)> {
    let lower = input.trim().to_lowercase().replace([' ', '-'], "_");

    // Tier 1: exact match
    if valid.contains(lower.as_str()) {
        return Ok(lower);
    }

    // Tier 2: synonym lookup
    if let Some(&canonical) = synonyms.get(lower.as_str()) {
        return Ok(canonical.to_string());
    }

    // Tier 3: find closest suggestion
    let suggestion = find_closest_match(&lower, valid, synonyms);
    Err((input.to_string(), suggestion))
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            // For synonyms, show what it maps to
            let shown = synonyms.get(v).copied().unwrap_or(v);
            best = Some((shown, dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Single-row optimization (O(min(m,n)) space)
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Find existing IDs similar to the searched ID.
///
/// Returns up to `max` suggestions with edit distance ≤ 3,
/// sorted by distance then alphabetically.
#[must_use]
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|id| (levenshtein_distance(searched, id), id.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}
