//! Similarity search over a project's tasks, notes and files.
//!
//! Brute-force: every document is turned into a term-frequency vector and
//! compared to the query by cosine similarity. Fine for one project's worth
//! of text.

use crate::model::{ProjectFile, Task};
use serde::Serialize;
use std::collections::HashMap;

/// Number of hits returned when the caller does not say.
pub const DEFAULT_LIMIT: usize = 5;

/// Upper bound on hits for one call.
pub const MAX_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Task,
    Note,
    File,
}

/// Something that can be searched.
#[derive(Debug, Clone)]
pub struct Document {
    pub kind: HitKind,
    pub id: String,
    pub title: String,
    pub text: String,
}

impl From<&Task> for Document {
    fn from(task: &Task) -> Self {
        Self {
            kind: HitKind::Task,
            id: task.id.clone(),
            title: format!("{} {}", task.short_id, task.title),
            text: format!("{} {}", task.title, task.description.as_deref().unwrap_or_default()),
        }
    }
}

impl From<&ProjectFile> for Document {
    fn from(file: &ProjectFile) -> Self {
        let kind = if file.content.is_some() { HitKind::Note } else { HitKind::File };
        Self {
            kind,
            id: file.id.clone(),
            title: file.name.clone(),
            text: format!("{} {}", file.name, file.content.as_deref().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub kind: HitKind,
    pub id: String,
    pub title: String,
    pub score: f32,
}

/// Lower-cased alphanumeric tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn term_frequencies(text: &str) -> HashMap<String, f32> {
    let mut tf = HashMap::new();
    for token in tokenize(text) {
        *tf.entry(token).or_insert(0.0) += 1.0;
    }
    tf
}

/// Cosine similarity of two sparse term vectors, in `[0, 1]`.
fn cosine_similarity(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    let dot: f32 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a: f32 = a.values().map(|x| x * x).sum();
    let norm_b: f32 = b.values().map(|y| y * y).sum();

    let magnitude = (norm_a * norm_b).sqrt();
    if magnitude == 0.0 { 0.0 } else { dot / magnitude }
}

/// Top `limit` documents with a positive score, best first.
///
/// Ties are broken by title so results are stable.
#[must_use]
pub fn rank(query: &str, documents: impl IntoIterator<Item = Document>, limit: usize) -> Vec<SearchHit> {
    let query_tf = term_frequencies(query);
    if query_tf.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = documents
        .into_iter()
        .filter_map(|doc| {
            let score = cosine_similarity(&query_tf, &term_frequencies(&doc.text));
            (score > 0.0).then(|| SearchHit {
                kind: doc.kind,
                id: doc.id,
                title: doc.title,
                score,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.title.cmp(&b.title))
    });
    hits.truncate(limit.min(MAX_LIMIT));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            kind: HitKind::Note,
            id: id.to_string(),
            title: id.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Re-roof, NORTH side!"), ["re", "roof", "north", "side"]);
        assert!(tokenize("  -- ").is_empty());
    }

    #[test]
    fn test_rank_orders_by_similarity() {
        let hits = rank(
            "roof flashing",
            [
                doc("a", "kitchen cabinets"),
                doc("b", "roof flashing detail at north roof"),
                doc("c", "flashing"),
            ],
            DEFAULT_LIMIT,
        );
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"a"));
        assert!(hits[0].score >= hits[1].score);
        assert!(hits.iter().all(|h| h.score > 0.0 && h.score <= 1.0 + f32::EPSILON));
    }

    #[test]
    fn test_identical_text_scores_one() {
        let hits = rank("permit set", [doc("x", "Permit SET")], 1);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_limit_and_empty_query() {
        let docs = (0..10).map(|i| doc(&format!("d{i}"), "framing"));
        assert_eq!(rank("framing", docs, 3).len(), 3);
        assert!(rank("   ", [doc("x", "framing")], 5).is_empty());
    }
}
