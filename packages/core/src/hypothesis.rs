//! Hypothesis records kept by the hypothesis store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

const TITLE_MAX_CHARS: usize = 255;

/// Texts at least this similar describe the same claim.
pub const TEXT_SIMILARITY_THRESHOLD: f64 = 0.7;
/// Score gap beyond which two similar hypotheses disagree.
const SCORE_DIVERGENCE: f64 = 0.3;
/// Above this similarity, disjoint evidence alone is a conflict.
const NEAR_DUPLICATE_SIMILARITY: f64 = 0.8;
/// Shared supporting nodes below this fraction count as disjoint.
const NODE_OVERLAP_FLOOR: f64 = 0.2;

/// One entry of a hypothesis' score history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub t: DateTime<Utc>,
    pub score: f64,
    pub status: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A registered hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// `HYP_<unix seconds>_<8 hex>`.
    pub hypothesis_id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub score: f64,
    /// Caller-supplied metadata, stored as JSON text.
    #[serde(default)]
    pub metadata_json: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl Hypothesis {
    /// Build a freshly registered hypothesis: status `open`, score 0.
    pub fn register(text: &str, metadata: Option<&Value>) -> Self {
        let now = Utc::now();
        let suffix = (Ulid::new().random() & 0xffff_ffff) as u32;
        let metadata_json = metadata
            .map(|m| m.to_string())
            .unwrap_or_else(|| "{}".to_string());

        Self {
            hypothesis_id: format!("HYP_{}_{:08x}", now.timestamp(), suffix),
            title: text.chars().take(TITLE_MAX_CHARS).collect(),
            description: text.to_string(),
            status: "open".to_string(),
            score: 0.0,
            metadata_json,
            history: vec![HistoryEntry {
                t: now,
                score: 0.0,
                status: "open".to_string(),
                event: "initial_registration".to_string(),
                reason: None,
            }],
            created_at: now,
        }
    }

    /// Record a new score, optionally changing status.
    pub fn apply_score(&mut self, score: f64, status: Option<&str>, reason: Option<&str>) {
        if let Some(status) = status {
            self.status = status.to_string();
        }
        self.score = score;
        self.history.push(HistoryEntry {
            t: Utc::now(),
            score,
            status: self.status.clone(),
            event: "score_update".to_string(),
            reason: reason.map(str::to_string),
        });
    }

    /// Parsed metadata; an empty object when the stored text is not JSON.
    pub fn metadata(&self) -> Value {
        serde_json::from_str(&self.metadata_json).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// The `supporting_nodes` listed in metadata, if any.
    pub fn supporting_nodes(&self) -> HashSet<String> {
        match self.metadata().get("supporting_nodes") {
            Some(Value::Array(nodes)) => nodes
                .iter()
                .map(|n| match n {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => HashSet::new(),
        }
    }

    /// Whether two hypotheses make the same claim but disagree: their texts
    /// are similar while their scores diverge, or they are near-duplicates
    /// backed by largely different evidence.
    pub fn conflicts_with(&self, other: &Hypothesis) -> bool {
        let similarity = text_similarity(&self.description, &other.description);
        if similarity < TEXT_SIMILARITY_THRESHOLD {
            return false;
        }
        if (self.score - other.score).abs() > SCORE_DIVERGENCE {
            return true;
        }

        let ours = self.supporting_nodes();
        let theirs = other.supporting_nodes();
        let shared = ours.intersection(&theirs).count() as f64;
        let overlap = shared / ours.len().max(theirs.len()).max(1) as f64;
        similarity > NEAR_DUPLICATE_SIMILARITY && overlap < NODE_OVERLAP_FLOOR
    }
}

/// Normalized edit similarity in `[0, 1]`, 1 meaning identical.
///
/// Case and non-alphanumeric characters are ignored.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let normalize = |s: &str| -> Vec<char> {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    };
    let (a, b) = (normalize(a), normalize(b));
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let distance = previous[b.len()] as f64;
    1.0 - distance / a.len().max(b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_sets_initial_state() {
        let h = Hypothesis::register("Rain follows ritual", Some(&json!({"source": "ui"})));
        assert!(h.hypothesis_id.starts_with("HYP_"));
        assert_eq!(h.hypothesis_id.rsplit('_').next().map(str::len), Some(8));
        assert_eq!(h.status, "open");
        assert_eq!(h.score, 0.0);
        assert_eq!(h.history.len(), 1);
        assert_eq!(h.metadata(), json!({"source": "ui"}));
    }

    #[test]
    fn long_text_truncates_title_only() {
        let text = "x".repeat(300);
        let h = Hypothesis::register(&text, None);
        assert_eq!(h.title.chars().count(), 255);
        assert_eq!(h.description.len(), 300);
    }

    #[test]
    fn similarity_ignores_case_and_punctuation() {
        assert_eq!(text_similarity("Rain, follows ritual!", "rain follows ritual"), 1.0);
        assert_eq!(text_similarity("", ""), 1.0);
        assert_eq!(text_similarity("abc", ""), 0.0);
        assert!((text_similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn conflicts_need_similar_text_and_divergence() {
        let mut a = Hypothesis::register("Markets dip on Mondays", None);
        let mut b = Hypothesis::register("markets dip on mondays.", None);
        a.apply_score(0.9, None, None);
        b.apply_score(0.2, None, None);
        assert!(a.conflicts_with(&b));

        b.apply_score(0.8, None, None);
        assert!(a.conflicts_with(&b), "identical text, no shared evidence");

        let c = Hypothesis::register(
            "Markets dip on Mondays",
            Some(&json!({"supporting_nodes": ["n1", "n2"]})),
        );
        let mut d = Hypothesis::register(
            "Markets dip on Mondays",
            Some(&json!({"supporting_nodes": ["n1", "n2", "n3"]})),
        );
        assert!(!c.conflicts_with(&d));
        d.apply_score(0.5, None, None);
        assert!(c.conflicts_with(&d));

        let unrelated = Hypothesis::register("Cats prefer boxes", None);
        assert!(!a.conflicts_with(&unrelated));
    }

    #[test]
    fn apply_score_appends_history() {
        let mut h = Hypothesis::register("t", None);
        h.apply_score(0.8, Some("validated"), Some("audit"));
        assert_eq!(h.score, 0.8);
        assert_eq!(h.status, "validated");
        assert_eq!(h.history.len(), 2);
        assert_eq!(h.history[1].reason.as_deref(), Some("audit"));
    }
}
