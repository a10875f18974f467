//! Network routes: validator coordination analysis, inline or as background jobs.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use actors::JobHandlerRegistry;
use bridge_core::{TankManifest, event_names};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use super::consensus::round3;
use super::payload::{parse_timestamp, validations};
use super::{RouteContext, route};
use crate::bridge::{RouteRegistry, RouteResult};
use crate::hooks::HookManager;
use crate::jobs::{self, Operation};

pub const TANK: &str = "network";
pub const CATEGORY: &str = "network";
/// Job operation behind `queue_coordination_analysis`.
pub const COORDINATION_ANALYSIS: &str = "coordination_analysis";

const TEMPORAL_WINDOW_MINUTES: i64 = 5;
const MIN_TEMPORAL_OCCURRENCES: usize = 3;
const SCORE_SIMILARITY_THRESHOLD: f64 = 0.1;
const MIN_SCORE_SIMILARITY_COUNT: usize = 4;
const SEMANTIC_SIMILARITY_THRESHOLD: f64 = 0.8;
const MIN_NOTE_CHARS: usize = 10;
const MIN_EDGE_WEIGHT: f64 = 0.1;
const COORDINATION_EDGE_THRESHOLD: f64 = 0.7;
const MIN_CLUSTER_SIZE: usize = 3;

const MAX_FLAGS_FOR_NORMALIZATION: f64 = 20.0;
const TEMPORAL_WEIGHT: f64 = 0.4;
const SCORE_WEIGHT: f64 = 0.4;
const SEMANTIC_WEIGHT: f64 = 0.2;

pub fn manifest() -> TankManifest {
    TankManifest::new()
        .route("coordination_analysis", "Run network coordination analysis.")
        .route("queue_coordination_analysis", "Queue a coordination analysis job.")
        .route("poll_coordination_analysis", "Poll status of a coordination job.")
        .requires(&["validations"])
}

pub fn register(registry: &RouteRegistry, ctx: &RouteContext) {
    registry.register_route_once(
        "coordination_analysis",
        route(
            ctx,
            "Run network coordination analysis.\n\nPayload: {\"validations\": [{\"validator_id\", \"hypothesis_id\", \"score\"?, \"timestamp\"?, \"note\"?}]}. Returns {\"overall_risk_score\", \"graph\"}.",
            CATEGORY,
            coordination_analysis,
        ),
    );
    registry.register_route_once(
        "queue_coordination_analysis",
        route(
            ctx,
            "Queue a coordination analysis job.\n\nSame payload as coordination_analysis. Returns {\"job_id\"} immediately.",
            CATEGORY,
            queue_coordination_analysis,
        ),
    );
    registry.register_route_once(
        "poll_coordination_analysis",
        route(
            ctx,
            "Poll status of a coordination job.\n\nPayload: {\"job_id\"}.",
            CATEGORY,
            poll_coordination_analysis,
        ),
    );

    ctx.tanks.register(TANK, manifest());
}

pub fn register_operations(handlers: &mut JobHandlerRegistry, hooks: &Arc<HookManager>) {
    let hooks = hooks.clone();
    handlers.register(Operation::new(COORDINATION_ANALYSIS, move |payload: Value| {
        let hooks = hooks.clone();
        async move { analyze_and_publish(&hooks, &payload) }
    }));
}

fn text<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn score(record: &Value) -> Option<f64> {
    match record.get("score")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Every unordered pair of `items`, in order.
fn pairs<T>(items: &[T]) -> impl Iterator<Item = (&T, &T)> {
    items
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| items[i + 1..].iter().map(move |b| (a, b)))
}

/// Validators linked by the hypotheses they both validated.
struct CoValidationGraph<'a> {
    /// Validators in order of first appearance.
    nodes: Vec<&'a str>,
    /// `(a, b, weight)` with `a < b`, weight normalized to the heaviest edge.
    edges: Vec<(&'a str, &'a str, f64)>,
    coverage: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> CoValidationGraph<'a> {
    fn build(validations: &'a [Value]) -> Self {
        let mut nodes = Vec::new();
        let mut seen = HashSet::new();
        let mut coverage: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for record in validations {
            let (Some(validator), Some(hypothesis)) =
                (text(record, "validator_id"), text(record, "hypothesis_id"))
            else {
                continue;
            };
            if seen.insert(validator) {
                nodes.push(validator);
            }
            coverage.entry(hypothesis).or_default().insert(validator);
        }

        let mut weights: BTreeMap<(&str, &str), f64> = BTreeMap::new();
        for validators in coverage.values() {
            let validators: Vec<&str> = validators.iter().copied().collect();
            for (a, b) in pairs(&validators) {
                *weights.entry((*a, *b)).or_default() += 1.0;
            }
        }

        let heaviest = weights.values().copied().fold(1.0, f64::max);
        let edges = weights
            .into_iter()
            .map(|((a, b), weight)| (a, b, weight / heaviest))
            .filter(|(_, _, weight)| *weight >= MIN_EDGE_WEIGHT)
            .collect();

        Self {
            nodes,
            edges,
            coverage,
        }
    }

    /// Connected groups over strong edges, at least `MIN_CLUSTER_SIZE` strong.
    fn communities(&self) -> Vec<Vec<&'a str>> {
        let mut adjacent: HashMap<&str, Vec<&str>> = HashMap::new();
        for (a, b, weight) in &self.edges {
            if *weight >= COORDINATION_EDGE_THRESHOLD {
                adjacent.entry(*a).or_default().push(*b);
                adjacent.entry(*b).or_default().push(*a);
            }
        }

        let mut visited = HashSet::new();
        let mut communities = Vec::new();
        for node in &self.nodes {
            if visited.contains(node) || !adjacent.contains_key(node) {
                continue;
            }
            let mut community = BTreeSet::new();
            let mut stack = vec![*node];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                community.insert(current);
                if let Some(neighbors) = adjacent.get(current) {
                    stack.extend(neighbors.iter().copied());
                }
            }
            if community.len() >= MIN_CLUSTER_SIZE {
                communities.push(community.into_iter().collect());
            }
        }
        communities
    }

    fn to_value(&self) -> Value {
        let edges: Vec<Value> = self
            .edges
            .iter()
            .map(|(a, b, weight)| json!([a, b, weight]))
            .collect();
        json!({
            "nodes": self.nodes,
            "edges": edges,
            "communities": self.communities(),
            "hypothesis_coverage": self.coverage,
        })
    }
}

/// Validator pairs that repeatedly submit within a few minutes of each other.
fn temporal_flags(validations: &[Value]) -> usize {
    let mut order = Vec::new();
    let mut stamps: HashMap<&str, Vec<DateTime<Utc>>> = HashMap::new();
    for record in validations {
        let (Some(validator), Some(ts)) = (text(record, "validator_id"), text(record, "timestamp"))
        else {
            continue;
        };
        let Some(ts) = parse_timestamp(ts) else {
            tracing::warn!(validator, "Skipping validation with invalid timestamp");
            continue;
        };
        if !stamps.contains_key(validator) {
            order.push(validator);
        }
        stamps.entry(validator).or_default().push(ts);
    }

    let window = Duration::minutes(TEMPORAL_WINDOW_MINUTES);
    pairs(&order)
        .filter(|(a, b)| {
            let close = stamps[*a]
                .iter()
                .flat_map(|t1| stamps[*b].iter().map(move |t2| (*t1 - *t2).abs()))
                .filter(|gap| *gap <= window)
                .count();
            close >= MIN_TEMPORAL_OCCURRENCES
        })
        .count()
}

/// Validator pairs that give near-identical scores across many hypotheses.
fn score_flags(validations: &[Value]) -> usize {
    let mut by_hypothesis: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
    for record in validations {
        if let (Some(validator), Some(hypothesis), Some(score)) = (
            text(record, "validator_id"),
            text(record, "hypothesis_id"),
            score(record),
        ) {
            by_hypothesis
                .entry(hypothesis)
                .or_default()
                .insert(validator, score);
        }
    }

    let mut similar: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for scores in by_hypothesis.values() {
        let scores: Vec<(&str, f64)> = scores.iter().map(|(v, s)| (*v, *s)).collect();
        for ((a, s1), (b, s2)) in pairs(&scores) {
            if (s1 - s2).abs() <= SCORE_SIMILARITY_THRESHOLD {
                *similar.entry((*a, *b)).or_default() += 1;
            }
        }
    }
    similar
        .values()
        .filter(|count| **count >= MIN_SCORE_SIMILARITY_COUNT)
        .count()
}

fn cosine(a: &HashMap<&str, f64>, b: &HashMap<&str, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(word, x)| b.get(word).map(|y| x * y))
        .sum();
    let norm = |v: &HashMap<&str, f64>| v.values().map(|x| x * x).sum::<f64>().sqrt();
    let denominator = norm(a) * norm(b);
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

/// Validator pairs whose notes use nearly the same words, compared as
/// averaged word-count vectors.
fn semantic_flags(validations: &[Value]) -> usize {
    let mut order = Vec::new();
    let mut notes: HashMap<&str, Vec<String>> = HashMap::new();
    for record in validations {
        let (Some(validator), Some(note)) = (text(record, "validator_id"), text(record, "note"))
        else {
            continue;
        };
        if note.chars().count() < MIN_NOTE_CHARS {
            continue;
        }
        if !notes.contains_key(validator) {
            order.push(validator);
        }
        notes
            .entry(validator)
            .or_default()
            .push(note.trim().to_lowercase());
    }

    let profiles: HashMap<&str, HashMap<&str, f64>> = notes
        .iter()
        .map(|(validator, texts)| {
            let mut counts: HashMap<&str, f64> = HashMap::new();
            for word in texts.iter().flat_map(|t| t.split_whitespace()) {
                *counts.entry(word).or_default() += 1.0;
            }
            let n = texts.len() as f64;
            counts.values_mut().for_each(|c| *c /= n);
            (*validator, counts)
        })
        .collect();

    pairs(&order)
        .filter(|(a, b)| cosine(&profiles[*a], &profiles[*b]) >= SEMANTIC_SIMILARITY_THRESHOLD)
        .count()
}

/// Weighted flag count squashed into `[0, 1]`; more validators dampen it.
fn risk_score(temporal: usize, score: usize, semantic: usize, validators: usize) -> f64 {
    if validators == 0 {
        return 0.0;
    }
    let validator_factor = (validators.max(2) as f64).log10();
    let weighted = TEMPORAL_WEIGHT * temporal as f64
        + SCORE_WEIGHT * score as f64
        + SEMANTIC_WEIGHT * semantic as f64;
    let normalized = weighted / (validator_factor * MAX_FLAGS_FOR_NORMALIZATION);
    (2.0 / (1.0 + (-4.0 * normalized).exp()) - 1.0).clamp(0.0, 1.0)
}

/// Score how likely `validations` come from validators acting in concert.
///
/// Returns `{"overall_risk_score", "graph": {"nodes", "edges", "communities",
/// "hypothesis_coverage"}}`.
pub fn analyze(validations: &[Value]) -> Value {
    let graph = CoValidationGraph::build(validations);
    let (temporal, score, semantic) = (
        temporal_flags(validations),
        score_flags(validations),
        semantic_flags(validations),
    );
    let risk = risk_score(temporal, score, semantic, graph.nodes.len());

    tracing::info!(
        temporal,
        score,
        semantic,
        validators = graph.nodes.len(),
        risk,
        "Coordination analysis"
    );

    json!({
        "overall_risk_score": round3(risk),
        "graph": graph.to_value(),
    })
}

fn analyze_and_publish(hooks: &HookManager, payload: &Value) -> RouteResult {
    let result = analyze(validations(payload)?);
    hooks.publish(event_names::COORDINATION_ANALYSIS_RUN, result.clone());
    Ok(result)
}

async fn coordination_analysis(ctx: RouteContext, payload: Value) -> RouteResult {
    analyze_and_publish(&ctx.hooks, &payload)
}

async fn queue_coordination_analysis(ctx: RouteContext, payload: Value) -> RouteResult {
    validations(&payload)?;
    jobs::queue_job(&ctx.jobs, COORDINATION_ANALYSIS, payload).await
}

async fn poll_coordination_analysis(ctx: RouteContext, payload: Value) -> RouteResult {
    jobs::poll_job(&ctx.jobs, Some(COORDINATION_ANALYSIS), &payload).await
}
