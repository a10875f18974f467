//! Consensus routes: linear forecast of validator scores.

use std::sync::Arc;

use actors::JobHandlerRegistry;
use bridge_core::{TankManifest, event_names};
use serde_json::{Value, json};

use super::payload::{parse_timestamp, validations};
use super::{RouteContext, route};
use crate::bridge::{RouteRegistry, RouteResult};
use crate::hooks::HookManager;
use crate::jobs::{self, Operation};

pub const TANK: &str = "consensus";
pub const CATEGORY: &str = "consensus";
/// Job operation behind `queue_consensus_forecast`.
pub const CONSENSUS_FORECAST: &str = "consensus_forecast";

const TREND_THRESHOLD: f64 = 0.001;
const RISK_WEIGHT: f64 = 0.2;
const DEFAULT_SCORE: f64 = 0.5;

pub fn manifest() -> TankManifest {
    TankManifest::new()
        .route("forecast_consensus", "Forecast the consensus trend from validator history.")
        .route("queue_consensus_forecast", "Queue a consensus forecast job.")
        .route("poll_consensus_forecast", "Poll status of a consensus forecast job.")
        .requires(&["validations"])
}

pub fn register(registry: &RouteRegistry, ctx: &RouteContext) {
    registry.register_route_once(
        "forecast_consensus",
        route(
            ctx,
            "Forecast the consensus trend from validator history.\n\nPayload: {\"validations\": [{\"score\", \"timestamp\"}], \"network_analysis\"?: {\"overall_risk_score\"}}.",
            CATEGORY,
            forecast_consensus,
        ),
    );
    registry.register_route_once(
        "queue_consensus_forecast",
        route(
            ctx,
            "Queue a consensus forecast job.\n\nSame payload as forecast_consensus. Returns {\"job_id\"} immediately.",
            CATEGORY,
            queue_consensus_forecast,
        ),
    );
    registry.register_route_once(
        "poll_consensus_forecast",
        route(
            ctx,
            "Poll status of a consensus forecast job.\n\nPayload: {\"job_id\"}.",
            CATEGORY,
            poll_consensus_forecast,
        ),
    );

    ctx.tanks.register(TANK, manifest());
}

pub fn register_operations(handlers: &mut JobHandlerRegistry, hooks: &Arc<HookManager>) {
    let hooks = hooks.clone();
    handlers.register(Operation::new(CONSENSUS_FORECAST, move |payload: Value| {
        let hooks = hooks.clone();
        async move { forecast_and_publish(&hooks, &payload) }
    }));
}

fn score_of(record: &Value) -> f64 {
    match record.get("score") {
        None => DEFAULT_SCORE,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_SCORE),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_SCORE),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(_) => DEFAULT_SCORE,
    }
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Least-squares slope and intercept of `ys` against `0..n`.
fn linear_fit(ys: &[f64]) -> (f64, f64) {
    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (num, den) = ys
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });
    let slope = if den == 0.0 { 0.0 } else { num / den };
    (slope, mean_y - slope * mean_x)
}

/// Forecast the next consensus score from `validations`.
///
/// Records without a parseable timestamp are skipped. Scores are fitted
/// against their sequence index, not wall time.
pub fn forecast(validations: &[Value], network_analysis: Option<&Value>) -> Value {
    if validations.is_empty() {
        return json!({ "forecast_score": 0.0, "trend": "stable", "flags": ["no_data"] });
    }

    let scores: Vec<f64> = validations
        .iter()
        .filter(|v| {
            v.get("timestamp")
                .and_then(Value::as_str)
                .is_some_and(|ts| parse_timestamp(ts).is_some())
        })
        .map(score_of)
        .collect();

    let (slope, intercept) = match scores.as_slice() {
        [] => {
            return json!({
                "forecast_score": 0.0,
                "trend": "stable",
                "flags": ["no_valid_timestamps"],
            });
        }
        [only] => {
            return json!({
                "forecast_score": round3(only.clamp(0.0, 1.0)),
                "trend": "stable",
                "flags": ["insufficient_history"],
            });
        }
        many => linear_fit(many),
    };

    let trend = if slope > TREND_THRESHOLD {
        "increasing"
    } else if slope < -TREND_THRESHOLD {
        "decreasing"
    } else {
        "stable"
    };

    let risk_modifier = network_analysis
        .filter(|n| n.as_object().is_some_and(|o| !o.is_empty()))
        .map_or(0.0, |n| {
            let risk = n
                .get("overall_risk_score")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            -RISK_WEIGHT * risk
        });

    let forecast = slope * scores.len() as f64 + intercept + risk_modifier;
    json!({
        "forecast_score": round3(forecast.clamp(0.0, 1.0)),
        "trend": trend,
        "risk_modifier": round3(risk_modifier),
    })
}

fn forecast_and_publish(hooks: &HookManager, payload: &Value) -> RouteResult {
    let result = forecast(validations(payload)?, payload.get("network_analysis"));
    hooks.publish(event_names::CONSENSUS_FORECAST_RUN, result.clone());
    Ok(result)
}

async fn forecast_consensus(ctx: RouteContext, payload: Value) -> RouteResult {
    forecast_and_publish(&ctx.hooks, &payload)
}

async fn queue_consensus_forecast(ctx: RouteContext, payload: Value) -> RouteResult {
    validations(&payload)?;
    jobs::queue_job(&ctx.jobs, CONSENSUS_FORECAST, payload).await
}

async fn poll_consensus_forecast(ctx: RouteContext, payload: Value) -> RouteResult {
    jobs::poll_job(&ctx.jobs, Some(CONSENSUS_FORECAST), &payload).await
}
