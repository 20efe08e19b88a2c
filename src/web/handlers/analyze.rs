// Text-only analysis handlers.
//
// POST /api/analyze/      — bias distribution
// POST /api/gpt_analyze/  — explanation for a client-stated bias level
// POST /api/analyze_mult/ — bias distribution + explanation

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{require_text, TextRequest};
use crate::bias::BiasDistribution;
use crate::neutralize::{BiasLevel, ModelTier};
use crate::web::extract::ApiJson;
use crate::web::{ApiError, AppState};

#[derive(Deserialize)]
pub struct GptAnalyzeRequest {
    pub text: String,
    pub bias_level: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub bias_analysis: BiasDistribution,
}

#[derive(Serialize)]
pub struct ExplanationResponse {
    pub explanation: String,
    pub model: String,
    pub degraded: bool,
}

#[derive(Serialize)]
pub struct AnalyzeMultResponse {
    pub bias_analysis: BiasDistribution,
    pub explanation: String,
    pub model: String,
    pub degraded: bool,
}

pub async fn analyze(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TextRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let text = require_text(&body.text)?;
    let bias_analysis = state.classifier.classify(text).await?;
    Ok(Json(AnalyzeResponse { bias_analysis }))
}

/// Explains with the standard tier; no classifier run.
pub async fn gpt_analyze(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<GptAnalyzeRequest>,
) -> Result<Json<ExplanationResponse>, ApiError> {
    let text = require_text(&body.text)?;
    let result = state
        .neutralizer
        .explain(
            text,
            BiasLevel::Stated(&body.bias_level),
            None,
            ModelTier::Standard,
        )
        .await;

    Ok(Json(ExplanationResponse {
        degraded: result.outcome.is_degraded(),
        explanation: result.outcome.text().to_string(),
        model: result.model,
    }))
}

pub async fn analyze_mult(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TextRequest>,
) -> Result<Json<AnalyzeMultResponse>, ApiError> {
    let text = require_text(&body.text)?;
    let bias = state.classifier.classify(text).await?;
    let result = state
        .neutralizer
        .explain(text, BiasLevel::Measured(&bias), None, ModelTier::select(&bias))
        .await;

    Ok(Json(AnalyzeMultResponse {
        bias_analysis: bias,
        degraded: result.outcome.is_degraded(),
        explanation: result.outcome.text().to_string(),
        model: result.model,
    }))
}
