// Neutralization handlers.
//
// POST /api/reduce_bias       — multipart text + optional image → neutral rewrite
// POST /api/reduce_bias_txt   — JSON text → neutral rewrite, no image
// POST /api/multicon_GPT_ana  — multipart → explanation, always the advanced tier
// POST /api/multicon_bias_ana — multipart → explanation, tier by Center probability
//
// Uploaded images live only for the request: the ScopedUpload held in
// NeutralizeForm deletes the file when the handler returns.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use super::{require_text, TextRequest};
use crate::bias::BiasDistribution;
use crate::neutralize::{BiasLevel, ModelTier, Neutralization};
use crate::output::truncate_chars;
use crate::web::extract::{ApiJson, ApiMultipart};
use crate::web::upload::ScopedUpload;
use crate::web::{ApiError, AppState};

/// Field names accepted for the image part.
const IMAGE_FIELDS: [&str; 2] = ["image", "file"];

#[derive(Serialize)]
pub struct NeutralizeResponse {
    pub original_text: String,
    pub multimodal_context: String,
    pub bias_analysis: BiasDistribution,
    pub neutral_text: String,
    pub model: String,
    pub degraded: bool,
}

#[derive(Serialize)]
pub struct MulticonResponse {
    pub bias_analysis: BiasDistribution,
    pub explanation: String,
    pub multimodal_context: String,
    pub model: String,
    pub degraded: bool,
}

/// Parsed multipart body.
pub struct NeutralizeForm {
    pub text: String,
    pub image: Option<ScopedUpload>,
}

pub async fn reduce_bias(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<NeutralizeResponse>, ApiError> {
    let form = read_form(&state, multipart).await?;
    let text = require_text(&form.text)?;
    let bias = state.classifier.classify(text).await?;
    let image = form.image.as_ref().map(ScopedUpload::path);

    let result = state
        .neutralizer
        .rewrite(text, BiasLevel::Measured(&bias), image, ModelTier::select(&bias))
        .await;
    Ok(Json(neutralize_response(text, bias, result)))
}

pub async fn reduce_bias_txt(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TextRequest>,
) -> Result<Json<NeutralizeResponse>, ApiError> {
    let text = require_text(&body.text)?;
    let bias = state.classifier.classify(text).await?;
    let result = state
        .neutralizer
        .rewrite(text, BiasLevel::Measured(&bias), None, ModelTier::select(&bias))
        .await;
    Ok(Json(neutralize_response(text, bias, result)))
}

pub async fn multicon_gpt_ana(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<MulticonResponse>, ApiError> {
    multicon(&state, multipart, |_| ModelTier::Advanced).await
}

pub async fn multicon_bias_ana(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<MulticonResponse>, ApiError> {
    multicon(&state, multipart, ModelTier::select).await
}

async fn multicon(
    state: &AppState,
    multipart: Multipart,
    choose_tier: impl Fn(&BiasDistribution) -> ModelTier,
) -> Result<Json<MulticonResponse>, ApiError> {
    let form = read_form(state, multipart).await?;
    let text = require_text(&form.text)?;
    let bias = state.classifier.classify(text).await?;
    let image = form.image.as_ref().map(ScopedUpload::path);

    let result = state
        .neutralizer
        .explain(text, BiasLevel::Measured(&bias), image, choose_tier(&bias))
        .await;

    Ok(Json(MulticonResponse {
        bias_analysis: bias,
        degraded: is_degraded(&result),
        explanation: result.outcome.text().to_string(),
        multimodal_context: result.context.prompt_text(),
        model: result.model,
    }))
}

fn neutralize_response(text: &str, bias: BiasDistribution, result: Neutralization) -> NeutralizeResponse {
    NeutralizeResponse {
        original_text: text.to_string(),
        multimodal_context: result.context.prompt_text(),
        bias_analysis: bias,
        degraded: is_degraded(&result),
        neutral_text: result.outcome.text().to_string(),
        model: result.model,
    }
}

/// Either the completion or the image pipeline fell back.
fn is_degraded(result: &Neutralization) -> bool {
    result.outcome.is_degraded() || result.context.is_failed()
}

/// Collect the `text` field and at most one image. The image is validated
/// and stored as soon as it is read; an empty file part counts as no image.
pub async fn read_form(state: &AppState, mut multipart: Multipart) -> Result<NeutralizeForm, ApiError> {
    let mut text: Option<String> = None;
    let mut image: Option<ScopedUpload> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "text" {
            text = Some(field.text().await?);
        } else if IMAGE_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            if image.is_some() {
                return Err(ApiError::BadRequest("Only one image may be uploaded".to_string()));
            }
            image = Some(state.uploads.store(&file_name, &bytes).await?);
        } else {
            debug!(field = %truncate_chars(&name, 40), "Ignoring unknown form field");
        }
    }

    let text = text.ok_or_else(|| ApiError::BadRequest("Missing form field: text".to_string()))?;
    Ok(NeutralizeForm { text, image })
}
