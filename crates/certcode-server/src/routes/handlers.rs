//! Request handlers.
//!
//! Each code moves `issued -> redeemed -> deleted`. Public handlers validate,
//! redeem, re-render and owner-delete; admin handlers (behind Basic Auth)
//! create batches, delete by code and report statistics.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use certcode_core::is_valid_code;

use super::{ApiError, AppState};
use crate::render::{Artifacts, RenderError};
use crate::storage::{Certificate, CodeStatistics, NewCertificate};

/// Largest batch `/erstelle` accepts.
pub const MAX_BATCH: usize = 1000;

const INVALID_OR_USED: &str = "Invalid or used code";
const INVALID_CODE: &str = "Invalid code";
const INVALID_REQUEST: &str = "Invalid request";

#[derive(Debug, Default, Deserialize)]
pub struct CodeQuery {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateQuery {
    pub count: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RerenderRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub email: String,
}

/// Outcome of producing artifacts for a redeemed code.
#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    pub message: &'static str,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssuedCode {
    pub code: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct IssuedCodes {
    pub codes: Vec<IssuedCode>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `GET /valide?code=`: return the row of an issued, unredeemed code.
#[instrument(skip_all, fields(code = %query.code))]
pub async fn validate_code(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> Result<Json<Certificate>, ApiError> {
    let certificate = state
        .db
        .find_entry(&query.code, false)
        .await
        .map_err(ApiError::lookup(INVALID_OR_USED))?;
    Ok(Json(certificate))
}

/// `POST /generiere`: redeem a code and render its artifacts.
///
/// The redemption is committed before rendering starts. If rendering fails
/// the response is `202` without URLs; `/erneuere` can retry later.
#[instrument(skip_all)]
pub async fn generate_certificate(
    State(state): State<AppState>,
    body: Result<Json<RedeemRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|_| ApiError::BadRequest(INVALID_REQUEST))?;
    let name = request.name.trim();
    let email = request.email.trim();
    if request.code.is_empty() || name.is_empty() || email.is_empty() {
        return Err(ApiError::BadRequest(INVALID_REQUEST));
    }

    let certificate = state
        .db
        .assign_entry(&request.code, name, email)
        .await
        .map_err(ApiError::lookup(INVALID_OR_USED))?;
    info!(code = %certificate.code, kind = %certificate.kind, "Certificate code redeemed");

    let rendered = state.renderer.render(&certificate.code).await;
    Ok(artifact_response(&state, certificate.code, rendered))
}

/// `POST /erneuere`: render the artifacts of a redeemed code again, for
/// its owner.
#[instrument(skip_all)]
pub async fn rerender_certificate(
    State(state): State<AppState>,
    body: Result<Json<RerenderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|_| ApiError::BadRequest(INVALID_REQUEST))?;

    let certificate = state
        .db
        .find_owned_entry(&request.code, &request.email)
        .await
        .map_err(ApiError::lookup(INVALID_CODE))?;

    let rendered = state.renderer.render(&certificate.code).await;
    Ok(artifact_response(&state, certificate.code, rendered))
}

/// `GET|DELETE /entferne?code=&email=`: owner deletes a redeemed code.
///
/// Unknown code, unredeemed code and wrong email all answer the same 404.
#[instrument(skip_all, fields(code = %query.code))]
pub async fn delete_certificate(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state
        .db
        .delete_owned_entry(&query.code, &query.email)
        .await?
    {
        return Err(ApiError::NotFound(INVALID_CODE));
    }

    info!(code = %query.code, "Certificate deleted by owner");
    state.renderer.remove_artifacts(&query.code).await;
    Ok(Json(MessageResponse {
        message: "Certificate deleted",
    }))
}

/// `GET /erstelle?count=&type=&tags=`: issue a batch of fresh codes.
#[instrument(skip_all)]
pub async fn create_certificate_codes(
    State(state): State<AppState>,
    Query(query): Query<CreateQuery>,
) -> Result<Json<IssuedCodes>, ApiError> {
    let count = query
        .count
        .as_deref()
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|c| (1..=MAX_BATCH).contains(c))
        .ok_or(ApiError::BadRequest("Invalid count"))?;
    let kind = query
        .kind
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(ApiError::BadRequest("Invalid type"))?;
    let tags = query.tags.unwrap_or_default();

    let codes = state.codes.new_codes(count).map_err(|e| {
        error!(error = %e, count, "Code generation failed");
        ApiError::Internal("Failed to generate certificate code")
    })?;
    let entries: Vec<NewCertificate> = codes
        .into_iter()
        .map(|code| NewCertificate {
            code,
            kind: kind.to_owned(),
            tags: tags.clone(),
        })
        .collect();

    let created = state.db.create_entries(&entries).await.map_err(|e| {
        error!(error = %e, count, "Batch insert failed");
        ApiError::Internal("Failed to generate certificate code")
    })?;
    info!(count, kind, tags = %tags, "Certificate codes created");

    Ok(Json(IssuedCodes {
        codes: created
            .into_iter()
            .map(|certificate| IssuedCode {
                url: state.code_url(&certificate.code),
                code: certificate.code,
            })
            .collect(),
    }))
}

/// `GET|DELETE /loesche?code=`: admin deletes a code in any state.
#[instrument(skip_all, fields(code = %query.code))]
pub async fn delete_certificate_code(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !is_valid_code(&query.code) {
        warn!(code = %query.code, "Received code is not a valid identifier");
        return Err(ApiError::BadRequest(INVALID_CODE));
    }

    if state.db.delete_entry(&query.code).await? == 0 {
        return Err(ApiError::NotFound(INVALID_CODE));
    }

    info!(code = %query.code, "Certificate code deleted by admin");
    state.renderer.remove_artifacts(&query.code).await;
    Ok(Json(MessageResponse {
        message: "Certificate code deleted",
    }))
}

/// `GET /statistik`: total, unused and unused-per-type counts.
pub async fn statistics(State(state): State<AppState>) -> Result<Json<CodeStatistics>, ApiError> {
    Ok(Json(state.db.statistics().await?))
}

fn artifact_response(
    state: &AppState,
    code: String,
    rendered: Result<Artifacts, RenderError>,
) -> Response {
    match rendered {
        Ok(artifacts) => (
            StatusCode::OK,
            Json(ArtifactResponse {
                message: "success",
                pdf_url: Some(state.artifact_url(&artifacts.pdf)),
                png_url: Some(state.artifact_url(&artifacts.png)),
                code,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!(code = %code, error = %e, "Artifact generation failed");
            (
                StatusCode::ACCEPTED,
                Json(ArtifactResponse {
                    message: "artifact generation failed",
                    code,
                    pdf_url: None,
                    png_url: None,
                }),
            )
                .into_response()
        }
    }
}
