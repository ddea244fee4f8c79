use super::models::{BundleOptions, DownloadLink, ErrorResponse};
use crate::error::BundleError;
use crate::model::{ConfigRequest, MdmPlatform, TopLevelDomain};
use crate::Bundle;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::SecondsFormat;
use nsgen_derive::api_handler;
use nsgen_kernel::prelude::{ApiState, BUNDLE_TAG};
use strum::IntoEnumIterator;

const ZIP_CONTENT_TYPE: &str = "application/zip";

fn payload(body: Result<Json<ConfigRequest>, JsonRejection>) -> Result<ConfigRequest, BundleError> {
    body.map(|Json(request)| request)
        .map_err(|rejection| BundleError::validation("body", rejection.body_text()))
}

fn zip_response(bytes: Vec<u8>, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, ZIP_CONTENT_TYPE.to_owned()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
            (header::CACHE_CONTROL, "no-store".to_owned()),
        ],
        bytes,
    )
        .into_response()
}

#[api_handler(
    post,
    path = "/api/generate-zip",
    request_body = ConfigRequest,
    responses(
        (status = OK, description = "Configuration archive", content_type = "application/zip", body = Vec<u8>),
        (status = BAD_REQUEST, description = "Invalid field", body = ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Generation failed", body = ErrorResponse),
    ),
    tag = BUNDLE_TAG,
)]
pub(super) async fn generate_zip(
    State(state): State<ApiState>,
    body: Result<Json<ConfigRequest>, JsonRejection>,
) -> Result<Response, BundleError> {
    let bundle = state.try_get_slice::<Bundle>()?;
    let bytes = bundle.generate_archive(payload(body)?).await?;
    Ok(zip_response(bytes, &bundle.config().archive_name))
}

#[api_handler(
    post,
    path = "/api/generate-link",
    request_body = ConfigRequest,
    responses(
        (status = CREATED, description = "Archive stored behind a single-use token", body = DownloadLink),
        (status = BAD_REQUEST, description = "Invalid field", body = ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Generation failed", body = ErrorResponse),
    ),
    tag = BUNDLE_TAG,
)]
pub(super) async fn generate_link(
    State(state): State<ApiState>,
    body: Result<Json<ConfigRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BundleError> {
    let bundle = state.try_get_slice::<Bundle>()?;
    let ticket = bundle.generate_link(payload(body)?).await?;

    let link = DownloadLink {
        download_url: format!("/api/download/{}", ticket.token),
        expires_at: ticket.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        token: ticket.token,
    };
    Ok((StatusCode::CREATED, Json(link)))
}

#[api_handler(
    get,
    path = "/api/download/{token}",
    params(("token" = String, Path, description = "Token returned by generate-link")),
    responses(
        (status = OK, description = "Configuration archive", content_type = "application/zip", body = Vec<u8>),
        (status = NOT_FOUND, description = "Unknown, used or expired token", body = ErrorResponse),
    ),
    tag = BUNDLE_TAG,
)]
pub(super) async fn download(
    State(state): State<ApiState>,
    Path(token): Path<String>,
) -> Result<Response, BundleError> {
    let bundle = state.try_get_slice::<Bundle>()?;
    let bytes = bundle.download(&token).await?;
    Ok(zip_response(bytes, &bundle.config().archive_name))
}

#[api_handler(
    get,
    path = "/api/options",
    responses((status = OK, description = "Choices offered by the form", body = BundleOptions)),
    tag = BUNDLE_TAG,
)]
pub(super) async fn options(State(state): State<ApiState>) -> Result<Json<BundleOptions>, BundleError> {
    let bundle = state.try_get_slice::<Bundle>()?;
    let config = bundle.config();

    Ok(Json(BundleOptions {
        top_level_domains: TopLevelDomain::iter().map(|d| d.to_string()).collect(),
        mdm_platforms: MdmPlatform::iter().map(|p| p.to_string()).collect(),
        layout: config.layout.as_str().to_owned(),
        archive_name: config.archive_name.clone(),
    }))
}

impl IntoResponse for BundleError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation { field, message, .. } => {
                tracing::debug!(field = %field, message = %message, "Rejected bundle request");
                (StatusCode::BAD_REQUEST, ErrorResponse::validation(field, message))
            },
            Self::NotFound { .. } => {
                tracing::debug!(reason = %self, "Download not available");
                (StatusCode::NOT_FOUND, ErrorResponse::not_found())
            },
            _ => {
                tracing::error!(error = %self, "Bundle request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::internal())
            },
        };

        (status, Json(body)).into_response()
    }
}
