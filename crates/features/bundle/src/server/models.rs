use nsgen_derive::api_model;

/// Deferred download created by `POST /api/generate-link`.
#[api_model]
pub struct DownloadLink {
    /// Single-use download token
    pub token: String,
    /// Relative URL that returns the archive once
    pub download_url: String,
    /// RFC 3339 instant after which the link is dead
    pub expires_at: String,
}

/// Values the form may offer.
#[api_model]
pub struct BundleOptions {
    pub top_level_domains: Vec<String>,
    pub mdm_platforms: Vec<String>,
    /// Active bundle layout (`plist`, `mobileconfig` or `intune-legacy`)
    pub layout: String,
    pub archive_name: String,
}

/// Error body of every failed bundle request.
#[api_model]
pub struct ErrorResponse {
    /// `validation`, `not_found` or `internal`
    pub error: String,
    /// Offending request field (validation errors only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field: Option<String>,
    pub message: String,
}

impl ErrorResponse {
    pub(crate) fn validation(field: &str, message: &str) -> Self {
        Self {
            error: "validation".to_owned(),
            field: Some(field.to_owned()),
            message: message.to_owned(),
        }
    }

    pub(crate) fn not_found() -> Self {
        Self {
            error: "not_found".to_owned(),
            field: None,
            message: "download not found or expired".to_owned(),
        }
    }

    pub(crate) fn internal() -> Self {
        Self {
            error: "internal".to_owned(),
            field: None,
            message: "bundle generation failed".to_owned(),
        }
    }
}
