use nsgen_storage::StorageError;
use std::borrow::Cow;

/// Failures of the bundle pipeline.
///
/// Only `Validation` and `NotFound` carry caller-facing detail; every other variant is
/// reported to clients as an opaque server error.
#[nsgen_derive::nsgen_error]
pub enum BundleError {
    /// A request field is missing or malformed. `field` uses the wire (camelCase) name.
    #[error("Invalid {field}{}: {message}", format_context(.context))]
    Validation {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    /// Unknown, already claimed, or expired download token.
    #[error("Download not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A derived value broke an invariant the templates rely on.
    #[error("Configuration consistency violated{}: {message}", format_context(.context))]
    ConfigConsistency { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Archive I/O failure{}: {source}", format_context(.context))]
    Archive { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Archive encoder failure{}: {source}", format_context(.context))]
    Zip { source: zip::result::ZipError, context: Option<Cow<'static, str>> },

    #[error("Scratch storage failure{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[cfg(feature = "server")]
    #[error("API state failure{}: {source}", format_context(.context))]
    State {
        source: nsgen_kernel::server::ApiStateError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal bundle error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl BundleError {
    pub(crate) fn validation(
        field: &'static str,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Validation { field: field.into(), message: message.into(), context: None }
    }

    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    /// Whether the failure is the caller's fault (4xx) rather than the service's.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }
}
