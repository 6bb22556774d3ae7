//! See [`Error`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use super::payload::PayloadError;
use crate::{netlify, PlainErrorResponse};

/// The message used when Netlify rejects a site creation without saying why.
const SITE_CREATION_FAILED: &str =
    "Gagal membuat site baru di Netlify. Pastikan nama unik atau token valid.";

/// The message used when Netlify rejects a deploy upload without saying why.
const UPLOAD_FAILED: &str = "Gagal mengunggah file deploy. Periksa format ZIP.";

/// An error handling a deploy request.
#[derive(Error, Debug)]
pub(crate) enum Error {
    /// The server has no Netlify token to authenticate with.
    #[error(
        "Token autentikasi Netlify (NETLIFY_AUTH_TOKEN) tidak ditemukan di Environment Variables."
    )]
    MissingToken,

    /// The request method wasn't `POST`.
    #[error("Metode Tidak Diizinkan. Hanya POST request yang diterima.")]
    MethodNotAllowed,

    /// The request body couldn't be read, e.g. because it's too large.
    #[error("request body couldn't be read: {0}")]
    Body(#[source] axum::Error),

    /// The request body isn't a valid deploy request.
    #[error("invalid request body: {0}")]
    Request(#[from] serde_json::Error),

    /// The uploaded file was rejected before creating a site.
    #[error("{0}")]
    Payload(#[from] PayloadError),

    /// Netlify didn't create the site.
    #[error("{}", upstream_message(.0, SITE_CREATION_FAILED))]
    SiteCreation(#[source] netlify::Error),

    /// Netlify created the site but didn't accept its deploy.
    #[error("{}", upstream_message(.source, UPLOAD_FAILED))]
    Upload {
        /// Why the upload failed.
        source: netlify::Error,

        /// The ID of the created site, if it still exists.
        orphaned_site_id: Option<String>,
    },
}

impl Error {
    /// Gets the HTTP status code this error responds with.
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingToken
            | Self::Body(_)
            | Self::Request(_)
            | Self::Payload(_)
            | Self::SiteCreation(_)
            | Self::Upload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Describes a failed Netlify request, preferring Netlify's own explanation.
fn upstream_message(error: &netlify::Error, fallback: &str) -> String {
    match (error.provider_message(), error) {
        (Some(message), _) => message.to_owned(),
        (None, netlify::Error::Status { .. }) => fallback.to_owned(),
        (None, netlify::Error::Request(_) | netlify::Error::Body(_)) => error.to_string(),
    }
}

/// A JSON error response body.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    /// A description of the error for the user.
    error: String,

    /// The ID of a site that was created but left without a deploy.
    #[serde(skip_serializing_if = "Option::is_none")]
    site_id: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        let error = match &self {
            Self::MethodNotAllowed => {
                return PlainErrorResponse::from(status)
                    .message(self.to_string())
                    .allow("POST")
                    .into_response();
            }
            Self::MissingToken => ErrorResponse {
                error: self.to_string(),
                site_id: None,
            },
            Self::Upload {
                orphaned_site_id, ..
            } => ErrorResponse {
                error: internal_message(&self),
                site_id: orphaned_site_id.clone(),
            },
            Self::Body(_) | Self::Request(_) | Self::Payload(_) | Self::SiteCreation(_) => {
                ErrorResponse {
                    error: internal_message(&self),
                    site_id: None,
                }
            }
        };

        (status, Json(error)).into_response()
    }
}

/// Wraps an error's message with a hint at the usual causes of failed deployments.
fn internal_message(error: &Error) -> String {
    format!(
        "Kesalahan Deployment Internal: {error}. Pastikan file kurang dari 10MB dan token valid."
    )
}
