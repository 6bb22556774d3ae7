//! The deploy endpoint, which creates a Netlify site and uploads a ZIP archive as its deploy.
//!
//! This lets a frontend publish a site without holding a Netlify token itself.

mod error;
mod payload;

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::Method,
    Json,
};
use axum_macros::debug_handler;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub(crate) use self::error::Error;
use self::payload::{check_zip_signature, FilePayload};
use crate::{netlify, AppState};

/// The message of a successful deploy response.
const SUCCESS_MESSAGE: &str = "Deployment berhasil!";

/// A deploy request body.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeployRequest {
    /// The subdomain name to request for the new site. Netlify generates one if omitted.
    #[serde(default)]
    pub(crate) site_name: Option<String>,

    /// The ZIP archive of the site's files, from a Base64 string. Its bytes are uploaded unchanged.
    pub(crate) file_base64: FilePayload,

    /// The name of the uploaded file. Only used for logging.
    #[serde(default)]
    pub(crate) file_name: Option<String>,
}

/// A successful deploy response body.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub(crate) struct DeployResponse {
    /// A success message for the user.
    pub(crate) message: String,

    /// The new site's public URL.
    pub(crate) url: String,
}

/// Creates a Netlify site and deploys the request's ZIP archive to it.
///
/// # Errors
///
/// See [`Error`].
#[debug_handler]
pub(crate) async fn handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<DeployResponse>, Error> {
    let result = deploy(&state, request).await;

    if let Err(error) = &result {
        match error {
            Error::MethodNotAllowed => {}
            Error::MissingToken => {
                error!("`NETLIFY_AUTH_TOKEN` isn't configured, so deploys can't be made");
            }
            _ => error!(%error, "deployment failed"),
        }
    }

    result.map(Json)
}

/// Handles a deploy request: validates it, creates the site, and uploads the deploy.
///
/// # Errors
///
/// See [`Error`].
async fn deploy(state: &AppState, request: Request) -> Result<DeployResponse, Error> {
    // The configuration is checked before anything about the request.
    let Some(netlify) = &state.netlify else {
        return Err(Error::MissingToken);
    };

    if request.method() != Method::POST {
        return Err(Error::MethodNotAllowed);
    }

    let body = to_bytes(request.into_body(), state.config.max_body_bytes)
        .await
        .map_err(Error::Body)?;

    let DeployRequest {
        site_name,
        file_base64,
        file_name,
    } = serde_json::from_slice(&body)?;

    debug!(?site_name, ?file_name, bytes = file_base64.len(), "deploy requested");

    // Checked before the site exists, so a rejected upload can't leave it orphaned.
    if state.config.require_zip_signature {
        check_zip_signature(&file_base64)?;
    }

    let site = netlify
        .create_site(site_name.as_deref())
        .await
        .map_err(Error::SiteCreation)?;

    info!(site_id = %site.id, site_name = ?site.name, url = %site.url, "site created");

    match netlify.deploy_zip(&site.id, file_base64.into_inner()).await {
        Ok(Some(deploy)) => {
            info!(site_id = %site.id, deploy_id = %deploy.id, state = ?deploy.state, "deploy uploaded");
        }
        Ok(None) => {
            info!(site_id = %site.id, "deploy uploaded");
        }
        Err(source) => {
            let orphaned_site_id = if state.config.delete_orphaned_sites {
                delete_orphaned_site(netlify, site.id).await
            } else {
                Some(site.id)
            };

            return Err(Error::Upload {
                source,
                orphaned_site_id,
            });
        }
    }

    Ok(DeployResponse {
        message: SUCCESS_MESSAGE.into(),
        url: site.url,
    })
}

/// Deletes a site whose deploy failed, returning its ID if it couldn't be deleted.
async fn delete_orphaned_site(netlify: &netlify::Client, site_id: String) -> Option<String> {
    match netlify.delete_site(&site_id).await {
        Ok(()) => {
            info!(%site_id, "deleted site left without a deploy");
            None
        }
        Err(error) => {
            warn!(%site_id, %error, "couldn't delete site left without a deploy");
            Some(site_id)
        }
    }
}
