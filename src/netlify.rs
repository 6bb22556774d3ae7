//! A minimal client for the [Netlify API](https://open-api.netlify.com/).

#[cfg(test)]
pub(crate) mod mock;

use axum::http::{header::CONTENT_TYPE, StatusCode};
use reqwest::Response;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The `User-Agent` sent with every request, as Netlify asks API clients to identify themselves.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A Netlify API client authenticated with a personal access token.
#[derive(Clone, Debug)]
pub(crate) struct Client {
    /// The underlying HTTP client. Cloning it shares its connection pool.
    http: reqwest::Client,

    /// The origin of the API, without a trailing slash.
    origin: String,

    /// The bearer token to authenticate with.
    token: String,
}

/// A site hosted on Netlify.
#[derive(Deserialize, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Site {
    /// The site's unique ID.
    pub(crate) id: String,

    /// The site's public URL.
    pub(crate) url: String,

    /// The site's subdomain name.
    #[serde(default)]
    pub(crate) name: Option<String>,
}

/// A deploy of a Netlify site.
#[derive(Deserialize, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Deploy {
    /// The deploy's unique ID.
    pub(crate) id: String,

    /// The deploy's processing state (e.g. `uploaded` or `ready`).
    #[serde(default)]
    pub(crate) state: Option<String>,
}

/// The body of a request to create a site.
#[derive(Serialize, Debug)]
struct CreateSiteRequest<'a> {
    /// The requested subdomain name. Netlify generates one if this is omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// An error from a Netlify API request.
#[derive(Error, Debug)]
pub(crate) enum Error {
    /// The request couldn't be sent or its response couldn't be received.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The API responded with a non-success status.
    #[error("{}", .message.as_deref().unwrap_or("Netlify API request failed"))]
    Status {
        /// The response status.
        status: StatusCode,

        /// The `message` field of the response body, if there is one.
        message: Option<String>,
    },

    /// The API responded with success but its body wasn't what was expected.
    #[error("unexpected Netlify API response: {0}")]
    Body(#[from] serde_json::Error),
}

impl Error {
    /// Gets the message Netlify gave for a failed request, if it gave one.
    pub(crate) fn provider_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            Self::Request(_) | Self::Body(_) => None,
        }
    }
}

impl Client {
    /// Constructs a [`Client`] for the API at the specified origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client can't be initialized (e.g. its TLS backend fails).
    pub(crate) fn new(origin: &str, token: &str) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            origin: origin.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    /// Creates a new site, optionally with a requested subdomain name.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub(crate) async fn create_site(&self, name: Option<&str>) -> Result<Site, Error> {
        let response = self
            .http
            .post(format!("{}/api/v1/sites", self.origin))
            .bearer_auth(&self.token)
            .json(&CreateSiteRequest { name })
            .send()
            .await?;

        parse_response(response).await
    }

    /// Uploads a ZIP archive of a site's files as a new deploy of that site.
    ///
    /// Any success status means the upload was accepted. The returned [`Deploy`] is `None` if the
    /// response body doesn't describe one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Netlify responds with a non-success status.
    pub(crate) async fn deploy_zip(
        &self,
        site_id: &str,
        zip: Vec<u8>,
    ) -> Result<Option<Deploy>, Error> {
        let response = self
            .http
            .post(format!("{}/api/v1/sites/{site_id}/deploys", self.origin))
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/zip")
            .body(zip)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::Status {
                status,
                message: message_from_body(&body),
            });
        }

        Ok(serde_json::from_slice(&body).ok())
    }

    /// Deletes a site and all of its deploys.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub(crate) async fn delete_site(&self, site_id: &str) -> Result<(), Error> {
        let response = self
            .http
            .delete(format!("{}/api/v1/sites/{site_id}", self.origin))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let body = response.bytes().await?;

        Err(Error::Status {
            status,
            message: message_from_body(&body),
        })
    }
}

/// Reads a response body, deserializing it on success or extracting Netlify's error message on
/// failure.
///
/// # Errors
///
/// See [`Error`].
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let status = response.status();

    // The body is read whatever the status, since failed requests explain themselves in it.
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(Error::Status {
            status,
            message: message_from_body(&body),
        });
    }

    Ok(serde_json::from_slice(&body)?)
}

/// Extracts the `message` string from a JSON error body, if the body has one.
fn message_from_body(body: &[u8]) -> Option<String> {
    let Ok(Value::Object(mut fields)) = serde_json::from_slice(body) else {
        return None;
    };

    match fields.remove("message") {
        Some(Value::String(message)) if !message.is_empty() => Some(message),
        _ => None,
    }
}
