//! See [`Config`].

use std::str::FromStr;

use axum::http::HeaderValue;
use thiserror::Error;

/// The address the server listens on if `ADDRESS` isn't set.
const DEFAULT_ADDRESS: &str = "127.0.0.1:8888";

/// The Netlify API origin used if `NETLIFY_API_ORIGIN` isn't set.
const DEFAULT_API_ORIGIN: &str = "https://api.netlify.com";

/// The request body limit used if `MAX_BODY_BYTES` isn't set.
///
/// A 10 MB ZIP grows by a third when Base64-encoded, so this leaves headroom above that.
const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// The server's configuration, loaded once at startup and shared by every request.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct Config {
    /// The socket address to listen on.
    pub(crate) address: String,

    /// The Netlify personal access token, or `None` if it isn't configured.
    pub(crate) auth_token: Option<String>,

    /// The origin of the Netlify API, without a trailing slash.
    pub(crate) api_origin: String,

    /// The maximum size of a request body in bytes.
    pub(crate) max_body_bytes: usize,

    /// Whether to delete a newly created site when uploading its deploy fails.
    pub(crate) delete_orphaned_sites: bool,

    /// Whether to reject uploads that don't start with a ZIP signature before creating a site.
    pub(crate) require_zip_signature: bool,

    /// The origin allowed to make cross-origin requests, or `None` to disable CORS.
    pub(crate) cors_allow_origin: Option<HeaderValue>,
}

/// An error loading the [`Config`].
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[error("environment variable `{name}` is invalid ({value:?}): {reason}")]
pub(crate) struct ConfigError {
    /// The name of the invalid variable.
    name: &'static str,

    /// The variable's value.
    value: String,

    /// Why the value was rejected.
    reason: String,
}

impl Config {
    /// Loads the configuration from environment variables, including any in a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable has an invalid value.
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| dotenvy::var(name).ok())
    }

    /// Loads the configuration from a function that looks up variables by name.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable has an invalid value.
    pub(crate) fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let address = var("ADDRESS").unwrap_or_else(|| DEFAULT_ADDRESS.into());

        // An empty token can't authenticate anything, so it counts as missing.
        let auth_token = var("NETLIFY_AUTH_TOKEN").filter(|token| !token.trim().is_empty());

        let api_origin = var("NETLIFY_API_ORIGIN")
            .unwrap_or_else(|| DEFAULT_API_ORIGIN.into())
            .trim_end_matches('/')
            .to_owned();

        if !(api_origin.starts_with("http://") || api_origin.starts_with("https://")) {
            return Err(ConfigError {
                name: "NETLIFY_API_ORIGIN",
                value: api_origin,
                reason: "expected an `http` or `https` origin".into(),
            });
        }

        let max_body_bytes = parse_var(&var, "MAX_BODY_BYTES")?.unwrap_or(DEFAULT_MAX_BODY_BYTES);

        let delete_orphaned_sites = parse_flag(&var, "DELETE_ORPHANED_SITES")?;
        let require_zip_signature = parse_flag(&var, "REQUIRE_ZIP_SIGNATURE")?;

        let cors_allow_origin = parse_var(&var, "CORS_ALLOW_ORIGIN")?;

        Ok(Self {
            address,
            auth_token,
            api_origin,
            max_body_bytes,
            delete_orphaned_sites,
            require_zip_signature,
            cors_allow_origin,
        })
    }
}

/// Parses an optional variable with [`FromStr`].
fn parse_var<F, T>(var: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    let Some(value) = var(name) else {
        return Ok(None);
    };

    match value.trim().parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(error) => Err(ConfigError {
            name,
            value,
            reason: error.to_string(),
        }),
    }
}

/// Parses an optional boolean flag that defaults to `false`, accepting `true`/`false` and `1`/`0`
/// in any case.
fn parse_flag<F>(var: &F, name: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let Some(value) = var(name) else {
        return Ok(false);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError {
            name,
            value,
            reason: "expected `true` or `false`".into(),
        }),
    }
}
