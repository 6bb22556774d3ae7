//! See [`PlainErrorResponse`].

use axum::{
    body::Body,
    http::{
        header::{ALLOW, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
};

/// An error which implements [`IntoResponse`] by generating a `text/plain` response. The body is
/// the status code and its canonical reason text (e.g. `404 Not Found`) unless a message is set.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) struct PlainErrorResponse {
    /// The [`StatusCode`] to generate the [`Response`] from.
    status: StatusCode,

    /// The response body, if not the status's canonical text.
    message: Option<String>,

    /// The value of the `Allow` header, if any.
    allow: Option<&'static str>,
}

impl PlainErrorResponse {
    /// Sets the response body.
    pub(crate) fn message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }

    /// Sets the `Allow` header, which should list the allowed methods on `405` responses.
    pub(crate) fn allow(mut self, methods: &'static str) -> Self {
        self.allow = Some(methods);
        self
    }
}

impl From<StatusCode> for PlainErrorResponse {
    fn from(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
            allow: None,
        }
    }
}

impl IntoResponse for PlainErrorResponse {
    fn into_response(self) -> Response {
        let body = self.message.unwrap_or_else(|| self.status.to_string());

        let mut response = Response::builder()
            .status(self.status)
            .header(CONTENT_TYPE, "text/plain");

        if let Some(methods) = self.allow {
            response = response.header(ALLOW, methods);
        }

        response
            .body(Body::from(body))
            .expect("response should be valid")
    }
}
