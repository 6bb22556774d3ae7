//! See [`FilePayload`].

use std::str::FromStr;

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use derive_more::derive::{AsRef, Deref};
use serde_with::DeserializeFromStr;
use thiserror::Error;

/// Standard Base64 that accepts input with or without trailing padding and ignores nonzero trailing
/// bits, as browsers and other runtimes do.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The signatures a ZIP archive can start with: a local file header, an empty archive's end of
/// central directory record, or a spanned archive marker.
const ZIP_SIGNATURES: [&[u8; 4]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// The bytes of an uploaded file, deserialized from a Base64 string.
///
/// The bytes aren't validated here. Netlify rejects archives it can't process.
#[derive(Deref, AsRef, DeserializeFromStr, Clone, PartialEq, Eq, Debug)]
#[as_ref(forward)]
pub(crate) struct FilePayload(Vec<u8>);

impl FilePayload {
    /// Consumes the [`FilePayload`], returning the file's bytes.
    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

/// An error reading or checking a [`FilePayload`].
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub(crate) enum PayloadError {
    /// The payload isn't valid Base64.
    #[error("file isn't valid Base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload decoded to nothing.
    #[error("file is empty")]
    Empty,

    /// The payload doesn't start with a ZIP signature.
    #[error("file isn't a ZIP archive")]
    NotZip,
}

impl FromStr for FilePayload {
    type Err = PayloadError;

    /// Decodes Base64 the way Node's `Buffer.from(str, "base64")` does: the URL-safe alphabet is
    /// accepted too, characters outside the alphabet are skipped, and decoding stops at the first
    /// `=`.
    fn from_str(str: &str) -> Result<Self, Self::Err> {
        let mut base64: Vec<u8> = str
            .bytes()
            .take_while(|&byte| byte != b'=')
            .filter_map(|byte| match byte {
                b'-' => Some(b'+'),
                b'_' => Some(b'/'),
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' => Some(byte),
                _ => None,
            })
            .collect();

        // A lone trailing symbol holds fewer than 8 bits, so it can't complete a byte.
        if base64.len() % 4 == 1 {
            base64.pop();
        }

        Ok(Self(LENIENT_BASE64.decode(base64)?))
    }
}

/// Checks that a file is nonempty and starts with a ZIP signature.
///
/// # Errors
///
/// Returns an error if the file is empty or isn't a ZIP archive.
pub(crate) fn check_zip_signature(bytes: &[u8]) -> Result<(), PayloadError> {
    if bytes.is_empty() {
        return Err(PayloadError::Empty);
    }

    if !ZIP_SIGNATURES
        .iter()
        .any(|signature| bytes.starts_with(*signature))
    {
        return Err(PayloadError::NotZip);
    }

    Ok(())
}
