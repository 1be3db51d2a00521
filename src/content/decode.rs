//! Base64 payload decoding
//!
//! Gmail emits URL-safe base64; older or hand-built content sometimes uses the
//! standard alphabet. Both engines accept input with or without padding.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

use crate::error::ContentError;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Decode a payload, trying the URL-safe alphabet before the standard one
pub fn decode(data: &str) -> Result<Vec<u8>, ContentError> {
    let data = data.trim();
    URL_SAFE.decode(data).or_else(|url_err| {
        STANDARD.decode(data).map_err(|std_err| ContentError::Decode {
            reason: format!("url-safe: {url_err}; standard: {std_err}"),
        })
    })
}

/// Decode a payload into text, replacing invalid UTF-8 sequences
pub fn decode_text(data: &str) -> Result<String, ContentError> {
    let bytes = decode(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Encode a raw message for the Gmail API (base64url, unpadded)
pub fn encode_url_safe(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
