//! Turns an `x5c` certificate entry into a verification key.
//!
//! JWKS `x5c` entries are standard base64 DER with no armour. The JWT library
//! reads keys from PEM, so the entry is wrapped in `CERTIFICATE` armour with
//! 64-column lines before the RSA public key is extracted.

use crate::auth::error::KeyResolutionError;
use jsonwebtoken::DecodingKey;

const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_FOOTER: &str = "-----END CERTIFICATE-----";
const PEM_LINE_WIDTH: usize = 64;

/// Wrap a base64 DER certificate in PEM armour.
///
/// The body is split into 64-character lines; the last line may be shorter.
pub fn format_pem_certificate(entry: &str) -> String {
    let mut pem = String::with_capacity(
        PEM_HEADER.len() + PEM_FOOTER.len() + entry.len() + entry.len() / PEM_LINE_WIDTH + 3,
    );
    pem.push_str(PEM_HEADER);
    pem.push('\n');

    let mut rest = entry;
    while !rest.is_empty() {
        // base64 is ASCII, so a byte index is always a char boundary; fall
        // back to the whole remainder for anything else.
        let split = if rest.len() > PEM_LINE_WIDTH && rest.is_char_boundary(PEM_LINE_WIDTH) {
            PEM_LINE_WIDTH
        } else {
            rest.len()
        };
        let (line, tail) = rest.split_at(split);
        pem.push_str(line);
        pem.push('\n');
        rest = tail;
    }

    pem.push_str(PEM_FOOTER);
    pem.push('\n');
    pem
}

/// Build an RSA verification key from a JWKS `x5c` entry.
///
/// # Errors
///
/// Returns `KeyResolutionError::MalformedKey` when the entry is empty, is not
/// valid base64, or does not contain an RSA certificate.
pub fn decoding_key_from_certificate(entry: &str) -> Result<DecodingKey, KeyResolutionError> {
    if entry.is_empty() {
        tracing::warn!(target: "gw.auth.certificate", "Empty x5c certificate entry");
        return Err(KeyResolutionError::MalformedKey);
    }

    let pem = format_pem_certificate(entry);
    DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
        tracing::warn!(target: "gw.auth.certificate", error = %e, "Failed to parse x5c certificate");
        KeyResolutionError::MalformedKey
    })
}
