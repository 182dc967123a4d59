//! Offline decoder for EU Digital Covid Certificate QR payloads.
//!
//! The payload is a layered encoding: a `HC1:` scheme prefix over base45
//! text, wrapping an optionally zlib-compressed COSE_Sign1 envelope whose
//! payload is a CBOR-encoded CWT carrying the certificate claims. [`decode`]
//! runs the whole pipeline; the per-stage modules are public for callers
//! that want to stop halfway.
//!
//! Each stage up to payload decoding fails fast with its own [`Error`]
//! variant. Field mapping degrades per field instead, so a certificate with
//! an unexpected entry still yields every field that does parse.

use tracing::debug;

pub mod base45;
pub mod cbor;
pub mod cose;
pub mod decompress;
pub mod error;
pub mod hcert;
pub mod report;
pub mod valuesets;

pub use crate::error::Error;
pub use crate::hcert::CertificateRecord;

const HC1_PREFIX: &str = "HC1:";

/// Everything the pipeline produces: the parsed envelope (key id, raw
/// signature), the raw payload value tree, and the mapped certificate.
#[derive(Debug)]
pub struct Decoded {
    pub envelope: cose::Envelope,
    pub payload: cbor::Value,
    pub certificate: CertificateRecord,
}

/// Decode a QR payload string down to a certificate record.
pub fn decode(token: &str) -> Result<Decoded, Error> {
    let token = token.trim_end();
    let encoded = token.strip_prefix(HC1_PREFIX).ok_or_else(|| {
        Error::Format(format!("data must start with the {} prefix", HC1_PREFIX))
    })?;

    let compressed = base45::decode(encoded)?;
    debug!(len = compressed.len(), "base45 decoded");

    let envelope_bytes = decompress::decompress(compressed)?;
    let envelope = cose::Envelope::parse(&envelope_bytes)?;
    debug!(
        payload = envelope.payload.len(),
        signature = envelope.signature.len(),
        "parsed signature envelope"
    );

    let payload = cbor::decode(&envelope.payload)?;
    let certificate = CertificateRecord::from_payload(&payload)?;

    Ok(Decoded {
        envelope,
        payload,
        certificate,
    })
}
