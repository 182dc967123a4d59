use thiserror::Error;

/// Failure modes of the decode pipeline, one variant per stage.
///
/// Everything up to and including payload decoding aborts the whole decode;
/// only `Schema` distinguishes a payload that parsed fine but does not carry
/// an EU DCC claim. Missing individual certificate fields never error, they
/// come back as `None` from the field mapper.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bad scheme prefix: {0}")]
    Format(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("corrupt compressed stream")]
    Decompress(#[source] std::io::Error),

    #[error("malformed signature envelope: {0}")]
    Envelope(String),

    #[error("certificate schema: {0}")]
    Schema(String),
}
