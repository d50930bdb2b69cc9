use thiserror::Error;

/// Failure reaching a delivery network or interpreting its reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

/// Failure building a provider client at startup. Disables the platform.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("wrong certificate key extension: {0}")]
    CertificateExtension(String),

    #[error("failed to read certificate at {path}: {reason}")]
    CertificateRead { path: String, reason: String },

    #[error("failed to parse certificate: {0}")]
    CertificateParse(String),

    #[error("invalid proxy url {url}: {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}
