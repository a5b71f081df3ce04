use thiserror::Error;

/// Google Play client errors.
#[derive(Debug, Error)]
pub enum PlayError {
    /// Failed to reach the Play backend. Network or TLS level, retryable.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Checkin did not produce a device identity.
    /// The response carried no android ID, or the backend rejected the request.
    /// Do not reuse anything from a failed checkin.
    #[error("Checkin failed: no device identity was issued.")]
    CheckinFailed,

    /// The account credentials (or a stale bearer token) were rejected.
    /// Not retryable without new credentials or a fresh `authenticate()`.
    #[error("Authentication failed.")]
    AuthFailed,
    /// The account requires a browser login, two-factor step or captcha.
    /// Cannot be resolved by this client.
    #[error("Account challenge required. Complete a browser login for this account first.")]
    ChallengeRequired,

    /// A session was built from a zero device identity or an empty token.
    /// Programmer error: run checkin and authenticate first.
    #[error("Incomplete session: missing device identity or auth token.")]
    IncompleteSession,

    /// The package does not exist, or is not visible to the simulated device's region.
    #[error("App not found.")]
    NotFound,
    /// The app is not free. One-click purchase only covers free apps.
    #[error("Payment required.")]
    PaymentRequired,
    /// The app is not available for this device or region.
    #[error("App unavailable.")]
    Unavailable,
    /// The requested version code is not currently offered for the package.
    #[error("Version not offered.")]
    VersionNotOffered,

    /// A required field is missing from a backend response.
    /// This means the backend protocol changed and the field mapping needs updating.
    #[error("Schema mismatch: missing field `{0}`.")]
    SchemaMismatch(&'static str),

    /// Failed to read or write a persisted device identity or token file.
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted device identity or token file could not be parsed.
    #[error("Storage format error: {0}")]
    Json(#[from] serde_json::Error),
}
