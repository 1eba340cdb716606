use thiserror::Error;

/// Failures of the local key-value store and the collection accessor.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A collection's stored value is not a JSON array of records.
    #[error("collection `{key}` is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Writing the value would exceed the store's byte quota.
    #[error("storage quota exceeded writing `{key}` ({needed} bytes, {quota} allowed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    /// Records could not be encoded for persistence.
    #[error("unable to encode `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend I/O failure.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of account view actions.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The draft is not part of the active address's view.
    #[error("no draft `{0}` for the active address")]
    UnknownDraft(String),

    /// The order is not tracked for the active address.
    #[error("no ongoing inscription `{0}` for the active address")]
    UnknownOrder(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures talking to the inscription ordering service.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The configured base URL cannot be joined with an endpoint path.
    #[error("invalid service url: {0}")]
    Url(String),

    /// Connection, TLS or other transport-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered 2xx but reported a failure in its envelope.
    #[error("service error {code}: {message}")]
    Api { code: i64, message: String },

    /// The response body does not have the shape the endpoint promises.
    #[error("unexpected response from {endpoint}: {source}")]
    Shape {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be encoded.
    #[error("unable to encode request: {0}")]
    Encode(serde_json::Error),
}
