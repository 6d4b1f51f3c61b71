use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type FlowResult<T> = std::result::Result<T, FlowError>;
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration failed : {0}")]
    Config(#[from] ConfigError),
    #[error("authorization flow failed : {0}")]
    Flow(#[from] FlowError),
    #[error("API request failed : {0}")]
    Api(#[from] ApiError),
}

/// Failures while reading or rewriting the credentials file.
///
/// These are fatal at startup: without a consumer key pair nothing else in
/// the crate can sign a request.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read credentials file {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },
    #[error("could not write credentials file {path}: {source}")]
    Unwritable {
        path: String,
        source: std::io::Error,
    },
    #[error("credentials file {path} is not valid JSON: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },
}

/// Failures during the three-legged authorization handshake.
#[derive(Error, Debug)]
pub enum FlowError {
    /// The remote service rejected a token request with a non-200 status.
    /// The response body is preserved for diagnostics.
    #[error("token endpoint returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    /// The token endpoint answered 200 but the body is missing one of the
    /// `oauth_token` / `oauth_token_secret` keys.
    #[error("malformed token response: not found {key} in {body}")]
    MalformedTokenResponse { key: &'static str, body: String },
    /// The supplied token matches no pending temporary credential. Covers
    /// forged, expired, and replayed callbacks alike.
    #[error("unknown or expired oauth_token : {0}")]
    UnknownToken(String),
    #[error("could not read verifier : {0}")]
    Prompt(#[from] std::io::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures while calling the service's ordinary data endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Any non-200 response. The body is preserved verbatim.
    #[error("request returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response body is not valid JSON : {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures below the OAuth layer: the HTTP exchange itself.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed : {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL : {0}")]
    InvalidUrl(String),
}
