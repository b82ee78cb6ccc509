use thiserror::Error;

/// Failure of a single backend call.
///
/// The UI collapses every variant into one screen-specific notice; the
/// distinction only matters for logs and for the session gate, which treats
/// any failure of the current-user lookup as an expired token.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum FormError {
    #[error("{field} must be a number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{0} is required")]
    Required(&'static str),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("passwords do not match")]
    PasswordMismatch,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no {0} directory available on this platform")]
    MissingDir(&'static str),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("token store: {0}")]
    Store(#[from] std::io::Error),
}
