use thiserror::Error;

/// Errors that abort a cross-reference build.
///
/// Anything recoverable (an unknown link target, a missing index entry, a
/// remote lookup failure) is logged instead and never shows up here.
#[derive(Error, Debug)]
pub enum CerLinkError {
    #[error("config error: {message}")]
    Config { message: String },

    #[error("schema error: {message} (path: {path})")]
    Schema { message: String, path: String },

    #[error("unterminated bracket in '{text}' at position {position}")]
    UnterminatedBracket { text: String, position: usize },

    #[error("xml error: {message} (path: {path})")]
    Xml { message: String, path: String },

    #[error("remote resolver error: {message}")]
    Remote { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience alias for results using `CerLinkError`.
pub type Result<T> = std::result::Result<T, CerLinkError>;
