use thiserror::Error;

/// Errors raised while constructing or addressing a picker instance.
///
/// Malformed dates and inconsistent bounds are never reported here; those
/// are repaired during resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PickerError {
    #[error("a start container id is required")]
    MissingTarget,

    #[error("a {0} picker needs an end container id")]
    MissingEndTarget(&'static str),

    #[error("a {0} picker takes a single container id, got an end id `{1}`")]
    UnexpectedEndTarget(&'static str, String),

    #[error("a {0} picker has no end endpoint")]
    NoEndEndpoint(&'static str),

    #[error("a {0} picker has no time panel")]
    NoTimePanel(&'static str),
}
