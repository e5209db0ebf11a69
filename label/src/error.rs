use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("label: empty input")]
    EmptyInput,

    #[error("label: missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("label: API error: {0}")]
    Api(String),

    #[error("label: request timed out after {0}s")]
    Timeout(u64),

    #[error("label: malformed response: {0}")]
    Malformed(String),
}
