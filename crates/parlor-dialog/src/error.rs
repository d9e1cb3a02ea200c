use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogError {
    #[error("assistant is not configured: {0}")]
    Config(String),

    #[error("assistant request failed: {0}")]
    Assistant(String),

    #[error("assistant returned a malformed reply: {0}")]
    MalformedReply(String),
}
