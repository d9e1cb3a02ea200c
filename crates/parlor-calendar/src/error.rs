use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("calendar is not configured: {0}")]
    Config(String),

    #[error("calendar authentication failed: {0}")]
    Auth(String),

    #[error("calendar provider error: {0}")]
    Provider(String),

    #[error("unexpected calendar response: {0}")]
    InvalidResponse(String),
}
