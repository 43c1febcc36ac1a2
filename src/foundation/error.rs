use crate::metaphor::parse::ParseError;

pub type PosterResult<T> = Result<T, PosterError>;

#[derive(thiserror::Error, Debug)]
pub enum PosterError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PosterError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
