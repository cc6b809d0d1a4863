use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Configuration missing: {0}")]
    Configuration(String),

    #[error("{0}")]
    Auth(String),

    #[error("request failed ({status}): {detail}")]
    Request { status: u16, detail: String },

    #[error("The model returned no usable output")]
    EmptyResponse,

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}
