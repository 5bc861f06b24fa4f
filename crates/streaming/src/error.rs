/// Failure talking to the backend API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{}", status_message(*status, body))]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
}

fn status_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
