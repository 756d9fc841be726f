#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("no {0} configured")]
    NoComponents(&'static str),

    #[error("store: {0}")]
    Store(#[from] browse_api::StoreError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
