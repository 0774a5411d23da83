// Thu Jan 22 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Module not available from this provider: {0}")]
    UnknownModule(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Record dump error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{tool} failed: {reason}")]
    Tool { tool: String, reason: String },
    #[error("Object parse error: {0}")]
    Object(#[from] goblin::error::Error),
}
