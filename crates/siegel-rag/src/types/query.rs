//! Query request types

use serde::{Deserialize, Serialize};

/// User id recorded when the caller does not identify itself
pub const ANONYMOUS_USER: &str = "anonymous";

/// Request body for `POST /api/ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Identifier produced by the caller's session layer
    #[serde(default)]
    pub user_id: Option<String>,

    /// Number of chunks to retrieve; the configured default when absent
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AskRequest {
    /// User id, or `anonymous`
    pub fn user(&self) -> &str {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(ANONYMOUS_USER)
    }
}
