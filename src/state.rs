//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It is
//! built once at startup and never mutated: the parsed config and the LLM
//! client. The client is absent when no usable credential is configured, or
//! when it failed to build, in which case the build error is kept alongside.

use std::sync::Arc;

use crate::config::CopilotConfig;
use crate::llm::LlmChat;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CopilotConfig>,
    pub llm: Option<Arc<dyn LlmChat>>,
    /// Why the client failed to build despite a usable key.
    pub llm_init_error: Option<Arc<str>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: CopilotConfig, llm: Option<Arc<dyn LlmChat>>) -> Self {
        Self { config: Arc::new(config), llm, llm_init_error: None }
    }

    #[must_use]
    pub fn with_llm_init_error(mut self, cause: impl Into<Arc<str>>) -> Self {
        self.llm_init_error = Some(cause.into());
        self
    }
}
