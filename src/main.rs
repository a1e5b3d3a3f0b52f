mod config;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use llm::LlmChat;

#[tokio::main]
async fn main() {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::CopilotConfig::from_env().expect("invalid configuration");
    let port = config.port;

    // Non-fatal: the chat endpoint reports the missing key or the build
    // failure per request.
    let mut init_error = None;
    let llm: Option<Arc<dyn LlmChat>> = match config.usable_api_key() {
        Some(key) => match llm::openai::OpenAiClient::new(
            key.to_string(),
            config.model.clone(),
            config.openai_base_url.clone(),
            config.connect_timeout_secs,
        ) {
            Ok(client) => {
                tracing::info!(model = client.model(), "LLM client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::error!(error = %e, "LLM client failed to build; chat disabled");
                init_error = Some(e.to_string());
                None
            }
        },
        None => {
            tracing::warn!("OPENAI_API_KEY not configured; chat disabled");
            None
        }
    };

    let mut state = state::AppState::new(config, llm);
    if let Some(cause) = init_error {
        state = state.with_llm_init_error(cause);
    }
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "reform-copilot listening");
    axum::serve(listener, app).await.expect("server failed");
}
