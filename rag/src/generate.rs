use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RagClient;
use crate::error::{Error, Result};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    text: Option<String>,
}

pub async fn generate_answer(rag: &RagClient, prompt: &str) -> Result<String> {
    let cfg = rag.config();
    let url = rag.openai_url("completions");
    let req = CompletionRequest {
        model: &cfg.completion_model,
        prompt,
        temperature: cfg.temperature,
        max_tokens: cfg.max_tokens,
    };
    debug!(model = %cfg.completion_model, prompt_chars = prompt.len(), "requesting completion");
    let res = rag
        .http()
        .post_json::<CompletionResponse, _>(&url, rag.openai_auth(), &req)
        .await?;
    res.choices
        .into_iter()
        .next()
        .map(|c| c.text.unwrap_or_default().trim().to_string())
        .ok_or_else(|| Error::Decode("completion response contained no choices".to_string()))
}
