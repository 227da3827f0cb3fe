use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RagClient;
use crate::error::{Error, Result};

/// A vector embedding
pub type Embedding = Vec<f32>;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embeds `texts` in order, one request per configured batch.
pub async fn embed_texts(rag: &RagClient, texts: &[String]) -> Result<Vec<Embedding>> {
    if texts.is_empty() {
        return Ok(vec![]);
    }
    let cfg = rag.config();
    let url = rag.openai_url("embeddings");
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(cfg.embed_batch_size.max(1)) {
        debug!(inputs = batch.len(), model = %cfg.embed_model, "requesting embeddings");
        let req = EmbedRequest {
            model: &cfg.embed_model,
            input: batch,
        };
        let res = rag
            .http()
            .post_json::<EmbedResponse, _>(&url, rag.openai_auth(), &req)
            .await?;
        out.extend(parse_embeddings(res, batch.len())?);
    }
    Ok(out)
}

fn parse_embeddings(res: EmbedResponse, expected: usize) -> Result<Vec<Embedding>> {
    if res.data.len() != expected {
        return Err(Error::Decode(format!(
            "expected {} embeddings, got {}",
            expected,
            res.data.len()
        )));
    }
    let mut data = res.data;
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_returned_in_input_order() {
        let res: EmbedResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.5]},{"index":0,"embedding":[0.25]}]}"#,
        )
        .expect("valid response");
        assert_eq!(parse_embeddings(res, 2).expect("parsed"), vec![vec![0.25], vec![0.5]]);
    }

    #[test]
    fn count_mismatch_is_a_decode_error() {
        let res: EmbedResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[0.25]}]}"#).expect("valid response");
        assert!(matches!(parse_embeddings(res, 2), Err(Error::Decode(_))));
    }
}
