use crate::client::RagClient;
use crate::embed_chunks::{embed_texts, Embedding};
use crate::error::{Error, Result};

pub async fn embed_query(rag: &RagClient, text: &str) -> Result<Embedding> {
    let vecs = embed_texts(rag, &[text.to_string()]).await?;
    vecs.into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Decode("embedding response contained no vector".to_string()))
}
