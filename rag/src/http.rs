use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;
use tracing::debug;

use crate::error::{Error, Result};

/// Credentials attached to a single request.
#[derive(Clone, Copy, Debug)]
pub enum Auth<'a> {
    /// `Authorization: Bearer ...` (OpenAI)
    Bearer(&'a str),
    /// `Api-Key: ...` (Pinecone)
    ApiKey(&'a str),
}

/// Pooled client shared by every call the process makes.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, auth: Auth<'_>) -> Result<T> {
        let req = with_auth(self.client.get(url), auth);
        send("GET", url, req).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        auth: Auth<'_>,
        body: &B,
    ) -> Result<T> {
        let req = with_auth(self.client.post(url), auth)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        send("POST", url, req).await
    }
}

fn with_auth(req: RequestBuilder, auth: Auth<'_>) -> RequestBuilder {
    match auth {
        Auth::Bearer(key) => req.bearer_auth(key),
        Auth::ApiKey(key) => req.header("Api-Key", key),
    }
}

async fn send<T: DeserializeOwned>(method: &'static str, url: &str, req: RequestBuilder) -> Result<T> {
    debug!(method, url, "sending request");
    let resp = req.send().await.map_err(|e| transport_error(method, url, &e))?;
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| transport_error(method, url, &e))?;
    if !status.is_success() {
        return Err(Error::Remote {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }
    from_str::<T>(&text)
        .map_err(|e| Error::Decode(format!("{} {} decode failed: {} | {}", method, url, e, text)))
}

fn transport_error(method: &'static str, url: &str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            method,
            url: url.to_string(),
        }
    } else {
        Error::Transport {
            method,
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
