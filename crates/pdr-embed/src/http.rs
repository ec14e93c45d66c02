//! HTTP plumbing shared by the sidecar clients.

use std::time::Duration;

use pdr_core::{Error, Result};

/// Build a JSON client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("pdr-embed/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))
}

/// POST `body` as JSON and decode the JSON reply. Non-2xx becomes
/// [`Error::Provider`] carrying the status and the start of the body.
pub async fn post_json<B, T>(client: &reqwest::Client, url: &str, body: &B) -> Result<T>
where
    B: serde::Serialize + ?Sized,
    T: serde::de::DeserializeOwned,
{
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| if e.is_timeout() { Error::Timeout(format!("{url}: {e}")) } else { Error::Http(format!("{url}: {e}")) })?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(Error::Provider { status: status.as_u16(), message: text.chars().take(200).collect() });
    }
    resp.json::<T>().await.map_err(|e| Error::Decode(format!("{url}: {e}")))
}

/// Join a base URL and a path without doubling the slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
