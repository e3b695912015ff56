//! Small helpers shared by the HTTP-backed clients.

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Build a reqwest client with the service user agent and a per-request timeout.
pub(crate) fn build_client(purpose: &str, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(format!("docingest/{purpose}"))
        .timeout(timeout)
        .build()
}

/// Parse a base URL and strip trailing slashes from its path.
pub(crate) fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

/// Join a base URL and a relative path with exactly one separating slash.
pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Drain a failed response into its status and body text.
pub(crate) async fn failure_parts(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}
