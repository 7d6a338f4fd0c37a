//! Request plumbing shared by the OpenAI-compatible clients.

use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// POST `body` as JSON with a bearer token and return the response if the
/// status is a success.
///
/// On failure the `Err` carries a human-readable message; callers wrap it in
/// their own [`RagError`](crate::RagError) variant. The service's own
/// `error.message` is preferred over the raw body when it parses.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> Result<reqwest::Response, String> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&text).map(|e| e.error.message).unwrap_or(text);
    Err(format!("API returned {status}: {detail}"))
}
