use gloo_net::http::Request;
use session::LoadKind;
use streaming::{ApiError, HttpResponse, RequestToken};
use tracing::debug;
use wasm_bindgen_futures::spawn_local;

/// GET `url`, keeping the status so callers decide what a non-2xx means.
pub async fn get(url: &str) -> Result<HttpResponse, ApiError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    Ok(HttpResponse::new(status, body))
}

/// Runs the fetch in the background and feeds the outcome back to the app.
pub fn spawn(kind: LoadKind, token: RequestToken, url: String) {
    spawn_local(async move {
        let result = get(&url).await;
        debug!(load = %kind, %token, ok = result.is_ok(), "fetch finished");
        crate::dispatch(|app| app.on_fetch_complete(kind, token, result));
    });
}
