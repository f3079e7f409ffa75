use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use url::Url;

use super::traits::{AssetResponse, NetworkError};

/// Fetches origin-relative asset paths over HTTP.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  origin: Url,
}

impl HttpFetcher {
  pub fn new(origin: &str, timeout: Duration) -> Result<Self> {
    let origin = Url::parse(origin).map_err(|e| eyre!("Invalid asset origin {}: {}", origin, e))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  pub fn url_for(&self, path: &str) -> std::result::Result<Url, NetworkError> {
    self
      .origin
      .join(path)
      .map_err(|e| NetworkError(format!("invalid path {}: {}", path, e)))
  }

  /// Any response, whatever its status, is `Ok`. Only a request that never
  /// completes is a `NetworkError`.
  pub async fn get(&self, path: &str) -> std::result::Result<AssetResponse, NetworkError> {
    let url = self.url_for(path)?;

    let response = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(|e| NetworkError(format!("GET {} failed: {}", url, e)))?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| NetworkError(format!("reading body of {} failed: {}", url, e)))?;

    Ok(AssetResponse {
      status,
      headers,
      body: body.to_vec(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  /// Serve a single canned HTTP response and return the origin URL.
  async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = [0u8; 1024];
      let _ = socket.read(&mut buf).await;
      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
      );
      let _ = socket.write_all(response.as_bytes()).await;
      let _ = socket.shutdown().await;
    });

    format!("http://{}/", addr)
  }

  #[test]
  fn test_paths_resolve_against_origin() {
    let fetcher = HttpFetcher::new("http://localhost:8080/app/", Duration::from_secs(1)).unwrap();
    assert_eq!(
      fetcher.url_for("/css/style.css").unwrap().as_str(),
      "http://localhost:8080/css/style.css"
    );
    assert_eq!(
      fetcher.url_for("js/base.js").unwrap().as_str(),
      "http://localhost:8080/app/js/base.js"
    );
  }

  #[test]
  fn test_invalid_origin() {
    assert!(HttpFetcher::new("not a url", Duration::from_secs(1)).is_err());
  }

  #[tokio::test]
  async fn test_get_success() {
    let origin = serve_once("200 OK", "hello").await;
    let fetcher = HttpFetcher::new(&origin, Duration::from_secs(5)).unwrap();

    let response = fetcher.get("/index.html").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"hello".to_vec());
    assert!(response
      .headers
      .iter()
      .any(|(k, v)| k == "content-type" && v == "text/html"));
  }

  #[tokio::test]
  async fn test_error_status_is_a_response() {
    let origin = serve_once("404 Not Found", "").await;
    let fetcher = HttpFetcher::new(&origin, Duration::from_secs(5)).unwrap();

    let response = fetcher.get("/missing.js").await.unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
  }

  #[tokio::test]
  async fn test_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap();
    assert!(fetcher.get("/index.html").await.is_err());
  }
}
