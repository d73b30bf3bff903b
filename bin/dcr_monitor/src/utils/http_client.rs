use std::cell::RefCell;

use ntex::http;
use ntex::time::Millis;

use dcr_error::io::FromIo;
use dcr_error::http_client::{ApiError, HttpClientError, HttpClientResult};

const USER_AGENT: &str = "dcr_monitor";
/// Largest json document accepted from a remote api
const PAYLOAD_LIMIT: usize = 20_000_000;

/// Json client of a rest api rooted at `url`
#[derive(Clone)]
pub struct RestClient {
  pub url: String,
  context: &'static str,
  client: http::client::Client,
  bearer: RefCell<Option<String>>,
}

impl std::fmt::Display for RestClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.url)
  }
}

impl std::fmt::Debug for RestClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RestClient")
      .field("url", &self.url)
      .field("context", &self.context)
      .finish()
  }
}

impl RestClient {
  /// Client using the default openssl connector and the system trust store
  pub fn new(context: &'static str, url: &str, timeout: Millis) -> Self {
    let client = http::client::Client::build().timeout(timeout).finish();
    Self::with_client(context, url, client)
  }

  pub fn with_client(
    context: &'static str,
    url: &str,
    client: http::client::Client,
  ) -> Self {
    RestClient {
      url: url.trim_end_matches('/').to_owned(),
      context,
      client,
      bearer: RefCell::new(None),
    }
  }

  /// Token sent as `Authorization: Bearer` with every following request
  pub fn set_bearer(&self, token: &str) {
    self.bearer.replace(Some(token.to_owned()));
  }

  fn send_error(
    &self,
    err: http::client::error::SendRequestError,
  ) -> HttpClientError {
    let url = self.url.clone();
    HttpClientError::IoError(*err.map_err_context(|| url))
  }

  fn gen_url(&self, path: &str) -> String {
    format!("{}{}", self.url, path)
  }

  fn authorize(
    &self,
    req: http::client::ClientRequest,
  ) -> http::client::ClientRequest {
    let req = req.header("User-Agent", USER_AGENT);
    match self.bearer.borrow().as_deref() {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  pub fn get(&self, path: &str) -> http::client::ClientRequest {
    self.authorize(self.client.get(self.gen_url(path)))
  }

  fn post(&self, path: &str) -> http::client::ClientRequest {
    self.authorize(self.client.post(self.gen_url(path)))
  }

  fn patch(&self, path: &str) -> http::client::ClientRequest {
    self.authorize(self.client.patch(self.gen_url(path)))
  }

  fn delete(&self, path: &str) -> http::client::ClientRequest {
    self.authorize(self.client.delete(self.gen_url(path)))
  }

  /// Send a prepared request and turn non successful answers into an [ApiError]
  pub async fn send(
    &self,
    req: http::client::ClientRequest,
  ) -> HttpClientResult<http::client::ClientResponse> {
    let mut res = req.send().await.map_err(|err| self.send_error(err))?;
    let status = res.status();
    is_api_error(&mut res, &status).await?;
    Ok(res)
  }

  pub async fn send_get(
    &self,
    path: &str,
  ) -> HttpClientResult<http::client::ClientResponse> {
    self.send(self.get(path)).await
  }

  async fn send_body<B>(
    &self,
    req: http::client::ClientRequest,
    body: Option<&B>,
  ) -> HttpClientResult<http::client::ClientResponse>
  where
    B: serde::Serialize,
  {
    let mut res = match body {
      None => req.send().await.map_err(|err| self.send_error(err))?,
      Some(body) => req
        .send_json(body)
        .await
        .map_err(|err| self.send_error(err))?,
    };
    let status = res.status();
    is_api_error(&mut res, &status).await?;
    Ok(res)
  }

  pub async fn send_post<B>(
    &self,
    path: &str,
    body: Option<&B>,
  ) -> HttpClientResult<http::client::ClientResponse>
  where
    B: serde::Serialize,
  {
    self.send_body(self.post(path), body).await
  }

  pub async fn send_patch<B>(
    &self,
    path: &str,
    body: Option<&B>,
  ) -> HttpClientResult<http::client::ClientResponse>
  where
    B: serde::Serialize,
  {
    self.send_body(self.patch(path), body).await
  }

  pub async fn send_delete<B>(
    &self,
    path: &str,
    body: Option<&B>,
  ) -> HttpClientResult<http::client::ClientResponse>
  where
    B: serde::Serialize,
  {
    self.send_body(self.delete(path), body).await
  }

  pub async fn res_json<R>(
    &self,
    mut res: http::client::ClientResponse,
  ) -> HttpClientResult<R>
  where
    R: serde::de::DeserializeOwned,
  {
    let context = self.context;
    let body = res
      .json::<R>()
      .limit(PAYLOAD_LIMIT)
      .await
      .map_err(|err| err.map_err_context(|| context))?;
    Ok(body)
  }

  pub async fn res_text(
    &self,
    mut res: http::client::ClientResponse,
  ) -> HttpClientResult<String> {
    let context = self.context;
    let body = res
      .body()
      .limit(PAYLOAD_LIMIT)
      .await
      .map_err(|err| err.map_err_context(|| context))?;
    let text = String::from_utf8(body.to_vec())
      .map_err(|err| err.map_err_context(|| context))?;
    Ok(text)
  }
}

/// Best effort extraction of the message of an error document.
/// Kubernetes answers `{"message": ..}`,
/// google apis `{"error": {"message": ..}}`.
pub fn api_error_message(body: &[u8]) -> String {
  let text = String::from_utf8_lossy(body).trim().to_owned();
  let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
    return text;
  };
  value
    .get("message")
    .or_else(|| value.get("error").and_then(|error| error.get("message")))
    .and_then(|msg| msg.as_str())
    .map(|msg| msg.to_owned())
    .unwrap_or(text)
}

async fn is_api_error(
  res: &mut http::client::ClientResponse,
  status: &http::StatusCode,
) -> HttpClientResult<()> {
  if status.is_server_error() || status.is_client_error() {
    let body = res.body().await.unwrap_or_default();
    return Err(ApiError::new(*status, api_error_message(&body)).into());
  }
  Ok(())
}
