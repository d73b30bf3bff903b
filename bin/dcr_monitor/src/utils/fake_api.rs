use std::sync::{Arc, Mutex};

use ntex::web;
use ntex::util::Bytes;
use ntex::http::StatusCode;
use ntex::time::Millis;
use ntex::web::test::TestServer;

use super::http_client::RestClient;

#[derive(Clone)]
struct FakeRoute {
  method: String,
  path: String,
  status: u16,
  body: String,
  once: bool,
}

/// Request received by a [FakeApi]
#[derive(Clone, Debug)]
pub struct FakeCall {
  pub method: String,
  pub path: String,
  pub query: String,
  pub body: String,
}

impl FakeCall {
  pub fn json(&self) -> serde_json::Value {
    serde_json::from_str(&self.body).unwrap_or_default()
  }
}

/// Rest api answering canned responses and recording what it received.
/// Unknown routes answer `404` like the real apis do for missing resources.
#[derive(Clone, Default)]
pub struct FakeApi {
  routes: Arc<Mutex<Vec<FakeRoute>>>,
  calls: Arc<Mutex<Vec<FakeCall>>>,
}

impl FakeApi {
  pub fn new() -> Self {
    Self::default()
  }

  fn route(
    self,
    method: &str,
    path: &str,
    status: u16,
    body: String,
    once: bool,
  ) -> Self {
    self.routes.lock().unwrap().push(FakeRoute {
      method: method.to_owned(),
      path: path.to_owned(),
      status,
      body,
      once,
    });
    self
  }

  /// Answer every `method path` request with `status` and a json body
  pub fn on(
    self,
    method: &str,
    path: &str,
    status: u16,
    body: serde_json::Value,
  ) -> Self {
    self.route(method, path, status, body.to_string(), false)
  }

  /// Answer the next `method path` request only, later ones fall through
  pub fn once(
    self,
    method: &str,
    path: &str,
    status: u16,
    body: serde_json::Value,
  ) -> Self {
    self.route(method, path, status, body.to_string(), true)
  }

  pub fn on_text(self, method: &str, path: &str, body: &str) -> Self {
    self.route(method, path, 200, body.to_owned(), false)
  }

  fn answer(&self, method: &str, path: &str) -> (u16, String) {
    let mut routes = self.routes.lock().unwrap();
    let pos = routes
      .iter()
      .position(|route| route.method == method && route.path == path);
    let Some(pos) = pos else {
      return (404, r#"{"message": "not found"}"#.to_owned());
    };
    let route = routes[pos].clone();
    if route.once {
      routes.remove(pos);
    }
    (route.status, route.body)
  }

  /// `METHOD path` of every request received, in order
  pub fn calls(&self) -> Vec<String> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .map(|call| format!("{} {}", call.method, call.path))
      .collect()
  }

  /// Last request received on `method path`
  pub fn call(&self, method: &str, path: &str) -> Option<FakeCall> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .rev()
      .find(|call| call.method == method && call.path == path)
      .cloned()
  }

  pub fn start(&self) -> TestServer {
    let api = self.clone();
    web::test::server(move || {
      web::App::new()
        .state(api.clone())
        .default_service(web::route().to(serve))
    })
  }

  /// Client of the server returned by [start](FakeApi::start)
  pub fn client(srv: &TestServer, context: &'static str) -> RestClient {
    RestClient::new(context, &srv.url("/"), Millis::from_secs(5))
  }
}

async fn serve(
  req: web::HttpRequest,
  body: Bytes,
  api: web::types::State<FakeApi>,
) -> web::HttpResponse {
  let method = req.method().as_str().to_owned();
  let path = req.path().to_owned();
  api.calls.lock().unwrap().push(FakeCall {
    method: method.clone(),
    path: path.clone(),
    query: req.query_string().to_owned(),
    body: String::from_utf8_lossy(&body).into_owned(),
  });
  let (status, body) = api.answer(&method, &path);
  let status =
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
  web::HttpResponse::build(status)
    .content_type("application/json")
    .body(body)
}
