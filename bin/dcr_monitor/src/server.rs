use ntex::web;

/// Liveness probe
#[web::get("/healthz")]
async fn healthz() -> web::HttpResponse {
  web::HttpResponse::Ok().body("ok")
}

async fn unhandled() -> web::HttpResponse {
  web::HttpResponse::NotFound().finish()
}

pub fn ntex_config(config: &mut web::ServiceConfig) {
  config.service(healthz);
}

/// ## Gen
///
/// Build the health server bound to `host`.
/// `host` is either `tcp://<addr>` or `unix://<path>`.
///
pub fn gen(host: &str) -> std::io::Result<ntex::server::Server> {
  let server = web::HttpServer::new(|| {
    web::App::new()
      .configure(ntex_config)
      .default_service(web::route().to(unhandled))
  });
  let server = if let Some(addr) = host.strip_prefix("tcp://") {
    server.bind(addr).map_err(|err| {
      log::error!("server: unable to bind tcp host {addr}: {err}");
      err
    })?
  } else if let Some(path) = host.strip_prefix("unix://") {
    server.bind_uds(path).map_err(|err| {
      log::error!("server: unable to bind unix socket {path}: {err}");
      err
    })?
  } else {
    return Err(std::io::Error::new(
      std::io::ErrorKind::InvalidInput,
      format!("{host} is not valid use tcp:// or unix:// as protocol"),
    ));
  };
  log::info!("server: listening on {host}");
  Ok(server.run())
}
