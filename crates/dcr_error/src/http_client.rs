use ntex::http::StatusCode;

use super::io::{FromIo, IoError};

/// Non successful answer of a remote api
#[derive(Clone, Debug)]
pub struct ApiError {
  pub status: StatusCode,
  pub msg: String,
}

impl ApiError {
  pub fn new<T>(status: StatusCode, msg: T) -> Self
  where
    T: ToString,
  {
    Self {
      status,
      msg: msg.to_string(),
    }
  }
}

impl std::fmt::Display for ApiError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}] {}", self.status, self.msg)
  }
}

impl std::error::Error for ApiError {}

#[derive(Debug)]
pub enum HttpClientError {
  IoError(IoError),
  Api(ApiError),
}

pub type HttpClientResult<T> = Result<T, HttpClientError>;

impl HttpClientError {
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      HttpClientError::Api(err) => Some(err.status),
      HttpClientError::IoError(_) => None,
    }
  }

  pub fn is_not_found(&self) -> bool {
    self.status() == Some(StatusCode::NOT_FOUND)
  }

  pub fn is_conflict(&self) -> bool {
    self.status() == Some(StatusCode::CONFLICT)
  }
}

impl std::fmt::Display for HttpClientError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      HttpClientError::IoError(err) => write!(f, "{err}"),
      HttpClientError::Api(err) => write!(f, "{err}"),
    }
  }
}

impl std::error::Error for HttpClientError {}

impl From<ApiError> for IoError {
  fn from(f: ApiError) -> Self {
    let kind = match f.status {
      StatusCode::NOT_FOUND => std::io::ErrorKind::NotFound,
      StatusCode::CONFLICT => std::io::ErrorKind::AlreadyExists,
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
        std::io::ErrorKind::PermissionDenied
      }
      StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
        std::io::ErrorKind::InvalidInput
      }
      StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
        std::io::ErrorKind::TimedOut
      }
      _ => std::io::ErrorKind::Other,
    };
    IoError::from(std::io::Error::new(kind, f.to_string()))
  }
}

impl From<HttpClientError> for IoError {
  fn from(f: HttpClientError) -> Self {
    match f {
      HttpClientError::IoError(err) => err,
      HttpClientError::Api(err) => err.into(),
    }
  }
}

impl From<Box<IoError>> for HttpClientError {
  fn from(f: Box<IoError>) -> Self {
    Self::IoError(*f)
  }
}

impl From<IoError> for HttpClientError {
  fn from(f: IoError) -> Self {
    Self::IoError(f)
  }
}

impl From<ApiError> for HttpClientError {
  fn from(f: ApiError) -> Self {
    Self::Api(f)
  }
}

impl FromIo<IoError> for HttpClientError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> IoError
  where
    C: ToString + std::fmt::Display,
  {
    IoError::from(self).map_err_context(context)
  }
}
