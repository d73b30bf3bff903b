/// Error carrying the component that produced it and an [`std::io::Error`]
/// whose kind classifies the failure.
#[derive(Debug)]
pub struct IoError {
  pub context: Option<String>,
  pub inner: std::io::Error,
}

impl Clone for IoError {
  fn clone(&self) -> Self {
    Self {
      context: self.context.clone(),
      inner: std::io::Error::new(self.inner.kind(), self.inner.to_string()),
    }
  }
}

impl IoError {
  pub fn new<T>(context: T, inner: std::io::Error) -> Self
  where
    T: Into<String>,
  {
    Self {
      context: Some(context.into()),
      inner,
    }
  }

  fn with_kind<C, M>(context: C, kind: std::io::ErrorKind, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::new(
      context.to_string(),
      std::io::Error::new(kind, message.to_string()),
    )
  }

  pub fn invalid_data<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::InvalidData, message)
  }

  pub fn invalid_input<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::InvalidInput, message)
  }

  pub fn not_found<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::NotFound, message)
  }

  pub fn interrupted<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::Interrupted, message)
  }

  pub fn timed_out<C, M>(context: C, message: M) -> Self
  where
    C: ToString,
    M: ToString,
  {
    Self::with_kind(context, std::io::ErrorKind::TimedOut, message)
  }

  pub fn kind(&self) -> std::io::ErrorKind {
    self.inner.kind()
  }

  pub fn context(&self) -> Option<&str> {
    self.context.as_deref()
  }

  pub fn into_inner(self) -> std::io::Error {
    self.inner
  }

  /// Print the error and terminate the process, used for startup failures
  pub fn print_and_exit(&self) -> ! {
    eprintln!("{self}");
    std::process::exit(self.inner.raw_os_error().unwrap_or(1));
  }
}

impl std::fmt::Display for IoError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut message = self.inner.to_string();
    // Strip the " (os error XX)" suffix of raw os errors
    if let Some(pos) = message.find(" (os error ") {
      message.truncate(pos);
    }
    if let Some(first) = message.get_mut(..1) {
      first.make_ascii_uppercase();
    }
    match &self.context {
      Some(ctx) => write!(f, "{ctx}: {message}"),
      None => write!(f, "{message}"),
    }
  }
}

impl std::error::Error for IoError {}

pub type IoResult<T, E = IoError> = Result<T, E>;

/// Convert a foreign error into an [`IoError`] tagged with a context.
pub trait FromIo<T> {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> T
  where
    C: ToString + std::fmt::Display;
}

impl FromIo<IoError> for IoError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> IoError
  where
    C: ToString + std::fmt::Display,
  {
    IoError {
      context: Some(context().to_string()),
      inner: self.inner,
    }
  }
}

impl FromIo<Box<IoError>> for std::io::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some(context().to_string()),
      inner: self,
    })
  }
}

impl FromIo<Box<IoError>> for std::string::FromUtf8Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some(context().to_string()),
      inner: std::io::Error::new(std::io::ErrorKind::InvalidData, self),
    })
  }
}

impl From<Box<IoError>> for IoError {
  fn from(f: Box<IoError>) -> Self {
    *f
  }
}

impl From<std::io::Error> for IoError {
  fn from(f: std::io::Error) -> Self {
    Self {
      context: None,
      inner: f,
    }
  }
}

impl From<IoError> for std::io::Error {
  fn from(f: IoError) -> Self {
    f.inner
  }
}

#[cfg(feature = "serde_json")]
impl FromIo<Box<IoError>> for serde_json::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some(context().to_string()),
      inner: std::io::Error::new(std::io::ErrorKind::InvalidData, self),
    })
  }
}

#[cfg(feature = "serde_yaml")]
impl FromIo<Box<IoError>> for serde_yaml::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some(context().to_string()),
      inner: std::io::Error::new(std::io::ErrorKind::InvalidData, self),
    })
  }
}

#[cfg(feature = "regex")]
impl FromIo<Box<IoError>> for regex::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some(context().to_string()),
      inner: std::io::Error::new(std::io::ErrorKind::InvalidInput, self),
    })
  }
}

#[cfg(feature = "diesel")]
impl FromIo<Box<IoError>> for diesel::result::Error {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    let inner = match self {
      diesel::result::Error::NotFound => {
        std::io::Error::new(std::io::ErrorKind::NotFound, self)
      }
      diesel::result::Error::DatabaseError(
        diesel::result::DatabaseErrorKind::UniqueViolation,
        info,
      ) => std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        info.message().to_owned(),
      ),
      _ => std::io::Error::new(std::io::ErrorKind::InvalidData, self),
    };
    Box::new(IoError {
      context: Some(context().to_string()),
      inner,
    })
  }
}

#[cfg(feature = "ntex")]
impl From<ntex::http::error::BlockingError<IoError>> for IoError {
  fn from(f: ntex::http::error::BlockingError<IoError>) -> Self {
    match f {
      ntex::http::error::BlockingError::Error(e) => e,
      ntex::http::error::BlockingError::Canceled => {
        IoError::interrupted("Blocking task", "Canceled")
      }
    }
  }
}

#[cfg(feature = "ntex")]
impl FromIo<Box<IoError>> for ntex::http::client::error::SendRequestError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    let kind = match &self {
      ntex::http::client::error::SendRequestError::Timeout => {
        std::io::ErrorKind::TimedOut
      }
      ntex::http::client::error::SendRequestError::Connect(_) => {
        std::io::ErrorKind::ConnectionRefused
      }
      _ => std::io::ErrorKind::Interrupted,
    };
    Box::new(IoError {
      context: Some(context().to_string()),
      inner: std::io::Error::new(kind, format!("{self}")),
    })
  }
}

#[cfg(feature = "ntex")]
impl FromIo<Box<IoError>> for ntex::http::client::error::JsonPayloadError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some(context().to_string()),
      inner: std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{self}"),
      ),
    })
  }
}

#[cfg(feature = "ntex")]
impl FromIo<Box<IoError>> for ntex::http::error::PayloadError {
  fn map_err_context<C>(self, context: impl FnOnce() -> C) -> Box<IoError>
  where
    C: ToString + std::fmt::Display,
  {
    Box::new(IoError {
      context: Some(context().to_string()),
      inner: std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{self}"),
      ),
    })
  }
}
