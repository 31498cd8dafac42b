use std::{
  backtrace::{Backtrace, BacktraceStatus},
  fmt::Display,
};

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};

/// The five error kinds the ingestion pipeline can raise.
///
/// `ExternalServiceError` is fatal when raised during extraction but
/// non-fatal (logged, swallowed) when raised during embedding refresh.
/// `ContradictionCheckError` is always non-fatal: it is logged and the
/// episode still commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  Store,
  ExternalService,
  ContradictionCheck,
  Configuration,
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Self::Validation => "validation_error",
      Self::Store => "store_error",
      Self::ExternalService => "external_service_error",
      Self::ContradictionCheck => "contradiction_check_error",
      Self::Configuration => "configuration_error",
    };
    write!(f, "{s}")
  }
}

#[derive(Debug)]
pub struct AppError {
  err: anyhow::Error,
  kind: ErrorKind,
  status_code: StatusCode,
}

impl AppError {
  /// Create with 500 status, kind `Store` (the common storage-layer failure path).
  pub fn new<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::Store, err)
  }

  pub fn with_kind<E: Into<anyhow::Error>>(kind: ErrorKind, err: E) -> Self {
    let status_code = match kind {
      ErrorKind::Validation => StatusCode::BAD_REQUEST,
      ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
      ErrorKind::Store | ErrorKind::ExternalService | ErrorKind::ContradictionCheck => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    Self {
      err: err.into(),
      kind,
      status_code,
    }
  }

  pub fn validation<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::Validation, err)
  }

  pub fn external_service<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::ExternalService, err)
  }

  pub fn contradiction_check<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::ContradictionCheck, err)
  }

  pub fn configuration<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::Configuration, err)
  }

  #[must_use]
  pub const fn kind(&self) -> ErrorKind {
    self.kind
  }

  #[must_use]
  pub const fn status_code(&self) -> StatusCode {
    self.status_code
  }

  /// Get backtrace from anyhow (requires `RUST_BACKTRACE=1` to capture)
  pub fn backtrace(&self) -> &Backtrace {
    self.err.backtrace()
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let body = if cfg!(debug_assertions) {
      let bt = self.err.backtrace();
      if bt.status() == BacktraceStatus::Captured {
        format!("[{}] {}\nBacktrace:\n{}", self.kind, self.err, bt)
      } else {
        format!(
          "[{}] {}\n(hint: set RUST_BACKTRACE=1 to enable backtrace)",
          self.kind, self.err
        )
      }
    } else {
      format!("[{}] {}", self.kind, self.err)
    };
    (self.status_code, body).into_response()
  }
}

impl Display for AppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}] {}", self.kind, self.err)
  }
}

impl<E> From<E> for AppError
where
  E: Into<anyhow::Error>,
{
  fn from(err: E) -> Self {
    Self::new(err)
  }
}
