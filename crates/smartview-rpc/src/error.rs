//! Error types for smartview-rpc.

use http::StatusCode;
use thiserror::Error;

/// Errors that can occur in RPC registry and transport operations.
#[derive(Debug, Error)]
pub enum RpcError {
	/// A `define` call was malformed (for example an empty function name).
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// A binary call referenced a function that is not defined.
	#[error("Function '{0}' not found")]
	FunctionNotFound(String),

	/// A handler returned an error or panicked.
	#[error("{0}")]
	HandlerFailure(String),

	/// Writing generated declarations failed.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl RpcError {
	/// Returns the status code this error is reported with on the binary
	/// transport.
	pub fn status_code(&self) -> StatusCode {
		match self {
			RpcError::FunctionNotFound(_) => StatusCode::NOT_FOUND,
			RpcError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
			RpcError::HandlerFailure(_) | RpcError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

/// Error returned by an RPC handler.
///
/// The message is what the page-side caller sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
	message: String,
}

impl HandlerError {
	/// Creates a handler error with the given message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	/// Returns the error message.
	pub fn message(&self) -> &str {
		&self.message
	}
}

impl From<String> for HandlerError {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

impl From<&str> for HandlerError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

impl From<serde_json::Error> for HandlerError {
	fn from(err: serde_json::Error) -> Self {
		Self::new(err.to_string())
	}
}

impl From<HandlerError> for RpcError {
	fn from(err: HandlerError) -> Self {
		RpcError::HandlerFailure(err.message)
	}
}
