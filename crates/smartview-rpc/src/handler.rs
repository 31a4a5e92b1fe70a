//! Host-side RPC handlers.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HandlerError;

/// Future returned by a [`Handler`].
pub type HandlerFuture = BoxFuture<'static, Result<Reply, HandlerError>>;

/// Arguments of a single call.
///
/// Plain-value calls carry JSON arguments in call order. Binary calls carry
/// the raw request body and the request headers and no JSON arguments.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
	args: Vec<Value>,
	body: Bytes,
	headers: HeaderMap,
}

impl Invocation {
	/// Creates a plain-value invocation.
	pub fn from_args(args: Vec<Value>) -> Self {
		Self {
			args,
			..Self::default()
		}
	}

	/// Creates a binary invocation from a request body and its headers.
	pub fn from_body(body: impl Into<Bytes>, headers: HeaderMap) -> Self {
		Self {
			args: Vec::new(),
			body: body.into(),
			headers,
		}
	}

	pub fn args(&self) -> &[Value] {
		&self.args
	}

	/// Deserializes the argument at `index`.
	///
	/// A missing argument deserializes from `null`, so optional parameters
	/// can be read as `Option<T>`.
	pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, HandlerError> {
		let value = self.args.get(index).cloned().unwrap_or(Value::Null);
		serde_json::from_value(value)
			.map_err(|e| HandlerError::new(format!("argument {}: {}", index, e)))
	}

	pub fn body(&self) -> &Bytes {
		&self.body
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Consumes the invocation and returns the request body.
	pub fn into_body(self) -> Bytes {
		self.body
	}
}

/// Value a handler produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
	/// Any JSON-representable value.
	Json(Value),
	/// Raw bytes, returned without JSON encoding on the binary transport.
	Bytes(Bytes),
}

impl Reply {
	/// Serializes `value` into a JSON reply.
	pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
		Ok(Reply::Json(serde_json::to_value(value)?))
	}

	/// Converts the reply to a JSON value. Bytes become an array of numbers,
	/// which is how the plain-value bridge represents them.
	pub fn into_json(self) -> Value {
		match self {
			Reply::Json(value) => value,
			Reply::Bytes(bytes) => Value::from(bytes.to_vec()),
		}
	}
}

impl From<Value> for Reply {
	fn from(value: Value) -> Self {
		Reply::Json(value)
	}
}

impl From<()> for Reply {
	fn from(_: ()) -> Self {
		Reply::Json(Value::Null)
	}
}

impl From<String> for Reply {
	fn from(value: String) -> Self {
		Reply::Json(Value::String(value))
	}
}

impl From<&str> for Reply {
	fn from(value: &str) -> Self {
		Reply::Json(Value::String(value.to_string()))
	}
}

impl From<bool> for Reply {
	fn from(value: bool) -> Self {
		Reply::Json(Value::Bool(value))
	}
}

impl From<i64> for Reply {
	fn from(value: i64) -> Self {
		Reply::Json(Value::from(value))
	}
}

impl From<f64> for Reply {
	fn from(value: f64) -> Self {
		Reply::Json(Value::from(value))
	}
}

impl From<Bytes> for Reply {
	fn from(value: Bytes) -> Self {
		Reply::Bytes(value)
	}
}

impl From<Vec<u8>> for Reply {
	fn from(value: Vec<u8>) -> Self {
		Reply::Bytes(Bytes::from(value))
	}
}

/// A host function callable from the page.
///
/// Cloning is cheap; clones share the same function.
#[derive(Clone)]
pub struct Handler {
	inner: Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>,
}

impl Handler {
	/// Creates a handler from an async function.
	pub fn new<F, Fut, R>(f: F) -> Self
	where
		F: Fn(Invocation) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
		R: Into<Reply>,
	{
		Self {
			inner: Arc::new(move |invocation: Invocation| -> HandlerFuture {
				f(invocation).map(|r| r.map(Into::into)).boxed()
			}),
		}
	}

	/// Creates a handler from a synchronous function.
	pub fn from_fn<F, R>(f: F) -> Self
	where
		F: Fn(Invocation) -> Result<R, HandlerError> + Send + Sync + 'static,
		R: Into<Reply>,
	{
		Self {
			inner: Arc::new(move |invocation: Invocation| -> HandlerFuture {
				let result: Result<Reply, HandlerError> = f(invocation).map(Into::into);
				futures::future::ready(result).boxed()
			}),
		}
	}

	/// Invokes the handler.
	///
	/// A panic inside the handler, whether raised while building the future
	/// or while polling it, is reported as a [`HandlerError`] instead of
	/// unwinding into the caller.
	pub fn call(&self, invocation: Invocation) -> HandlerFuture {
		let inner = self.inner.clone();
		let started =
			std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || inner(invocation)));
		match started {
			Ok(fut) => std::panic::AssertUnwindSafe(fut)
				.catch_unwind()
				.map(|outcome| outcome.unwrap_or_else(|panic| Err(panic_error(panic))))
				.boxed(),
			Err(panic) => futures::future::ready(Err(panic_error(panic))).boxed(),
		}
	}
}

impl fmt::Debug for Handler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Handler").finish_non_exhaustive()
	}
}

fn panic_error(panic: Box<dyn std::any::Any + Send>) -> HandlerError {
	let detail = panic
		.downcast_ref::<&str>()
		.map(|s| s.to_string())
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic".to_string());
	HandlerError::new(format!("handler panicked: {}", detail))
}
