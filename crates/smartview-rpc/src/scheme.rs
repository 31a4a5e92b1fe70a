//! Custom URL scheme request/response types.
//!
//! This is the contract between a scheme handler and the native view: the
//! view hands over an HTTP-like request and expects a `{data, mime, status,
//! headers}` response back.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{Response, StatusCode};

/// Request intercepted on a custom scheme.
pub type SchemeRequest = http::Request<Vec<u8>>;

/// Response synthesized for a custom scheme request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeResponse {
	/// Response body.
	pub data: Vec<u8>,
	/// MIME type, sent as `Content-Type`.
	pub mime: String,
	/// HTTP status code.
	pub status: u16,
	/// Extra response headers.
	pub headers: BTreeMap<String, String>,
}

impl SchemeResponse {
	/// Creates a response with the given status, MIME type and body.
	pub fn new(status: u16, mime: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
		Self {
			data: data.into(),
			mime: mime.into(),
			status,
			headers: BTreeMap::new(),
		}
	}

	/// Adds a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}

	/// Adds several headers.
	pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.headers
			.extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
		self
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(k, _)| k.eq_ignore_ascii_case(name))
			.map(|(_, v)| v.as_str())
	}

	/// Converts into an `http::Response`.
	///
	/// Header names or values that are not valid HTTP are dropped with a
	/// warning and an invalid status becomes 500; conversion never fails.
	pub fn into_http(self) -> Response<Vec<u8>> {
		let mut response = Response::new(self.data);
		*response.status_mut() =
			StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		let headers = response.headers_mut();
		match HeaderValue::from_str(&self.mime) {
			Ok(value) => {
				headers.insert(CONTENT_TYPE, value);
			}
			Err(_) => tracing::warn!(mime = %self.mime, "dropping invalid content type"),
		}
		for (name, value) in &self.headers {
			match (
				HeaderName::from_bytes(name.as_bytes()),
				HeaderValue::from_str(value),
			) {
				(Ok(name), Ok(value)) => {
					headers.insert(name, value);
				}
				_ => tracing::warn!(header = %name, "dropping invalid response header"),
			}
		}
		response
	}
}

/// Future returned by a [`SchemeHandler`].
pub type SchemeFuture = BoxFuture<'static, SchemeResponse>;

/// Handler answering requests on one custom scheme.
#[derive(Clone)]
pub struct SchemeHandler {
	inner: Arc<dyn Fn(SchemeRequest) -> SchemeFuture + Send + Sync>,
}

impl SchemeHandler {
	/// Creates a scheme handler from an async function.
	pub fn new<F, Fut>(f: F) -> Self
	where
		F: Fn(SchemeRequest) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = SchemeResponse> + Send + 'static,
	{
		Self {
			inner: Arc::new(move |request: SchemeRequest| -> SchemeFuture { f(request).boxed() }),
		}
	}

	/// Handles one request.
	pub fn handle(&self, request: SchemeRequest) -> SchemeFuture {
		(self.inner)(request)
	}
}

impl fmt::Debug for SchemeHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SchemeHandler").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_into_http_carries_status_mime_and_headers() {
		// Arrange
		let response = SchemeResponse::new(404, "application/json", b"{}".to_vec())
			.with_header("Access-Control-Allow-Origin", "*");

		// Act
		let http = response.into_http();

		// Assert
		assert_eq!(http.status(), StatusCode::NOT_FOUND);
		assert_eq!(http.headers()[CONTENT_TYPE], "application/json");
		assert_eq!(http.headers()["access-control-allow-origin"], "*");
		assert_eq!(http.body(), b"{}");
	}

	#[rstest]
	fn test_into_http_drops_invalid_parts() {
		// Arrange
		let response = SchemeResponse::new(99, "text/plain", Vec::new())
			.with_header("bad header", "value")
			.with_header("X-Ok", "yes");

		// Act
		let http = response.into_http();

		// Assert
		assert_eq!(http.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(http.headers().len(), 2);
		assert_eq!(http.headers()["x-ok"], "yes");
	}

	#[rstest]
	fn test_header_lookup_is_case_insensitive() {
		// Arrange
		let response = SchemeResponse::new(200, "text/plain", Vec::new())
			.with_header("Access-Control-Allow-Methods", "GET");

		// Act & Assert
		assert_eq!(response.header("access-control-allow-methods"), Some("GET"));
		assert_eq!(response.header("missing"), None);
	}

	#[rstest]
	#[tokio::test]
	async fn test_scheme_handler_handles_request() {
		// Arrange
		let handler = SchemeHandler::new(|request: SchemeRequest| async move {
			SchemeResponse::new(200, "text/plain", request.uri().to_string().into_bytes())
		});
		let request = http::Request::builder()
			.uri("demo://hello/")
			.body(Vec::new())
			.unwrap();

		// Act
		let response = handler.handle(request).await;

		// Assert
		assert_eq!(response.status, 200);
		assert_eq!(response.data, b"demo://hello/");
	}
}
