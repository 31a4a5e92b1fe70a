//! In-memory [`View`] for exercising RPC definitions without a native window.
//!
//! [`RecordingView`] records every call the registry makes and lets tests
//! drive synthetic page-side calls through the recorded handlers.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;

use crate::channel;
use crate::error::HandlerError;
use crate::handler::{Handler, Invocation, Reply};
use crate::scheme::{SchemeHandler, SchemeRequest, SchemeResponse};
use crate::view::{ExposeOptions, LaunchPolicy, Script, View};

static REGISTERED_SCHEMES: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));

#[derive(Default)]
struct Recorded {
	exposed: Vec<(String, Handler, ExposeOptions)>,
	expose_calls: Vec<String>,
	cleared: Vec<Option<String>>,
	scripts: Vec<Script>,
	schemes: HashMap<String, (SchemeHandler, LaunchPolicy)>,
	scheme_installs: usize,
}

/// A [`View`] that records what it is asked to do.
#[derive(Default)]
pub struct RecordingView {
	recorded: Mutex<Recorded>,
	mapped: bool,
}

impl RecordingView {
	pub fn new() -> Self {
		Self::default()
	}

	/// A view that reaches custom schemes through `http://<scheme>.<host>`
	/// URLs, like engines that cannot load custom schemes directly.
	pub fn mapped() -> Self {
		Self {
			mapped: true,
			..Self::default()
		}
	}

	/// Schemes registered through [`View::register_scheme`] in this process.
	pub fn registered_schemes() -> Vec<String> {
		REGISTERED_SCHEMES.lock().clone()
	}

	/// Names currently exposed, in exposure order.
	pub fn exposed_names(&self) -> Vec<String> {
		self.recorded
			.lock()
			.exposed
			.iter()
			.map(|(name, _, _)| name.clone())
			.collect()
	}

	/// Every name passed to `expose`, including replaced ones.
	pub fn expose_calls(&self) -> Vec<String> {
		self.recorded.lock().expose_calls.clone()
	}

	pub fn expose_options(&self, name: &str) -> Option<ExposeOptions> {
		self.recorded
			.lock()
			.exposed
			.iter()
			.find(|(n, _, _)| n == name)
			.map(|(_, _, options)| *options)
	}

	/// Arguments of every `clear_exposed` call.
	pub fn cleared(&self) -> Vec<Option<String>> {
		self.recorded.lock().cleared.clone()
	}

	/// Injected scripts, in injection order.
	pub fn scripts(&self) -> Vec<Script> {
		self.recorded.lock().scripts.clone()
	}

	pub fn has_scheme(&self, scheme: &str) -> bool {
		self.recorded.lock().schemes.contains_key(scheme)
	}

	pub fn scheme_policy(&self, scheme: &str) -> Option<LaunchPolicy> {
		self.recorded
			.lock()
			.schemes
			.get(scheme)
			.map(|(_, policy)| *policy)
	}

	/// Number of `handle_scheme` calls.
	pub fn scheme_installs(&self) -> usize {
		self.recorded.lock().scheme_installs
	}

	/// Sends a synthetic request to the handler installed for the URL's
	/// scheme. Returns `None` when no handler is installed.
	pub async fn request(
		&self,
		method: http::Method,
		url: &str,
		body: impl Into<Vec<u8>>,
	) -> Option<SchemeResponse> {
		let request = http::Request::builder()
			.method(method)
			.uri(url)
			.body(body.into())
			.ok()?;
		self.send(request).await
	}

	/// Like [`request`](Self::request), for a fully built request.
	///
	/// `http(s)://<scheme>.<host>` URLs are routed to `<scheme>`.
	pub async fn send(&self, request: SchemeRequest) -> Option<SchemeResponse> {
		let uri = request.uri();
		let scheme = match (uri.scheme_str()?, uri.host()) {
			("http" | "https", Some(host)) => host.split('.').next().unwrap_or(host).to_string(),
			(scheme, _) => scheme.to_string(),
		};
		let handler = self
			.recorded
			.lock()
			.schemes
			.get(&scheme)
			.map(|(handler, _)| handler.clone())?;
		Some(handler.handle(request).await)
	}

	/// Calls an exposed function the way the plain-value bridge would.
	/// Returns `None` when `name` is not exposed.
	pub async fn call_exposed(
		&self,
		name: &str,
		args: Vec<Value>,
	) -> Option<Result<Reply, HandlerError>> {
		let handler = self
			.recorded
			.lock()
			.exposed
			.iter()
			.find(|(n, _, _)| n == name)
			.map(|(_, handler, _)| handler.clone())?;
		Some(handler.call(Invocation::from_args(args)).await)
	}
}

impl View for RecordingView {
	fn register_scheme(name: &str) {
		REGISTERED_SCHEMES.lock().push(name.to_string());
	}

	fn expose(&self, name: &str, handler: Handler, options: ExposeOptions) {
		let mut recorded = self.recorded.lock();
		recorded.expose_calls.push(name.to_string());
		match recorded.exposed.iter_mut().find(|(n, _, _)| n == name) {
			Some(entry) => {
				entry.1 = handler;
				entry.2 = options;
			}
			None => recorded.exposed.push((name.to_string(), handler, options)),
		}
	}

	fn clear_exposed(&self, name: Option<&str>) {
		let mut recorded = self.recorded.lock();
		recorded.cleared.push(name.map(str::to_string));
		match name {
			Some(name) => recorded.exposed.retain(|(n, _, _)| n != name),
			None => recorded.exposed.clear(),
		}
	}

	fn handle_scheme(&self, name: &str, handler: SchemeHandler, policy: LaunchPolicy) {
		let mut recorded = self.recorded.lock();
		recorded.scheme_installs += 1;
		recorded.schemes.insert(name.to_string(), (handler, policy));
	}

	fn remove_scheme(&self, name: &str) {
		self.recorded.lock().schemes.remove(name);
	}

	fn inject(&self, script: Script) {
		self.recorded.lock().scripts.push(script);
	}

	fn scheme_url(&self, scheme: &str) -> String {
		if self.mapped {
			channel::mapped_scheme_url(scheme)
		} else {
			format!("{}://", scheme)
		}
	}
}
