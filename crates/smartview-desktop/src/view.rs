//! [`View`] implementation backed by a wry webview.
//!
//! The webview itself only exists once [`DesktopApp::run`](crate::DesktopApp::run)
//! builds it on the event loop thread. Until then `DesktopView` collects
//! exposed functions, scheme handlers and scripts; afterwards work for the
//! webview is posted to the event loop as [`UserEvent`]s.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use smartview_rpc::{
	ExposeOptions, Handler, InjectionTime, LaunchPolicy, SchemeHandler, SchemeRequest,
	SchemeResponse, Script, View,
};
use tokio::runtime::Handle;

use crate::bridge::{Bridge, BridgeMessage};

#[derive(Debug, Default)]
struct SchemeRegistry {
	names: Vec<String>,
	sealed: bool,
}

static SCHEMES: Lazy<Mutex<SchemeRegistry>> = Lazy::new(|| Mutex::new(SchemeRegistry::default()));

/// Custom schemes registered in this process, in registration order.
pub fn registered_schemes() -> Vec<String> {
	SCHEMES.lock().names.clone()
}

/// Closes scheme registration and returns the registered names.
///
/// The engine only accepts custom schemes before the first webview exists.
pub(crate) fn seal_schemes() -> Vec<String> {
	let mut schemes = SCHEMES.lock();
	schemes.sealed = true;
	schemes.names.clone()
}

/// Work for the event loop thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
	/// Evaluate a script in the webview.
	Evaluate(String),
	/// A page finished loading.
	PageLoaded,
}

type EventSink = Arc<dyn Fn(UserEvent) + Send + Sync>;

fn deliver(sink: Option<&EventSink>, event: UserEvent) {
	match sink {
		Some(sink) => sink(event),
		None => tracing::debug!(?event, "no event loop attached; dropping view event"),
	}
}

struct ScriptEntry {
	script: Script,
	baked: bool,
	ran: bool,
}

/// Injected scripts and whether each still has to run.
#[derive(Default)]
struct ScriptBook {
	entries: Vec<ScriptEntry>,
	started: bool,
}

impl ScriptBook {
	/// Records a script. Returns code to evaluate right away when the
	/// webview already exists.
	fn add(&mut self, script: Script) -> Option<String> {
		let immediate = self.started.then(|| script.code.clone());
		self.entries.push(ScriptEntry {
			script,
			baked: false,
			ran: self.started,
		});
		immediate
	}

	/// Marks the webview as built and returns the creation-time scripts to
	/// install as initialization scripts.
	fn start(&mut self) -> Vec<String> {
		self.started = true;
		self.entries
			.iter_mut()
			.filter(|e| e.script.time == InjectionTime::Creation)
			.map(|e| {
				e.baked = true;
				e.ran = true;
				e.script.code.clone()
			})
			.collect()
	}

	/// Scripts to evaluate after a page load.
	fn on_page_load(&mut self) -> Vec<String> {
		self.entries
			.iter_mut()
			.filter(|e| !e.baked && (e.script.permanent || !e.ran))
			.map(|e| {
				e.ran = true;
				e.script.code.clone()
			})
			.collect()
	}
}

/// A native desktop view.
pub struct DesktopView {
	bridge: Arc<Bridge>,
	schemes: RwLock<HashMap<String, (SchemeHandler, LaunchPolicy)>>,
	scripts: Mutex<ScriptBook>,
	sink: RwLock<Option<EventSink>>,
	runtime: Handle,
}

impl DesktopView {
	/// Creates a view whose handlers run on `runtime`.
	pub fn new(runtime: Handle) -> Self {
		Self {
			bridge: Arc::new(Bridge::new()),
			schemes: RwLock::new(HashMap::new()),
			scripts: Mutex::new(ScriptBook::default()),
			sink: RwLock::new(None),
			runtime,
		}
	}

	/// Routes view events to the event loop.
	pub(crate) fn attach(&self, sink: impl Fn(UserEvent) + Send + Sync + 'static) {
		*self.sink.write() = Some(Arc::new(sink));
	}

	fn post(&self, event: UserEvent) {
		deliver(self.sink.read().as_ref(), event);
	}

	/// Whether `name` is exposed through the bridge.
	pub fn is_exposed(&self, name: &str) -> bool {
		self.bridge.contains(name)
	}

	/// Whether a handler is installed for `scheme`.
	pub fn handles_scheme(&self, scheme: &str) -> bool {
		self.schemes.read().contains_key(scheme)
	}

	pub(crate) fn start(&self) -> Vec<String> {
		self.scripts.lock().start()
	}

	pub(crate) fn on_page_load(&self) -> Vec<String> {
		self.scripts.lock().on_page_load()
	}

	pub(crate) fn post_page_loaded(&self) {
		self.post(UserEvent::PageLoaded);
	}

	/// Handles one IPC message posted by the page.
	pub(crate) fn on_ipc_message(&self, raw: &str) {
		let message = match BridgeMessage::parse(raw) {
			Ok(message) => message,
			Err(response) => {
				tracing::warn!(error = ?response.error, "malformed bridge message");
				self.post(UserEvent::Evaluate(response.to_script()));
				return;
			}
		};

		let bridge = Arc::clone(&self.bridge);
		match self.bridge.launch_policy(&message.name).unwrap_or_default() {
			LaunchPolicy::Sync => {
				let response = self.runtime.block_on(bridge.handle(message));
				self.post(UserEvent::Evaluate(response.to_script()));
			}
			LaunchPolicy::Async => {
				let sink = self.sink.read().clone();
				self.runtime.spawn(async move {
					let response = bridge.handle(message).await;
					deliver(sink.as_ref(), UserEvent::Evaluate(response.to_script()));
				});
			}
		}
	}

	/// Answers a request intercepted on `scheme` through `respond`.
	pub(crate) fn on_scheme_request<F>(&self, scheme: &str, request: SchemeRequest, respond: F)
	where
		F: FnOnce(http::Response<Vec<u8>>) + Send + 'static,
	{
		let entry = self.schemes.read().get(scheme).cloned();
		let Some((handler, policy)) = entry else {
			tracing::debug!(scheme, uri = %request.uri(), "no handler for scheme request");
			respond(SchemeResponse::new(404, "text/plain", b"Not Found".to_vec()).into_http());
			return;
		};

		match policy {
			LaunchPolicy::Async => {
				self.runtime.spawn(async move {
					respond(handler.handle(request).await.into_http());
				});
			}
			LaunchPolicy::Sync => {
				let response = self.runtime.block_on(handler.handle(request));
				respond(response.into_http());
			}
		}
	}
}

impl View for DesktopView {
	fn register_scheme(name: &str) {
		let mut schemes = SCHEMES.lock();
		if schemes.sealed {
			tracing::warn!(
				scheme = name,
				"custom schemes must be registered before the first view is built; ignoring"
			);
			return;
		}
		if !schemes.names.iter().any(|n| n == name) {
			schemes.names.push(name.to_string());
			tracing::debug!(scheme = name, "registered custom scheme");
		}
	}

	fn expose(&self, name: &str, handler: Handler, options: ExposeOptions) {
		self.bridge.expose(name, handler, options);
	}

	fn clear_exposed(&self, name: Option<&str>) {
		self.bridge.clear(name);
	}

	fn handle_scheme(&self, name: &str, handler: SchemeHandler, policy: LaunchPolicy) {
		if !registered_schemes().iter().any(|n| n == name) {
			tracing::warn!(scheme = name, "handling a scheme that was never registered");
		}
		self.schemes
			.write()
			.insert(name.to_string(), (handler, policy));
	}

	fn remove_scheme(&self, name: &str) {
		self.schemes.write().remove(name);
	}

	fn inject(&self, script: Script) {
		if let Some(code) = self.scripts.lock().add(script) {
			self.post(UserEvent::Evaluate(code));
		}
	}

	fn scheme_url(&self, scheme: &str) -> String {
		// WebView2 and Android WebView only see custom schemes as
		// `http://<scheme>.<host>`, with the host lowercased.
		if cfg!(any(target_os = "windows", target_os = "android")) {
			smartview_rpc::mapped_scheme_url(scheme)
		} else {
			format!("{}://", scheme)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use serial_test::serial;
	use smartview_rpc::{HandlerError, Invocation};

	fn recording_sink(view: &DesktopView) -> Arc<Mutex<Vec<UserEvent>>> {
		let events = Arc::new(Mutex::new(Vec::new()));
		let recorded = events.clone();
		view.attach(move |event| recorded.lock().push(event));
		events
	}

	fn add() -> Handler {
		Handler::from_fn(|inv: Invocation| Ok(inv.arg::<i64>(0)? + inv.arg::<i64>(1)?))
	}

	#[rstest]
	fn test_script_before_start_by_time() {
		// Arrange
		let mut book = ScriptBook::default();
		book.add(Script::new("early()").time(InjectionTime::Creation));
		book.add(Script::new("ready()"));
		book.add(Script::new("always()").permanent(true));

		// Act
		let baked = book.start();
		let first_load = book.on_page_load();
		let second_load = book.on_page_load();

		// Assert
		assert_eq!(baked, vec!["early()".to_string()]);
		assert_eq!(first_load, vec!["ready()".to_string(), "always()".to_string()]);
		assert_eq!(second_load, vec!["always()".to_string()]);
	}

	#[rstest]
	fn test_script_after_start_runs_immediately() {
		// Arrange
		let mut book = ScriptBook::default();
		book.start();

		// Act
		let once = book.add(Script::new("once()"));
		let kept = book.add(Script::new("kept()").permanent(true));

		// Assert
		assert_eq!(once.as_deref(), Some("once()"));
		assert_eq!(kept.as_deref(), Some("kept()"));
		assert_eq!(book.on_page_load(), vec!["kept()".to_string()]);
	}

	#[rstest]
	fn test_inject_after_start_posts_evaluate() {
		// Arrange
		let runtime = tokio::runtime::Runtime::new().unwrap();
		let view = DesktopView::new(runtime.handle().clone());
		let events = recording_sink(&view);
		view.start();

		// Act
		view.inject(Script::new("console.log(1)"));

		// Assert
		assert_eq!(
			*events.lock(),
			vec![UserEvent::Evaluate("console.log(1)".to_string())]
		);
	}

	#[rstest]
	fn test_sync_ipc_call_resolves_inline() {
		// Arrange
		let runtime = tokio::runtime::Runtime::new().unwrap();
		let view = DesktopView::new(runtime.handle().clone());
		let events = recording_sink(&view);
		view.expose("add", add(), ExposeOptions::default());

		// Act
		view.on_ipc_message(r#"{"id":1,"name":"add","args":[2,3]}"#);

		// Assert
		let events = events.lock();
		assert_eq!(events.len(), 1);
		let UserEvent::Evaluate(script) = &events[0] else {
			panic!("expected a script");
		};
		assert!(script.contains(r#""id":1"#));
		assert!(script.contains(r#""data":5"#));
	}

	#[rstest]
	fn test_malformed_ipc_message_answers_with_failure() {
		// Arrange
		let runtime = tokio::runtime::Runtime::new().unwrap();
		let view = DesktopView::new(runtime.handle().clone());
		let events = recording_sink(&view);

		// Act
		view.on_ipc_message("{oops");

		// Assert
		let events = events.lock();
		let UserEvent::Evaluate(script) = &events[0] else {
			panic!("expected a script");
		};
		assert!(script.contains("invalid message format"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_async_ipc_call_runs_on_runtime() {
		// Arrange
		let view = DesktopView::new(Handle::current());
		let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
		view.attach(move |event| {
			let _ = tx.send(event);
		});
		view.expose(
			"greet",
			Handler::new(|inv: Invocation| async move {
				let name: String = inv.arg(0)?;
				Ok::<_, HandlerError>(json!({ "greeting": format!("Hi {}", name) }))
			}),
			ExposeOptions {
				is_async: true,
				launch: LaunchPolicy::Async,
			},
		);

		// Act
		view.on_ipc_message(r#"{"id":9,"name":"greet","args":["Ada"]}"#);
		let event = rx.recv().await.unwrap();

		// Assert
		let UserEvent::Evaluate(script) = event else {
			panic!("expected a script");
		};
		assert!(script.contains("Hi Ada"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_scheme_request_without_handler_is_404() {
		// Arrange
		let view = DesktopView::new(Handle::current());
		let (tx, rx) = tokio::sync::oneshot::channel();
		let request = http::Request::builder()
			.uri("saucer-rpc://f")
			.body(Vec::new())
			.unwrap();

		// Act
		view.on_scheme_request("saucer-rpc", request, move |response| {
			let _ = tx.send(response);
		});

		// Assert
		let response = rx.await.unwrap();
		assert_eq!(response.status(), 404);
	}

	#[rstest]
	#[tokio::test]
	async fn test_scheme_request_dispatches_async_handler() {
		// Arrange
		let view = DesktopView::new(Handle::current());
		view.handle_scheme(
			"saucer-rpc",
			SchemeHandler::new(|request: SchemeRequest| async move {
				SchemeResponse::new(200, "application/octet-stream", request.into_body())
			}),
			LaunchPolicy::Async,
		);
		let (tx, rx) = tokio::sync::oneshot::channel();
		let request = http::Request::builder()
			.method("POST")
			.uri("saucer-rpc://echo")
			.body(vec![4u8, 5])
			.unwrap();

		// Act
		view.on_scheme_request("saucer-rpc", request, move |response| {
			let _ = tx.send(response);
		});

		// Assert
		let response = rx.await.unwrap();
		assert_eq!(response.status(), 200);
		assert_eq!(response.body(), &vec![4u8, 5]);
		assert_eq!(
			response.headers()["content-type"],
			"application/octet-stream"
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_registry_binary_call_through_desktop_view() {
		// Arrange
		let view = Arc::new(DesktopView::new(Handle::current()));
		let rpc = smartview_rpc::SmartviewRpc::new(view.clone());
		rpc.define(
			"double",
			smartview_rpc::RpcSchema::new()
				.param(smartview_rpc::types::param("x", smartview_rpc::types::buffer()))
				.returns(smartview_rpc::types::buffer()),
			Handler::from_fn(|inv: Invocation| {
				Ok(inv.body().iter().map(|b| b * 2).collect::<Vec<u8>>())
			}),
		)
		.unwrap();
		let (tx, rx) = tokio::sync::oneshot::channel();
		let request = http::Request::builder()
			.method("POST")
			.uri("saucer-rpc://double")
			.body(vec![1u8, 2, 3])
			.unwrap();

		// Act
		view.on_scheme_request(smartview_rpc::RPC_SCHEME, request, move |response| {
			let _ = tx.send(response);
		});

		// Assert
		let response = rx.await.unwrap();
		assert_eq!(response.status(), 200);
		assert_eq!(response.body(), &vec![2u8, 4, 6]);
		assert!(!view.is_exposed("double"));
		assert_eq!(view.start().len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_remove_scheme_uninstalls_handler() {
		// Arrange
		let view = DesktopView::new(Handle::current());
		view.handle_scheme(
			"app",
			SchemeHandler::new(|_| async { SchemeResponse::new(200, "text/plain", Vec::new()) }),
			LaunchPolicy::Async,
		);

		// Act
		view.remove_scheme("app");

		// Assert
		assert!(!view.handles_scheme("app"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_expose_and_clear() {
		// Arrange
		let view = DesktopView::new(Handle::current());
		view.expose("a", add(), ExposeOptions::default());
		view.expose("b", add(), ExposeOptions::default());

		// Act
		view.clear_exposed(Some("a"));

		// Assert
		assert!(!view.is_exposed("a"));
		assert!(view.is_exposed("b"));
		view.clear_exposed(None);
		assert!(!view.is_exposed("b"));
	}

	#[rstest]
	#[serial(desktop_schemes)]
	fn test_scheme_registration_closes_at_build() {
		// Act
		DesktopView::register_scheme("saucer-rpc");
		DesktopView::register_scheme("saucer-rpc");
		let sealed = seal_schemes();
		DesktopView::register_scheme("late");

		// Assert
		assert_eq!(sealed, vec!["saucer-rpc".to_string()]);
		assert_eq!(registered_schemes(), vec!["saucer-rpc".to_string()]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_scheme_url_matches_platform_mapping() {
		// Arrange
		let view = DesktopView::new(Handle::current());

		// Act
		let url = view.scheme_url("saucer-rpc");

		// Assert
		if cfg!(any(target_os = "windows", target_os = "android")) {
			assert_eq!(url, "http://saucer-rpc.rpc/");
		} else {
			assert_eq!(url, "saucer-rpc://");
		}
	}
}
