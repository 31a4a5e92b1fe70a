//! Desktop application lifecycle management.

use std::convert::Infallible;
use std::sync::Arc;

use parking_lot::Mutex;
use smartview_rpc::SchemeReceipt;
use tao::dpi::LogicalSize;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tao::window::{Window, WindowBuilder};
use tokio::runtime::Runtime;
#[cfg(target_os = "linux")]
use wry::WebViewBuilderExtUnix;
use wry::http::Request;
use wry::{PageLoadEvent, WebView, WebViewBuilder};

use crate::bridge::BRIDGE_INIT_SCRIPT;
use crate::config::ViewConfig;
use crate::error::{DesktopError, Result};
use crate::view::{self, DesktopView, UserEvent};

/// Builder for creating a DesktopApp.
#[derive(Debug, Default)]
pub struct DesktopAppBuilder {
	config: ViewConfig,
	worker_threads: Option<usize>,
}

impl DesktopAppBuilder {
	/// Creates a new builder with default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the window title.
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.config.title = title.into();
		self
	}

	/// Sets the window size.
	pub fn size(mut self, width: u32, height: u32) -> Self {
		self.config.width = width;
		self.config.height = height;
		self
	}

	/// Sets the full view configuration.
	pub fn config(mut self, config: ViewConfig) -> Self {
		self.config = config;
		self
	}

	/// Sets the number of runtime worker threads for async handlers.
	pub fn worker_threads(mut self, threads: usize) -> Self {
		self.worker_threads = Some(threads);
		self
	}

	/// Builds the app.
	///
	/// Requires the receipt from `SmartviewRpc::register_scheme()`, so the
	/// binary RPC scheme is always registered before the view exists.
	/// Scheme registration closes once this returns.
	pub fn build(self, _receipt: SchemeReceipt) -> Result<DesktopApp> {
		let schemes = view::seal_schemes();

		let mut runtime = tokio::runtime::Builder::new_multi_thread();
		runtime.enable_all().thread_name("smartview-worker");
		if let Some(threads) = self.worker_threads {
			runtime.worker_threads(threads);
		}
		let runtime = runtime.build()?;

		let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
		let view = Arc::new(DesktopView::new(runtime.handle().clone()));

		let proxy = Mutex::new(event_loop.create_proxy());
		view.attach(move |event| {
			if proxy.lock().send_event(event).is_err() {
				tracing::debug!("event loop closed; dropping view event");
			}
		});

		tracing::debug!(?schemes, title = %self.config.title, "built desktop app");

		Ok(DesktopApp {
			config: self.config,
			schemes,
			runtime,
			event_loop,
			view,
		})
	}
}

/// The main desktop application.
pub struct DesktopApp {
	config: ViewConfig,
	schemes: Vec<String>,
	runtime: Runtime,
	event_loop: EventLoop<UserEvent>,
	view: Arc<DesktopView>,
}

impl DesktopApp {
	/// Creates a new builder for configuring the application.
	pub fn builder() -> DesktopAppBuilder {
		DesktopAppBuilder::new()
	}

	/// The app's view, to bind an RPC registry to.
	pub fn view(&self) -> &Arc<DesktopView> {
		&self.view
	}

	/// Handle of the runtime async handlers run on.
	pub fn runtime(&self) -> &tokio::runtime::Handle {
		self.runtime.handle()
	}

	/// Creates the window and webview and runs the event loop.
	///
	/// Blocks for the rest of the process. Returns only if the window or the
	/// webview could not be created.
	pub fn run(self) -> Result<Infallible> {
		let DesktopApp {
			config,
			schemes,
			runtime,
			event_loop,
			view,
		} = self;

		let window = create_window(&event_loop, &config)?;
		let webview = create_webview(&window, &config, &schemes, &view)?;

		event_loop.run(move |event, _window_target, control_flow| {
			*control_flow = ControlFlow::Wait;
			let _keep_alive = (&runtime, &window);

			match event {
				Event::UserEvent(UserEvent::Evaluate(script)) => evaluate(&webview, &script),
				Event::UserEvent(UserEvent::PageLoaded) => {
					for script in view.on_page_load() {
						evaluate(&webview, &script);
					}
				}
				Event::WindowEvent {
					event: WindowEvent::CloseRequested,
					..
				} => {
					*control_flow = ControlFlow::Exit;
				}
				_ => {}
			}
		})
	}
}

fn create_window(event_loop: &EventLoop<UserEvent>, config: &ViewConfig) -> Result<Window> {
	WindowBuilder::new()
		.with_title(&config.title)
		.with_inner_size(LogicalSize::new(config.width, config.height))
		.with_resizable(config.resizable)
		.build(event_loop)
		.map_err(|e| DesktopError::WindowCreation(e.to_string()))
}

fn create_webview(
	window: &Window,
	config: &ViewConfig,
	schemes: &[String],
	view: &Arc<DesktopView>,
) -> Result<WebView> {
	let mut builder = WebViewBuilder::new()
		.with_devtools(config.devtools)
		.with_initialization_script(BRIDGE_INIT_SCRIPT);

	for script in view.start() {
		builder = builder.with_initialization_script(&script);
	}

	let ipc_view = Arc::clone(view);
	builder = builder.with_ipc_handler(move |request: Request<String>| {
		ipc_view.on_ipc_message(request.body());
	});

	for scheme in schemes {
		let scheme_view = Arc::clone(view);
		let name = scheme.clone();
		builder = builder.with_asynchronous_custom_protocol(
			scheme.clone(),
			move |_webview_id, request, responder| {
				scheme_view.on_scheme_request(&name, request, move |response| {
					responder.respond(response);
				});
			},
		);
	}

	let load_view = Arc::clone(view);
	builder = builder.with_on_page_load_handler(move |event, url| {
		if let PageLoadEvent::Finished = event {
			tracing::debug!(%url, "page loaded");
			load_view.post_page_loaded();
		}
	});

	builder = match (&config.url, &config.html) {
		(Some(url), _) => builder.with_url(url),
		(None, Some(html)) => builder.with_html(html),
		(None, None) => builder,
	};

	#[cfg(target_os = "linux")]
	let webview = {
		use tao::platform::unix::WindowExtUnix;
		builder.build_gtk(window.gtk_window())
	};

	#[cfg(not(target_os = "linux"))]
	let webview = builder.build(window);

	webview.map_err(|e| DesktopError::WebViewCreation(e.to_string()))
}

fn evaluate(webview: &WebView, script: &str) {
	if let Err(e) = webview.evaluate_script(script) {
		tracing::error!(error = %e, "failed to evaluate script");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_builder_overrides_config() {
		// Act
		let builder = DesktopApp::builder()
			.config(ViewConfig::new().title("Image Tools").html("<p>hi</p>"))
			.size(1280, 720)
			.worker_threads(2);

		// Assert
		assert_eq!(builder.config.title, "Image Tools");
		assert_eq!((builder.config.width, builder.config.height), (1280, 720));
		assert_eq!(builder.config.html.as_deref(), Some("<p>hi</p>"));
		assert_eq!(builder.worker_threads, Some(2));
	}

	#[rstest]
	fn test_title_after_config_wins() {
		// Act
		let builder = DesktopAppBuilder::new()
			.config(ViewConfig::new().title("first"))
			.title("second");

		// Assert
		assert_eq!(builder.config.title, "second");
	}
}
