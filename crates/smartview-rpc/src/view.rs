//! The native view collaborator.
//!
//! A [`View`] is one native rendering surface. The RPC registry only needs a
//! handful of its capabilities: exposing plain-value functions, intercepting
//! a custom URL scheme, and injecting scripts into the page.

use crate::handler::Handler;
use crate::scheme::SchemeHandler;

/// Where a handler runs when the view dispatches a call to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchPolicy {
	/// Run on the view's own thread, blocking it until the handler resolves.
	#[default]
	Sync,
	/// Run on a background executor; the view thread is never blocked.
	Async,
}

/// Options for exposing a function through the plain-value bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExposeOptions {
	/// Whether the page-side call resolves with the awaited handler result.
	pub is_async: bool,
	pub launch: LaunchPolicy,
}

/// When an injected script runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InjectionTime {
	/// Before any page script runs.
	Creation,
	/// Once the document has loaded.
	#[default]
	Ready,
}

/// Which frames an injected script runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InjectionFrame {
	#[default]
	Top,
	All,
}

/// A script to inject into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
	pub code: String,
	pub time: InjectionTime,
	pub frame: InjectionFrame,
	/// Whether the script is re-run after navigations.
	pub permanent: bool,
}

impl Script {
	/// Creates a ready-time, top-frame, non-permanent script.
	pub fn new(code: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			time: InjectionTime::default(),
			frame: InjectionFrame::default(),
			permanent: false,
		}
	}

	pub fn time(mut self, time: InjectionTime) -> Self {
		self.time = time;
		self
	}

	pub fn frame(mut self, frame: InjectionFrame) -> Self {
		self.frame = frame;
		self
	}

	pub fn permanent(mut self, permanent: bool) -> Self {
		self.permanent = permanent;
		self
	}
}

/// A native view the RPC registry can bind to.
pub trait View: Send + Sync + 'static {
	/// Registers a custom scheme with the native engine.
	///
	/// The engine only accepts registrations made before the first view is
	/// constructed in the process.
	fn register_scheme(name: &str)
	where
		Self: Sized;

	/// Exposes `handler` to page script under `name`.
	fn expose(&self, name: &str, handler: Handler, options: ExposeOptions);

	/// Removes an exposed function, or every exposed function when `name`
	/// is `None`. Unknown names are ignored.
	fn clear_exposed(&self, name: Option<&str>);

	/// Routes requests on the custom scheme `name` to `handler`.
	fn handle_scheme(&self, name: &str, handler: SchemeHandler, policy: LaunchPolicy);

	/// Stops routing requests on the custom scheme `name`.
	fn remove_scheme(&self, name: &str);

	/// Injects a script into the page.
	fn inject(&self, script: Script);

	/// Returns the URL prefix page script uses to reach `scheme`; the
	/// function name is appended to it.
	fn scheme_url(&self, scheme: &str) -> String {
		format!("{}://", scheme)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_script_defaults() {
		// Act
		let script = Script::new("void 0");

		// Assert
		assert_eq!(script.time, InjectionTime::Ready);
		assert_eq!(script.frame, InjectionFrame::Top);
		assert!(!script.permanent);
	}

	#[rstest]
	fn test_script_builder_chain() {
		// Act
		let script = Script::new("void 0")
			.time(InjectionTime::Creation)
			.frame(InjectionFrame::All)
			.permanent(true);

		// Assert
		assert_eq!(script.time, InjectionTime::Creation);
		assert_eq!(script.frame, InjectionFrame::All);
		assert!(script.permanent);
	}
}
