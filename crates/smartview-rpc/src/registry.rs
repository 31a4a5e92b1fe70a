//! RPC registry bound to one view.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::channel::{self, ChannelState, SchemeReceipt};
use crate::error::RpcError;
use crate::handler::Handler;
use crate::typegen;
use crate::types::RpcSchema;
use crate::view::{ExposeOptions, LaunchPolicy, View};
use crate::Result;

/// Namespace used by [`SmartviewRpc::generate_types_default`].
pub const DEFAULT_NAMESPACE: &str = "saucer";

/// How calls to a function reach its handler.
#[derive(Debug, Clone)]
pub enum Route {
	/// Exposed through the view's plain-value bridge.
	Direct(Handler),
	/// Dispatched from the binary transport channel.
	Binary(Handler),
}

impl Route {
	pub fn handler(&self) -> &Handler {
		match self {
			Route::Direct(handler) | Route::Binary(handler) => handler,
		}
	}

	pub fn is_binary(&self) -> bool {
		matches!(self, Route::Binary(_))
	}
}

/// A named function with its schema and route.
#[derive(Debug, Clone)]
pub struct RpcDefinition {
	name: String,
	schema: RpcSchema,
	route: Route,
}

impl RpcDefinition {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn schema(&self) -> &RpcSchema {
		&self.schema
	}

	pub fn route(&self) -> &Route {
		&self.route
	}
}

/// Definitions in insertion order. A name appears at most once and has
/// exactly one route.
#[derive(Debug, Default)]
pub(crate) struct Routes {
	definitions: Vec<RpcDefinition>,
}

impl Routes {
	fn position(&self, name: &str) -> Option<usize> {
		self.definitions.iter().position(|d| d.name == name)
	}

	/// Inserts or replaces in place. Returns the replaced definition.
	fn upsert(&mut self, definition: RpcDefinition) -> Option<RpcDefinition> {
		match self.position(&definition.name) {
			Some(index) => Some(std::mem::replace(&mut self.definitions[index], definition)),
			None => {
				self.definitions.push(definition);
				None
			}
		}
	}

	fn remove(&mut self, name: &str) -> Option<RpcDefinition> {
		self.position(name).map(|index| self.definitions.remove(index))
	}

	fn drain(&mut self) -> Vec<RpcDefinition> {
		std::mem::take(&mut self.definitions)
	}

	fn get(&self, name: &str) -> Option<&RpcDefinition> {
		self.definitions.iter().find(|d| d.name == name)
	}

	pub(crate) fn binary_handler(&self, name: &str) -> Option<Handler> {
		match self.get(name).map(|d| &d.route) {
			Some(Route::Binary(handler)) => Some(handler.clone()),
			_ => None,
		}
	}

	pub(crate) fn definitions(&self) -> &[RpcDefinition] {
		&self.definitions
	}
}

/// Binds named, typed functions to one view and routes each call.
///
/// Functions whose schema involves byte buffers are served by the binary
/// transport channel; everything else is exposed through the view's
/// plain-value bridge. The registry is `Sync`: definitions may be added or
/// removed from any thread while calls are being dispatched. Changes to the
/// table and the matching view updates happen under one lock.
///
/// Dropping the registry removes its scheme handler from the view.
///
/// ```rust
/// use std::sync::Arc;
/// use smartview_rpc::testing::RecordingView;
/// use smartview_rpc::types::{self, RpcSchema};
/// use smartview_rpc::{Handler, SmartviewRpc};
///
/// let rpc = SmartviewRpc::new(Arc::new(RecordingView::new()));
/// rpc.define(
/// 	"greet",
/// 	RpcSchema::new().param(types::param("name", types::string())).returns(types::string()),
/// 	Handler::from_fn(|inv| Ok(format!("Hello, {}!", inv.arg::<String>(0)?))),
/// )
/// .unwrap();
///
/// assert_eq!(rpc.defined_functions(), vec!["greet".to_string()]);
/// ```
pub struct SmartviewRpc<V: View> {
	view: Arc<V>,
	routes: Arc<RwLock<Routes>>,
	channel: Mutex<ChannelState>,
	// Held across every definition change, view side effects included.
	changes: Mutex<()>,
}

impl<V: View> SmartviewRpc<V> {
	/// Creates an empty registry bound to `view`.
	pub fn new(view: Arc<V>) -> Self {
		Self {
			view,
			routes: Arc::new(RwLock::new(Routes::default())),
			channel: Mutex::new(ChannelState::default()),
			changes: Mutex::new(()),
		}
	}

	/// Registers the binary RPC scheme with the native engine.
	///
	/// Must be called before any view is constructed in the process. Repeated
	/// calls return the same receipt without registering again.
	pub fn register_scheme() -> SchemeReceipt {
		channel::register_scheme::<V>()
	}

	/// Whether [`SmartviewRpc::register_scheme`] has been called.
	pub fn is_scheme_registered() -> bool {
		channel::is_scheme_registered()
	}

	/// Returns the bound view.
	pub fn view(&self) -> &Arc<V> {
		&self.view
	}

	/// Defines a function, replacing any previous definition of `name`.
	///
	/// Plain-value functions are exposed with [`LaunchPolicy::Sync`]; use
	/// [`SmartviewRpc::define_with`] to pick another policy.
	pub fn define(
		&self,
		name: impl Into<String>,
		schema: RpcSchema,
		handler: Handler,
	) -> Result<&Self> {
		self.define_with(name, schema, LaunchPolicy::default(), handler)
	}

	/// Defines a function with an explicit launch policy for the plain-value
	/// bridge. Binary functions always run with [`LaunchPolicy::Async`].
	pub fn define_with(
		&self,
		name: impl Into<String>,
		schema: RpcSchema,
		launch: LaunchPolicy,
		handler: Handler,
	) -> Result<&Self> {
		let name = name.into();
		if name.trim().is_empty() {
			return Err(RpcError::InvalidArgument(
				"function name must be a non-empty string".to_string(),
			));
		}

		let _changes = self.changes.lock();
		let binary = schema.is_binary();
		let route = if binary {
			self.channel
				.lock()
				.ensure_ready(self.view.as_ref(), &self.routes);
			Route::Binary(handler)
		} else {
			let options = ExposeOptions {
				is_async: schema.is_async(),
				launch,
			};
			self.view.expose(&name, handler.clone(), options);
			Route::Direct(handler)
		};

		let previous = self.routes.write().upsert(RpcDefinition {
			name: name.clone(),
			schema,
			route,
		});

		// A function that moved from the bridge to the channel must stop
		// answering on the bridge.
		if binary && matches!(previous, Some(RpcDefinition { route: Route::Direct(_), .. })) {
			self.view.clear_exposed(Some(&name));
		}

		tracing::debug!(function = %name, binary, replaced = previous.is_some(), "defined RPC function");
		Ok(self)
	}

	/// Removes a function. Unknown names are a no-op.
	///
	/// The view's exposed function is cleared whatever the route was.
	pub fn undefine(&self, name: &str) -> &Self {
		let _changes = self.changes.lock();
		let removed = self.routes.write().remove(name);
		self.view.clear_exposed(Some(name));
		if removed.is_some() {
			tracing::debug!(function = %name, "undefined RPC function");
		}
		self
	}

	/// Removes every function.
	pub fn clear(&self) -> &Self {
		let _changes = self.changes.lock();
		let removed = self.routes.write().drain();
		for definition in &removed {
			self.view.clear_exposed(Some(&definition.name));
		}
		tracing::debug!(count = removed.len(), "cleared RPC functions");
		self
	}

	/// Names of the defined functions, in definition order.
	pub fn defined_functions(&self) -> Vec<String> {
		self.routes
			.read()
			.definitions()
			.iter()
			.map(|d| d.name.clone())
			.collect()
	}

	/// Returns the definition of `name`.
	pub fn definition(&self, name: &str) -> Option<RpcDefinition> {
		self.routes.read().get(name).cloned()
	}

	/// Whether `name` is served by the binary transport channel.
	pub fn is_binary(&self, name: &str) -> bool {
		self.routes
			.read()
			.get(name)
			.is_some_and(|d| d.route.is_binary())
	}

	pub fn has_binary_functions(&self) -> bool {
		self.routes
			.read()
			.definitions()
			.iter()
			.any(|d| d.route.is_binary())
	}

	/// Generates TypeScript declarations for the page-side API under
	/// `window.<namespace>`.
	pub fn generate_types(&self, namespace: &str) -> String {
		typegen::generate_declarations(self.routes.read().definitions(), namespace)
	}

	/// Generates declarations under the default `saucer` namespace.
	pub fn generate_types_default(&self) -> String {
		self.generate_types(DEFAULT_NAMESPACE)
	}

	/// Writes the generated declarations to `path`.
	pub fn write_types(&self, path: impl AsRef<Path>, namespace: &str) -> Result<()> {
		let path = path.as_ref();
		std::fs::write(path, self.generate_types(namespace))?;
		tracing::debug!(path = %path.display(), "wrote RPC type declarations");
		Ok(())
	}
}

impl<V: View> Drop for SmartviewRpc<V> {
	fn drop(&mut self) {
		if *self.channel.get_mut() == ChannelState::Ready {
			self.view.remove_scheme(channel::RPC_SCHEME);
			tracing::debug!(scheme = channel::RPC_SCHEME, "removed binary RPC scheme handler");
		}
	}
}
