//! # Smartview
//!
//! Typed host-to-page RPC for native webviews.
//!
//! Host functions are defined once with a type schema and become callable
//! from page script. Functions whose schema involves byte buffers are served
//! over the `saucer-rpc://` custom scheme so bytes cross the boundary without
//! JSON encoding; everything else goes through the view's plain-value bridge.
//! TypeScript declarations for the page-side API are generated from the same
//! definitions.
//!
//! ## Feature Flags
//!
//! - `desktop` (default) - native desktop view on wry and tao
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use smartview::prelude::*;
//! use smartview::testing::RecordingView;
//!
//! let _receipt = SmartviewRpc::<RecordingView>::register_scheme();
//! let rpc = SmartviewRpc::new(Arc::new(RecordingView::new()));
//!
//! rpc.define(
//! 	"add",
//! 	RpcSchema::new()
//! 		.param(types::param("a", types::number()))
//! 		.param(types::param("b", types::number()))
//! 		.returns(types::number()),
//! 	Handler::from_fn(|inv| Ok(inv.arg::<f64>(0)? + inv.arg::<f64>(1)?)),
//! )?;
//!
//! assert!(rpc.generate_types_default().contains("add(a: number, b: number): number;"));
//! # Ok::<(), smartview::RpcError>(())
//! ```

pub use smartview_rpc::*;

/// Native desktop view.
#[cfg(feature = "desktop")]
pub mod desktop {
	pub use smartview_desktop::*;
}

/// Commonly used types.
pub mod prelude {
	pub use smartview_rpc::types::{self, RpcSchema, TypeSchema};
	pub use smartview_rpc::{
		Handler, HandlerError, Invocation, LaunchPolicy, Reply, RpcError, SchemeReceipt,
		SmartviewRpc, View,
	};

	#[cfg(feature = "desktop")]
	pub use smartview_desktop::{DesktopApp, DesktopView, ViewConfig};
}
