//! Typed host-to-page RPC for native webviews.
//!
//! This crate exposes host functions to page script running inside a native
//! view:
//!
//! - **Type schemas** ([`types`]): a small vocabulary describing parameter and
//!   return shapes.
//! - **Registry** ([`SmartviewRpc`]): named definitions bound to one view,
//!   added and removed at runtime.
//! - **Binary transport** ([`channel`]): functions taking or returning byte
//!   buffers are served over the `saucer-rpc://` custom scheme instead of the
//!   JSON bridge, so bytes cross the boundary without JSON encoding.
//! - **Type declarations** ([`typegen`]): TypeScript declarations for the
//!   page-side API.
//!
//! The native view itself is abstracted by the [`View`] trait.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use smartview_rpc::testing::RecordingView;
//! use smartview_rpc::types::{self, RpcSchema};
//! use smartview_rpc::{Handler, SmartviewRpc};
//!
//! // Before any view is constructed:
//! let _receipt = SmartviewRpc::<RecordingView>::register_scheme();
//!
//! let rpc = SmartviewRpc::new(Arc::new(RecordingView::new()));
//! rpc.define(
//! 	"reverse",
//! 	RpcSchema::new()
//! 		.param(types::param("data", types::buffer()))
//! 		.returns(types::buffer()),
//! 	Handler::from_fn(|inv| {
//! 		let mut bytes = inv.body().to_vec();
//! 		bytes.reverse();
//! 		Ok(bytes)
//! 	}),
//! )
//! .unwrap();
//!
//! assert!(rpc.is_binary("reverse"));
//! ```

pub mod channel;
pub mod error;
pub mod handler;
pub mod registry;
pub mod scheme;
pub mod testing;
pub mod typegen;
pub mod types;
pub mod view;

// Re-export main types for convenience
pub use channel::{MAPPED_HOST, RPC_SCHEME, SchemeReceipt, mapped_scheme_url};
pub use error::{HandlerError, RpcError};
pub use handler::{Handler, HandlerFuture, Invocation, Reply};
pub use registry::{DEFAULT_NAMESPACE, Route, RpcDefinition, SmartviewRpc};
pub use scheme::{SchemeHandler, SchemeRequest, SchemeResponse};
pub use types::{RpcSchema, TypeSchema};
pub use view::{ExposeOptions, InjectionFrame, InjectionTime, LaunchPolicy, Script, View};

/// Result type for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;
