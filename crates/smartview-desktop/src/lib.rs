//! Native desktop view for smartview-rpc.
//!
//! [`DesktopView`] implements [`smartview_rpc::View`] on top of
//! [wry](https://docs.rs/wry) and [tao](https://docs.rs/tao):
//!
//! - plain-value functions are exposed as `window.saucer.exposed.<name>` and
//!   reach the host over the webview IPC channel ([`bridge`]);
//! - custom schemes registered before the app is built are served by the
//!   installed scheme handlers;
//! - injected scripts run at creation or after each page load.
//!
//! # Example
//!
//! ```rust,no_run
//! use smartview_desktop::{DesktopApp, ViewConfig};
//! use smartview_rpc::types::{self, RpcSchema};
//! use smartview_rpc::{Handler, SmartviewRpc};
//!
//! let receipt = SmartviewRpc::<smartview_desktop::DesktopView>::register_scheme();
//! let app = DesktopApp::builder()
//! 	.config(ViewConfig::new().title("Image Tools").html("<h1>Hello</h1>"))
//! 	.build(receipt)?;
//!
//! let rpc = SmartviewRpc::new(app.view().clone());
//! rpc.define(
//! 	"invert",
//! 	RpcSchema::new()
//! 		.param(types::param("image", types::buffer()))
//! 		.returns(types::buffer()),
//! 	Handler::from_fn(|inv| Ok(inv.body().iter().map(|b| 255 - b).collect::<Vec<u8>>())),
//! )?;
//!
//! app.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod app;
pub mod bridge;
pub mod config;
pub mod error;
pub mod view;

pub use app::{DesktopApp, DesktopAppBuilder};
pub use bridge::{Bridge, BridgeMessage, BridgeResponse};
pub use config::ViewConfig;
pub use error::{DesktopError, Result};
pub use view::{DesktopView, UserEvent, registered_schemes};
