//! Error types for the desktop view.

use thiserror::Error;

/// Errors raised while building or running a desktop app.
#[derive(Debug, Error)]
pub enum DesktopError {
	/// The native window could not be created.
	#[error("window creation failed: {0}")]
	WindowCreation(String),

	/// The webview could not be created.
	#[error("webview creation failed: {0}")]
	WebViewCreation(String),

	/// The view configuration could not be parsed.
	#[error("invalid view configuration: {0}")]
	Config(#[from] toml::de::Error),

	/// The async runtime could not be started.
	#[error("runtime error: {0}")]
	Runtime(#[from] std::io::Error),
}

/// Result type for desktop operations.
pub type Result<T> = std::result::Result<T, DesktopError>;
