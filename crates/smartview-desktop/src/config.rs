//! View configuration types.

use serde::Deserialize;

use crate::error::Result;

/// Configuration for the desktop window and its webview.
///
/// Can be built in code or loaded from TOML:
///
/// ```toml
/// title = "Image Tools"
/// width = 1024
/// height = 768
/// url = "https://localhost:5173"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
	/// Window title.
	pub title: String,

	/// Window width in pixels.
	pub width: u32,

	/// Window height in pixels.
	pub height: u32,

	/// Whether the window is resizable.
	pub resizable: bool,

	/// Whether the webview devtools are enabled.
	pub devtools: bool,

	/// URL loaded at startup. Takes precedence over `html`.
	pub url: Option<String>,

	/// Inline HTML loaded at startup when no `url` is set.
	pub html: Option<String>,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			title: "Smartview".to_string(),
			width: 800,
			height: 600,
			resizable: true,
			devtools: cfg!(debug_assertions),
			url: None,
			html: None,
		}
	}
}

impl ViewConfig {
	/// Creates a new ViewConfig with default values.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a configuration from TOML. Missing keys take their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self> {
		Ok(toml::from_str(source)?)
	}

	/// Sets the window title.
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	/// Sets the window size.
	pub fn size(mut self, width: u32, height: u32) -> Self {
		self.width = width;
		self.height = height;
		self
	}

	/// Sets whether the window is resizable.
	pub fn resizable(mut self, resizable: bool) -> Self {
		self.resizable = resizable;
		self
	}

	/// Sets whether devtools are enabled.
	pub fn devtools(mut self, devtools: bool) -> Self {
		self.devtools = devtools;
		self
	}

	/// Sets the start URL.
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());
		self
	}

	/// Sets the start page content.
	pub fn html(mut self, html: impl Into<String>) -> Self {
		self.html = Some(html.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::DesktopError;
	use rstest::rstest;

	#[rstest]
	fn test_view_config_default_values() {
		// Arrange & Act
		let config = ViewConfig::default();

		// Assert
		assert_eq!(config.title, "Smartview");
		assert_eq!(config.width, 800);
		assert_eq!(config.height, 600);
		assert!(config.resizable);
		assert!(config.url.is_none());
		assert!(config.html.is_none());
	}

	#[rstest]
	fn test_view_config_builder_chain() {
		// Arrange & Act
		let config = ViewConfig::new()
			.title("Image Tools")
			.size(1024, 768)
			.resizable(false)
			.devtools(true)
			.html("<h1>hi</h1>");

		// Assert
		assert_eq!(config.title, "Image Tools");
		assert_eq!(config.width, 1024);
		assert_eq!(config.height, 768);
		assert!(!config.resizable);
		assert!(config.devtools);
		assert_eq!(config.html.as_deref(), Some("<h1>hi</h1>"));
	}

	#[rstest]
	fn test_from_toml_fills_missing_keys_with_defaults() {
		// Arrange
		let source = r#"
			title = "Image Tools"
			width = 1280
			url = "https://localhost:5173"
		"#;

		// Act
		let config = ViewConfig::from_toml_str(source).unwrap();

		// Assert
		assert_eq!(config.title, "Image Tools");
		assert_eq!(config.width, 1280);
		assert_eq!(config.height, 600);
		assert!(config.resizable);
		assert_eq!(config.url.as_deref(), Some("https://localhost:5173"));
	}

	#[rstest]
	fn test_from_toml_rejects_wrong_types() {
		// Act
		let result = ViewConfig::from_toml_str("width = \"wide\"");

		// Assert
		assert!(matches!(result, Err(DesktopError::Config(_))));
	}
}
