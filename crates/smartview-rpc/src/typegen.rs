//! TypeScript declaration generation for the page-side API.

use std::fmt::Write as _;

use crate::registry::RpcDefinition;

/// Signature of the page-side binary call helper.
pub const CALL_BINARY_SIGNATURE: &str =
	"callBinary(name: string, buffer: Uint8Array | ArrayBuffer): Promise<Uint8Array>;";

/// Generates a declaration file describing `window.<namespace>`.
///
/// Plain-value functions are listed under `exposed` with their parameter
/// names, optionality and return type (`Promise<T>` when async). Binary
/// functions are not listed individually; if any exist a single
/// `callBinary` signature is added instead.
pub fn generate_declarations(definitions: &[RpcDefinition], namespace: &str) -> String {
	let mut out = String::new();
	out.push_str("// Auto-generated by smartview-rpc\n");
	out.push_str("// Do not edit manually\n\n");
	out.push_str("declare global {\n");
	out.push_str("  interface Window {\n");
	let _ = writeln!(out, "    {}: {{", namespace);
	out.push_str("      exposed: {\n");

	for definition in definitions.iter().filter(|d| !d.route().is_binary()) {
		write_signature(&mut out, definition);
	}

	out.push_str("      };\n");

	if definitions.iter().any(|d| d.route().is_binary()) {
		out.push('\n');
		out.push_str("      /**\n");
		out.push_str("       * Call a binary RPC function with zero-copy transfer\n");
		out.push_str("       * @param name - Function name\n");
		out.push_str("       * @param buffer - Binary data to send\n");
		out.push_str("       */\n");
		let _ = writeln!(out, "      {}", CALL_BINARY_SIGNATURE);
	}

	out.push_str("    };\n");
	out.push_str("  }\n");
	out.push_str("}\n\n");
	out.push_str("export {};\n");
	out
}

fn write_signature(out: &mut String, definition: &RpcDefinition) {
	let schema = definition.schema();

	let params = schema
		.params()
		.iter()
		.enumerate()
		.map(|(i, p)| {
			let name = p
				.name()
				.map(str::to_string)
				.unwrap_or_else(|| format!("arg{}", i));
			let optional = if p.is_optional() { "?" } else { "" };
			format!("{}{}: {}", name, optional, p.type_name())
		})
		.collect::<Vec<_>>()
		.join(", ");

	let mut return_type = schema.return_type().type_name();
	if schema.is_async() {
		return_type = format!("Promise<{}>", return_type);
	}

	if !schema.params().is_empty() {
		out.push_str("        /**\n");
		for p in schema.params() {
			if let Some(name) = p.name() {
				let optional = if p.is_optional() { " (optional)" } else { "" };
				let _ = writeln!(out, "         * @param {} - {}{}", name, p.type_name(), optional);
			}
		}
		let _ = writeln!(out, "         * @returns {}", return_type);
		out.push_str("         */\n");
	}

	let _ = writeln!(
		out,
		"        {}({}): {};",
		definition.name(),
		params,
		return_type
	);
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use crate::handler::Handler;
	use crate::registry::SmartviewRpc;
	use crate::testing::RecordingView;
	use crate::types::{self, RpcSchema};
	use rstest::rstest;

	use super::CALL_BINARY_SIGNATURE;

	fn noop() -> Handler {
		Handler::from_fn(|_| Ok(()))
	}

	#[rstest]
	fn test_signature_with_named_optional_and_async() {
		// Arrange
		let rpc = SmartviewRpc::new(Arc::new(RecordingView::new()));
		rpc.define(
			"fetchUser",
			RpcSchema::new()
				.param(types::param("id", types::number()))
				.param(types::param("verbose", types::optional(types::boolean())))
				.param(types::string())
				.returns(types::object([("name", types::string())]))
				.asynchronous(true),
			noop(),
		)
		.unwrap();

		// Act
		let output = rpc.generate_types_default();

		// Assert
		assert!(output.contains("    saucer: {\n"));
		assert!(output.contains(
			"        fetchUser(id: number, verbose?: boolean, arg2: string): Promise<{ name: string }>;\n"
		));
		assert!(output.contains("         * @param verbose - boolean (optional)\n"));
		assert!(output.contains("         * @returns Promise<{ name: string }>\n"));
		assert!(output.ends_with("export {};\n"));
	}

	#[rstest]
	fn test_no_params_has_no_doc_block() {
		// Arrange
		let rpc = SmartviewRpc::new(Arc::new(RecordingView::new()));
		rpc.define("ping", RpcSchema::new(), noop()).unwrap();

		// Act
		let output = rpc.generate_types("app");

		// Assert
		assert!(output.contains("    app: {\n"));
		assert!(output.contains("        ping(): void;\n"));
		assert!(!output.contains("/**"));
	}

	#[rstest]
	fn test_binary_functions_collapse_to_call_binary() {
		// Arrange
		let rpc = SmartviewRpc::new(Arc::new(RecordingView::new()));
		rpc.define("add", RpcSchema::new().returns(types::number()), noop())
			.unwrap()
			.define(
				"compress",
				RpcSchema::new().param(types::param("data", types::buffer())),
				noop(),
			)
			.unwrap()
			.define("thumbnail", RpcSchema::new().returns(types::uint8()), noop())
			.unwrap();

		// Act
		let output = rpc.generate_types_default();

		// Assert
		assert!(output.contains("add(): number;"));
		assert!(!output.contains("compress("));
		assert!(!output.contains("thumbnail("));
		assert_eq!(output.matches(CALL_BINARY_SIGNATURE).count(), 1);
	}

	#[rstest]
	fn test_no_call_binary_without_binary_functions() {
		// Arrange
		let rpc = SmartviewRpc::new(Arc::new(RecordingView::new()));
		rpc.define("add", RpcSchema::new(), noop()).unwrap();

		// Act
		let output = rpc.generate_types_default();

		// Assert
		assert_eq!(output.matches("callBinary").count(), 0);
	}
}
