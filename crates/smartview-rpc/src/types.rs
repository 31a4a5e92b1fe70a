//! Type schema vocabulary for describing RPC parameters and return values.
//!
//! Schemas are plain value objects. They carry no runtime type checking; they
//! decide how a function is routed (plain JSON bridge or binary transport)
//! and feed the TypeScript declaration generator.
//!
//! ```rust
//! use smartview_rpc::types::{self, RpcSchema};
//!
//! let schema = RpcSchema::new()
//! 	.param(types::param("data", types::buffer()))
//! 	.param(types::param("level", types::optional(types::number())))
//! 	.returns(types::buffer());
//!
//! assert!(schema.is_binary());
//! ```

use std::fmt;

/// Plain-value type kinds that cross the boundary as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
	String,
	Number,
	Boolean,
	Any,
	Void,
}

impl Primitive {
	fn type_name(self) -> &'static str {
		match self {
			Primitive::String => "string",
			Primitive::Number => "number",
			Primitive::Boolean => "boolean",
			Primitive::Any => "any",
			Primitive::Void => "void",
		}
	}
}

/// Byte-buffer type kinds that cross the boundary as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
	/// A host-side byte buffer.
	Buffer,
	/// A page-side `Uint8Array`.
	Uint8,
}

impl BinaryKind {
	fn type_name(self) -> &'static str {
		match self {
			BinaryKind::Buffer => "Buffer",
			BinaryKind::Uint8 => "Uint8Array",
		}
	}
}

/// Shape of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
	Primitive(Primitive),
	Binary(BinaryKind),
	Array(Box<TypeSchema>),
	/// Properties in declaration order.
	Object(Vec<(String, TypeSchema)>),
}

/// Describes the shape of one value.
///
/// The `binary` flag is derived when the node is built: a node is binary iff
/// it is a byte-buffer kind or any node below it is. Fields are private, so
/// only the constructors here can build a schema and the flag cannot drift
/// from the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSchema {
	kind: TypeKind,
	name: Option<String>,
	optional: bool,
	binary: bool,
}

impl TypeSchema {
	fn with_kind(kind: TypeKind) -> Self {
		let binary = match &kind {
			TypeKind::Primitive(_) => false,
			TypeKind::Binary(_) => true,
			TypeKind::Array(item) => item.binary,
			TypeKind::Object(props) => props.iter().any(|(_, schema)| schema.binary),
		};
		Self {
			kind,
			name: None,
			optional: false,
			binary,
		}
	}

	/// Creates a plain-value schema.
	pub fn primitive(primitive: Primitive) -> Self {
		Self::with_kind(TypeKind::Primitive(primitive))
	}

	/// Creates a byte-buffer schema.
	pub fn binary_primitive(kind: BinaryKind) -> Self {
		Self::with_kind(TypeKind::Binary(kind))
	}

	/// Creates an array schema whose elements have the given shape.
	pub fn array(item: TypeSchema) -> Self {
		Self::with_kind(TypeKind::Array(Box::new(item)))
	}

	/// Creates an object schema from `(property, schema)` pairs, keeping
	/// their order.
	pub fn object<I, K>(props: I) -> Self
	where
		I: IntoIterator<Item = (K, TypeSchema)>,
		K: Into<String>,
	{
		Self::with_kind(TypeKind::Object(
			props.into_iter().map(|(k, v)| (k.into(), v)).collect(),
		))
	}

	/// Returns a copy marked optional.
	pub fn optional(mut self) -> Self {
		self.optional = true;
		self
	}

	/// Returns a copy carrying a parameter name.
	pub fn param(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn kind(&self) -> &TypeKind {
		&self.kind
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn is_optional(&self) -> bool {
		self.optional
	}

	/// Whether this value must cross the boundary as raw bytes.
	pub fn is_binary(&self) -> bool {
		self.binary
	}

	/// Returns the declaration-language type tag, e.g. `string`,
	/// `Uint8Array[]` or `{ id: number; data: Buffer }`.
	pub fn type_name(&self) -> String {
		match &self.kind {
			TypeKind::Primitive(p) => p.type_name().to_string(),
			TypeKind::Binary(b) => b.type_name().to_string(),
			TypeKind::Array(item) => format!("{}[]", item.type_name()),
			TypeKind::Object(props) => {
				let fields = props
					.iter()
					.map(|(k, v)| format!("{}: {}", k, v.type_name()))
					.collect::<Vec<_>>()
					.join("; ");
				format!("{{ {} }}", fields)
			}
		}
	}
}

impl fmt::Display for TypeSchema {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.type_name())
	}
}

/// Describes one exposed function.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcSchema {
	params: Vec<TypeSchema>,
	returns: TypeSchema,
	is_async: bool,
}

impl Default for RpcSchema {
	fn default() -> Self {
		Self {
			params: Vec::new(),
			returns: void(),
			is_async: false,
		}
	}
}

impl RpcSchema {
	/// Creates a schema with no parameters returning `void`.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a parameter. Parameters keep call-argument order.
	pub fn param(mut self, param: TypeSchema) -> Self {
		self.params.push(param);
		self
	}

	/// Sets the return type.
	pub fn returns(mut self, returns: TypeSchema) -> Self {
		self.returns = returns;
		self
	}

	/// Sets whether the handler's result is awaited before replying.
	pub fn asynchronous(mut self, is_async: bool) -> Self {
		self.is_async = is_async;
		self
	}

	pub fn params(&self) -> &[TypeSchema] {
		&self.params
	}

	pub fn return_type(&self) -> &TypeSchema {
		&self.returns
	}

	pub fn is_async(&self) -> bool {
		self.is_async
	}

	/// Whether calls to this function go through the binary transport.
	///
	/// True iff any parameter or the return type is binary.
	pub fn is_binary(&self) -> bool {
		self.params.iter().any(TypeSchema::is_binary) || self.returns.is_binary()
	}
}

pub fn string() -> TypeSchema {
	TypeSchema::primitive(Primitive::String)
}

pub fn number() -> TypeSchema {
	TypeSchema::primitive(Primitive::Number)
}

pub fn boolean() -> TypeSchema {
	TypeSchema::primitive(Primitive::Boolean)
}

pub fn any() -> TypeSchema {
	TypeSchema::primitive(Primitive::Any)
}

pub fn void() -> TypeSchema {
	TypeSchema::primitive(Primitive::Void)
}

/// Host byte buffer, transferred without JSON encoding.
pub fn buffer() -> TypeSchema {
	TypeSchema::binary_primitive(BinaryKind::Buffer)
}

/// Page-side `Uint8Array`, transferred without JSON encoding.
pub fn uint8() -> TypeSchema {
	TypeSchema::binary_primitive(BinaryKind::Uint8)
}

pub fn array(item: TypeSchema) -> TypeSchema {
	TypeSchema::array(item)
}

pub fn object<I, K>(props: I) -> TypeSchema
where
	I: IntoIterator<Item = (K, TypeSchema)>,
	K: Into<String>,
{
	TypeSchema::object(props)
}

pub fn optional(schema: TypeSchema) -> TypeSchema {
	schema.optional()
}

pub fn param(name: impl Into<String>, schema: TypeSchema) -> TypeSchema {
	schema.param(name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case::string(string(), "string", false)]
	#[case::number(number(), "number", false)]
	#[case::boolean(boolean(), "boolean", false)]
	#[case::any(any(), "any", false)]
	#[case::void(void(), "void", false)]
	#[case::buffer(buffer(), "Buffer", true)]
	#[case::uint8(uint8(), "Uint8Array", true)]
	fn test_primitive_tags(
		#[case] schema: TypeSchema,
		#[case] expected: &str,
		#[case] binary: bool,
	) {
		// Assert
		assert_eq!(schema.type_name(), expected);
		assert_eq!(schema.is_binary(), binary);
		assert!(!schema.is_optional());
		assert!(schema.name().is_none());
	}

	#[rstest]
	#[case::plain(string())]
	#[case::binary(buffer())]
	#[case::nested(object([("inner", uint8())]))]
	fn test_array_inherits_binary(#[case] item: TypeSchema) {
		// Arrange
		let expected = item.is_binary();

		// Act
		let arr = array(item);

		// Assert
		assert_eq!(arr.is_binary(), expected);
	}

	#[rstest]
	#[case::plain(number())]
	#[case::binary(buffer())]
	fn test_single_prop_object_inherits_binary(#[case] prop: TypeSchema) {
		// Arrange
		let expected = prop.is_binary();

		// Act
		let obj = object([("a", prop)]);

		// Assert
		assert_eq!(obj.is_binary(), expected);
	}

	#[rstest]
	fn test_deeply_nested_buffer_is_binary() {
		// Arrange & Act
		let schema = object([
			("id", number()),
			("chunks", array(object([("payload", array(buffer()))]))),
		]);

		// Assert
		assert!(schema.is_binary());
		assert_eq!(
			schema.type_name(),
			"{ id: number; chunks: { payload: Buffer[] }[] }"
		);
	}

	#[rstest]
	fn test_object_keeps_declared_order() {
		// Act
		let schema = object([("z", string()), ("a", boolean())]);

		// Assert
		assert_eq!(schema.type_name(), "{ z: string; a: boolean }");
	}

	#[rstest]
	fn test_optional_and_param_are_shallow_copies() {
		// Arrange
		let base = buffer();

		// Act
		let named = param("data", optional(base.clone()));

		// Assert
		assert_eq!(named.name(), Some("data"));
		assert!(named.is_optional());
		assert!(named.is_binary());
		assert_eq!(named.type_name(), base.type_name());
		assert!(!base.is_optional());
	}

	#[rstest]
	fn test_rpc_schema_defaults() {
		// Act
		let schema = RpcSchema::new();

		// Assert
		assert!(schema.params().is_empty());
		assert_eq!(schema.return_type().type_name(), "void");
		assert!(!schema.is_async());
		assert!(!schema.is_binary());
	}

	#[rstest]
	#[case::binary_param(RpcSchema::new().param(param("x", buffer())), true)]
	#[case::binary_return(RpcSchema::new().param(string()).returns(uint8()), true)]
	#[case::binary_array_return(RpcSchema::new().returns(array(buffer())), true)]
	#[case::plain(RpcSchema::new().param(string()).returns(number()), false)]
	fn test_rpc_schema_classification(#[case] schema: RpcSchema, #[case] expected: bool) {
		// Assert
		assert_eq!(schema.is_binary(), expected);
	}
}
