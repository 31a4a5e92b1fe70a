//! Plain-value bridge between page script and exposed host functions.
//!
//! The page calls `window.saucer.exposed.<name>(...args)`. The call is posted
//! over the webview IPC channel as `{id, name, args}` JSON; the host runs the
//! exposed handler and answers by evaluating `window.saucer._resolve(...)`
//! with a [`BridgeResponse`].

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartview_rpc::{ExposeOptions, Handler, Invocation, LaunchPolicy, RpcError};

/// A call received from the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeMessage {
	/// Call id used to correlate the response.
	pub id: u64,
	/// Exposed function name.
	pub name: String,
	/// Arguments in call order.
	#[serde(default)]
	pub args: Vec<Value>,
}

impl BridgeMessage {
	/// Parses a raw IPC body. A malformed body yields the failure to send back.
	pub fn parse(raw: &str) -> Result<Self, BridgeResponse> {
		serde_json::from_str(raw)
			.map_err(|e| BridgeResponse::error(None, format!("invalid message format: {}", e)))
	}
}

/// The answer to a [`BridgeMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
	/// The call this answers. Absent when the message could not be parsed.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<u64>,
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl BridgeResponse {
	/// Creates a successful response.
	pub fn success(id: u64, data: Value) -> Self {
		Self {
			id: Some(id),
			success: true,
			data: Some(data),
			error: None,
		}
	}

	/// Creates a failed response.
	pub fn error(id: Option<u64>, message: impl Into<String>) -> Self {
		Self {
			id,
			success: false,
			data: None,
			error: Some(message.into()),
		}
	}

	/// Script delivering this response to the page.
	pub fn to_script(&self) -> String {
		let payload = serde_json::to_string(self).unwrap_or_else(|_| {
			r#"{"success":false,"error":"failed to serialize response"}"#.to_string()
		});
		format!("window.saucer._resolve({});", payload)
	}
}

#[derive(Clone)]
struct Exposed {
	handler: Handler,
	options: ExposeOptions,
}

/// Table of exposed functions.
#[derive(Default)]
pub struct Bridge {
	functions: RwLock<HashMap<String, Exposed>>,
}

impl Bridge {
	pub fn new() -> Self {
		Self::default()
	}

	/// Exposes `handler` under `name`, replacing any previous one.
	pub fn expose(&self, name: &str, handler: Handler, options: ExposeOptions) {
		self.functions
			.write()
			.insert(name.to_string(), Exposed { handler, options });
	}

	/// Removes one exposed function, or all of them for `None`.
	pub fn clear(&self, name: Option<&str>) {
		let mut functions = self.functions.write();
		match name {
			Some(name) => {
				functions.remove(name);
			}
			None => functions.clear(),
		}
	}

	pub fn contains(&self, name: &str) -> bool {
		self.functions.read().contains_key(name)
	}

	/// Launch policy of `name`, if exposed.
	pub fn launch_policy(&self, name: &str) -> Option<LaunchPolicy> {
		self.functions.read().get(name).map(|e| e.options.launch)
	}

	/// Runs one call and produces its response.
	pub async fn handle(&self, message: BridgeMessage) -> BridgeResponse {
		let handler = self
			.functions
			.read()
			.get(&message.name)
			.map(|e| e.handler.clone());
		let Some(handler) = handler else {
			let err = RpcError::FunctionNotFound(message.name);
			return BridgeResponse::error(Some(message.id), err.to_string());
		};

		match handler.call(Invocation::from_args(message.args)).await {
			Ok(reply) => BridgeResponse::success(message.id, reply.into_json()),
			Err(e) => {
				tracing::error!(function = %message.name, error = %e, "exposed function failed");
				BridgeResponse::error(Some(message.id), e.message())
			}
		}
	}
}

/// JavaScript injected at creation time to provide `window.saucer.exposed`.
pub(crate) const BRIDGE_INIT_SCRIPT: &str = r#"
(function() {
    window.saucer = window.saucer || {};
    if (window.saucer._resolve) return;

    const pending = new Map();
    let nextId = 0;

    window.saucer._resolve = function(response) {
        const data = typeof response === 'string' ? JSON.parse(response) : response;
        const call = pending.get(data.id);
        if (!call) return;
        pending.delete(data.id);
        if (data.success) {
            call.resolve(data.data);
        } else {
            call.reject(new Error(data.error || 'Unknown error'));
        }
    };

    window.saucer.exposed = new Proxy({}, {
        get: function(_, name) {
            return function(...args) {
                return new Promise((resolve, reject) => {
                    const id = ++nextId;
                    pending.set(id, { resolve, reject });
                    window.ipc.postMessage(JSON.stringify({ id: id, name: name, args: args }));
                });
            };
        }
    });
})();
"#;
