//! Binary transport channel.
//!
//! Functions whose schema involves byte buffers do not go through the JSON
//! bridge. The page calls them with a `fetch` against the `saucer-rpc`
//! custom scheme instead: the request body carries the input bytes and the
//! response body carries the output bytes (or a JSON value / JSON error).
//!
//! Request format: `saucer-rpc://<functionName>[/path][?query]`. Only the
//! authority is used. Engines that only see custom schemes as
//! `http://<scheme>.<host>` lowercase the host, so there the name travels as
//! the first path segment instead: `http://saucer-rpc.rpc/<functionName>`.

use std::sync::Arc;

use http::{Method, Uri};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::error::RpcError;
use crate::handler::{Invocation, Reply};
use crate::registry::Routes;
use crate::scheme::{SchemeHandler, SchemeRequest, SchemeResponse};
use crate::view::{InjectionTime, LaunchPolicy, Script, View};

/// Custom scheme carrying binary calls.
pub const RPC_SCHEME: &str = "saucer-rpc";

/// Host label of the mapped channel URL; see [`mapped_scheme_url`].
pub const MAPPED_HOST: &str = "rpc";

const MIME_JSON: &str = "application/json";
const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// CORS headers attached to every channel response, so pages served from
/// any origin inside the view can call back.
pub const CORS_HEADERS: [(&str, &str); 3] = [
	("Access-Control-Allow-Origin", "*"),
	("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
	("Access-Control-Allow-Headers", "Content-Type"),
];

static SCHEME_REGISTRATION: OnceCell<SchemeReceipt> = OnceCell::new();

/// Proof that [`RPC_SCHEME`] was registered with the native engine.
///
/// Only the registration call produces one. View constructors that need the
/// scheme take a receipt, so the "register before the first view" ordering
/// is checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeReceipt {
	_private: (),
}

/// Registers [`RPC_SCHEME`] through `V`, at most once per process.
pub(crate) fn register_scheme<V: View>() -> SchemeReceipt {
	*SCHEME_REGISTRATION.get_or_init(|| {
		V::register_scheme(RPC_SCHEME);
		tracing::debug!(scheme = RPC_SCHEME, "registered binary RPC scheme");
		SchemeReceipt { _private: () }
	})
}

pub(crate) fn is_scheme_registered() -> bool {
	SCHEME_REGISTRATION.get().is_some()
}

/// Lifecycle of the channel on one registry.
///
/// The scheme handler and the page helper are installed together by
/// [`ChannelState::ensure_ready`], so one cannot exist without the other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelState {
	#[default]
	Uninitialized,
	Ready,
}

impl ChannelState {
	/// Installs the scheme handler and the page helper on `view` unless
	/// that already happened.
	pub(crate) fn ensure_ready<V: View>(&mut self, view: &V, routes: &Arc<RwLock<Routes>>) {
		if *self == ChannelState::Ready {
			return;
		}

		if !is_scheme_registered() {
			tracing::warn!(
				scheme = RPC_SCHEME,
				"binary RPC scheme is not registered; call SmartviewRpc::register_scheme() \
				 before creating any view (DesktopAppBuilder::build takes its receipt), \
				 or binary calls will fail"
			);
		}

		let routes = Arc::clone(routes);
		let handler = SchemeHandler::new(move |request| dispatch(request, Arc::clone(&routes)));
		view.handle_scheme(RPC_SCHEME, handler, LaunchPolicy::Async);
		view.inject(helper_script(&view.scheme_url(RPC_SCHEME)));

		*self = ChannelState::Ready;
	}
}

/// Handles one request on the channel.
pub(crate) async fn dispatch(request: SchemeRequest, routes: Arc<RwLock<Routes>>) -> SchemeResponse {
	if request.method() == Method::OPTIONS {
		return preflight_response();
	}

	let name = function_name(request.uri(), RPC_SCHEME);
	let handler = routes.read().binary_handler(&name);
	let Some(handler) = handler else {
		tracing::debug!(function = %name, "binary call to unknown function");
		return error_response(&RpcError::FunctionNotFound(name));
	};

	let (parts, body) = request.into_parts();
	tracing::debug!(function = %name, bytes = body.len(), "dispatching binary call");

	match handler.call(Invocation::from_body(body, parts.headers)).await {
		Ok(Reply::Bytes(bytes)) => with_cors(SchemeResponse::new(200, MIME_OCTET_STREAM, bytes.to_vec())),
		Ok(Reply::Json(value)) => match serde_json::to_vec(&value) {
			Ok(data) => with_cors(SchemeResponse::new(200, MIME_JSON, data)),
			Err(e) => error_response(&RpcError::HandlerFailure(e.to_string())),
		},
		Err(e) => {
			tracing::error!(function = %name, error = %e, "binary RPC handler failed");
			error_response(&RpcError::from(e))
		}
	}
}

/// Base URL page script uses for `scheme` on engines that map custom
/// schemes onto `http://<scheme>.<host>`.
pub fn mapped_scheme_url(scheme: &str) -> String {
	format!("http://{}.{}/", scheme, MAPPED_HOST)
}

/// Extracts the function name from a channel URL.
///
/// On the mapped form `http(s)://<scheme>.rpc/<name>` the name is the first
/// path segment. A bare `http(s)://<scheme>.<name>` host is still accepted.
pub(crate) fn function_name(uri: &Uri, scheme: &str) -> String {
	let Some(host) = uri.host() else {
		let raw = uri.to_string();
		let rest = raw
			.strip_prefix(scheme)
			.and_then(|r| r.strip_prefix(':'))
			.unwrap_or(&raw)
			.trim_start_matches('/');
		return rest.split(['/', '?']).next().unwrap_or_default().to_string();
	};

	let mapped_prefix = format!("{}.", scheme);
	match host.strip_prefix(&mapped_prefix) {
		Some(label) if label.eq_ignore_ascii_case(MAPPED_HOST) => uri
			.path()
			.trim_start_matches('/')
			.split('/')
			.next()
			.unwrap_or_default()
			.to_string(),
		Some(name) => name.to_string(),
		None => host.to_string(),
	}
}

fn with_cors(response: SchemeResponse) -> SchemeResponse {
	response.with_headers(CORS_HEADERS)
}

fn preflight_response() -> SchemeResponse {
	with_cors(SchemeResponse::new(204, "text/plain", Vec::new()))
}

fn error_response(err: &RpcError) -> SchemeResponse {
	let body = serde_json::json!({ "error": err.to_string() }).to_string();
	with_cors(SchemeResponse::new(
		err.status_code().as_u16(),
		MIME_JSON,
		body.into_bytes(),
	))
}

const HELPER_TEMPLATE: &str = r#"
(function() {
    if (window.saucer && window.saucer.callBinary) return;

    window.saucer = window.saucer || {};

    const base = __SCHEME_URL__;

    window.saucer.callBinary = async function(name, buffer) {
        const body = buffer instanceof ArrayBuffer ? new Uint8Array(buffer) : buffer;
        const response = await fetch(base + name, {
            method: 'POST',
            body: body,
            headers: { 'Content-Type': 'application/octet-stream' }
        });

        if (!response.ok) {
            const failure = await response.json().catch(() => ({ error: 'Unknown error' }));
            throw new Error(failure.error || 'RPC call failed');
        }

        const contentType = response.headers.get('Content-Type') || '';
        if (contentType.includes('application/json')) {
            return response.json();
        }
        return new Uint8Array(await response.arrayBuffer());
    };
})();
"#;

/// Builds the page-side `window.saucer.callBinary` helper.
///
/// The helper is injected at creation time and kept across navigations; it
/// checks for an existing definition, so injecting it twice is harmless.
pub(crate) fn helper_script(scheme_url: &str) -> Script {
	let base = serde_json::Value::String(scheme_url.to_string()).to_string();
	Script::new(HELPER_TEMPLATE.replace("__SCHEME_URL__", &base))
		.time(InjectionTime::Creation)
		.permanent(true)
}
