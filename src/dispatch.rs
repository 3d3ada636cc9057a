use {
    crate::constants::ACCESS_DENIED_BODY,
    bytes::Bytes,
    http::{header::CONTENT_TYPE, request::Parts, HeaderValue, Response, StatusCode},
    log::debug,
    std::{
        collections::HashMap,
        fmt::{Debug, Formatter, Result as FmtResult},
        sync::Arc,
    },
};

/// A request handler registered in a dispatch table.
pub type Handler = Arc<dyn Fn(&Parts) -> Response<Bytes> + Send + Sync>;

/// The host's dispatch table, as seen by link verification.
pub trait Dispatcher {
    /// Returns true if a handler is registered under `id`.
    fn has_handler(&self, id: &str) -> bool;

    /// Register `handler` under `id`, replacing any existing handler.
    fn register_handler(&mut self, id: &str, handler: Handler);

    /// Run the handler registered under `id` for the current request instead of the one
    /// originally requested.
    fn set_next_handler(&mut self, id: &str);
}

/// The handler registered for tampered links when the host provides none: a bare 403 page.
pub fn access_denied_handler() -> Handler {
    Arc::new(|_: &Parts| access_denied_response::<Bytes>())
}

/// The response produced by [`access_denied_handler`].
pub fn access_denied_response<B>() -> Response<B>
where
    B: From<&'static str>,
{
    let mut response = Response::new(B::from(ACCESS_DENIED_BODY));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}

/// A simple [`Dispatcher`]: handlers keyed by id, plus a per-request override.
///
/// Clone the table for each request so a redirect set by one request doesn't leak into another.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
    next_handler: Option<String>,
}

impl HandlerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The override set by [`Dispatcher::set_next_handler`], if any.
    pub fn next_handler(&self) -> Option<&str> {
        self.next_handler.as_deref()
    }

    /// Run the handler for a request to `requested`, honoring any override. Returns `None` if no
    /// handler is registered under the resolved id.
    pub fn dispatch(&self, requested: &str, parts: &Parts) -> Option<Response<Bytes>> {
        let id = self.next_handler.as_deref().unwrap_or(requested);
        debug!("Dispatching request for {} to {}", requested, id);
        self.handlers.get(id).map(|handler| handler(parts))
    }
}

impl Dispatcher for HandlerTable {
    fn has_handler(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    fn register_handler(&mut self, id: &str, handler: Handler) {
        self.handlers.insert(id.to_string(), handler);
    }

    fn set_next_handler(&mut self, id: &str) {
        self.next_handler = Some(id.to_string());
    }
}

impl Debug for HandlerTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut ids: Vec<&String> = self.handlers.keys().collect();
        ids.sort_unstable();
        f.debug_struct("HandlerTable").field("handlers", &ids).field("next_handler", &self.next_handler).finish()
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{access_denied_handler, Dispatcher, HandlerTable},
        bytes::Bytes,
        http::{request::Parts, Request, Response, StatusCode},
        std::sync::Arc,
    };

    fn parts() -> Parts {
        Request::builder().uri("/").body(()).unwrap().into_parts().0
    }

    #[test_log::test]
    fn dispatch_and_override() {
        let mut table = HandlerTable::new();
        table.register_handler("home", Arc::new(|_: &Parts| Response::new(Bytes::from_static(b"home"))));
        table.register_handler("denied", access_denied_handler());
        assert!(table.has_handler("home"));
        assert!(!table.has_handler("missing"));

        let response = table.dispatch("home", &parts()).unwrap();
        assert_eq!(response.body().as_ref(), b"home");
        assert!(table.dispatch("missing", &parts()).is_none());

        table.set_next_handler("denied");
        assert_eq!(table.next_handler(), Some("denied"));
        let response = table.dispatch("home", &parts()).unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
        assert!(String::from_utf8_lossy(response.body()).contains("Access denied"));
    }

    #[test_log::test]
    fn debug_lists_ids() {
        let mut table = HandlerTable::new();
        table.register_handler("b", access_denied_handler());
        table.register_handler("a", access_denied_handler());
        assert_eq!(format!("{:?}", table), r#"HandlerTable { handlers: ["a", "b"], next_handler: None }"#);
    }
}
