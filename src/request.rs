use {
    crate::{constants::DEFAULT_SCHEME, LinkIntegrityError, UrlComponents},
    derive_builder::Builder,
    http::{header::HOST, request::Parts},
    log::trace,
    std::{
        fmt::{Debug, Formatter, Result as FmtResult},
        sync::Arc,
    },
};

/// Read access to the request currently being handled, as provided by the host framework.
pub trait RequestView {
    /// The URL of the current request. With `include_path_info` false, the path is just the
    /// script (handler) path; with it true, the path info is included as well. The query
    /// parameters are those of the request's query string.
    fn current_url(&self, include_path_info: bool) -> Result<UrlComponents, LinkIntegrityError>;

    /// Every query parameter the host routes on: the query string entries plus any parameters
    /// the host derives from the path. These are treated uniformly by verification.
    fn all_query_params(&self) -> Result<Vec<(String, String)>, LinkIntegrityError>;

    /// The path info: the part of the path after the script path. Empty if there is none.
    fn path_info(&self) -> &str;

    /// The URL as the client requested it, unparsed. Reported to tamper callbacks when the URL
    /// can't be parsed into components.
    fn requested_url(&self) -> String;
}

/// A [`RequestView`] over HTTP request [`Parts`].
///
/// The scheme and authority come from the request URI when it is in absolute form, otherwise
/// from the `Host` header with the scheme defaulting to `http`. The script path is configurable;
/// the remainder of the path is the path info.
#[derive(Clone, Debug)]
pub struct HttpRequestView<'a> {
    parts: &'a Parts,
    default_scheme: String,
    script_name: String,
    route_params: Vec<(String, String)>,
}

impl<'a> HttpRequestView<'a> {
    /// Create a view over `parts` with an empty script path.
    pub fn new(parts: &'a Parts) -> Self {
        Self {
            parts,
            default_scheme: DEFAULT_SCHEME.to_string(),
            script_name: String::new(),
            route_params: Vec::new(),
        }
    }

    /// Set the scheme used when the request URI doesn't carry one, e.g. `https` behind a TLS
    /// terminator.
    pub fn with_default_scheme(mut self, scheme: &str) -> Self {
        self.default_scheme = scheme.to_ascii_lowercase();
        self
    }

    /// Set the script path. Must be a prefix of the request path to have any effect.
    pub fn with_script_name(mut self, script_name: &str) -> Self {
        self.script_name = script_name.trim_end_matches('/').to_string();
        self
    }

    /// Add parameters the host derived from the path for routing.
    pub fn with_route_params(mut self, route_params: Vec<(String, String)>) -> Self {
        self.route_params = route_params;
        self
    }

    fn script_path(&self) -> &str {
        let path = self.parts.uri.path();
        if !self.script_name.is_empty() && path.starts_with(&self.script_name) {
            let rest = &path[self.script_name.len()..];
            if rest.is_empty() || rest.starts_with('/') {
                return &self.script_name;
            }
        }

        ""
    }

    fn full_url(&self) -> String {
        let uri = &self.parts.uri;
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        if let Some(authority) = uri.authority() {
            let scheme = uri.scheme_str().unwrap_or(&self.default_scheme);
            return format!("{}://{}{}", scheme, authority.as_str(), path_and_query);
        }

        match self.parts.headers.get(HOST).and_then(|h| h.to_str().ok()) {
            Some(host) if !host.is_empty() => format!("{}://{}{}", self.default_scheme, host, path_and_query),
            _ => path_and_query.to_string(),
        }
    }
}

impl RequestView for HttpRequestView<'_> {
    fn requested_url(&self) -> String {
        self.full_url()
    }

    fn current_url(&self, include_path_info: bool) -> Result<UrlComponents, LinkIntegrityError> {
        let url = self.full_url();
        trace!("Current request URL: {}", url);
        let components = UrlComponents::parse(&url)?;

        if include_path_info {
            Ok(components)
        } else {
            components.with_path(self.script_path())
        }
    }

    fn all_query_params(&self) -> Result<Vec<(String, String)>, LinkIntegrityError> {
        let mut result = self.current_url(true)?.query_params().to_vec();
        result.extend(self.route_params.iter().cloned());
        Ok(result)
    }

    fn path_info(&self) -> &str {
        let path = self.parts.uri.path();
        &path[self.script_path().len()..]
    }
}

/// Extracts the parameters a host derives from the request path for routing.
pub type RouteParamsFn = Arc<dyn Fn(&Parts) -> Vec<(String, String)> + Send + Sync>;

/// How an [`HttpRequestView`] is built for each request passing through a
/// [`LinkIntegrityService`][crate::LinkIntegrityService].
///
/// Servers usually see origin-form URIs (`/path?query` plus a `Host` header), so links signed as
/// `https://...` only verify when `default_scheme` is set to `https`.
#[derive(Builder, Clone, Default)]
#[builder(default)]
pub struct RequestViewOptions {
    /// Scheme used when the request URI doesn't carry one. Defaults to `http`.
    #[builder(setter(into, strip_option))]
    default_scheme: Option<String>,

    /// The script path; the rest of the request path is the path info.
    #[builder(setter(into, strip_option))]
    script_name: Option<String>,

    /// Route parameters included in verification alongside the query string.
    #[builder(setter(custom))]
    route_params: Option<RouteParamsFn>,
}

impl RequestViewOptions {
    /// Create a [RequestViewOptionsBuilder] to construct a [RequestViewOptions].
    #[inline]
    pub fn builder() -> RequestViewOptionsBuilder {
        RequestViewOptionsBuilder::default()
    }

    /// Retrieve the default scheme, if set.
    #[inline]
    pub fn default_scheme(&self) -> Option<&str> {
        self.default_scheme.as_deref()
    }

    /// Retrieve the script path, if set.
    #[inline]
    pub fn script_name(&self) -> Option<&str> {
        self.script_name.as_deref()
    }

    /// Build the view of `parts` these options describe.
    pub fn view<'a>(&self, parts: &'a Parts) -> HttpRequestView<'a> {
        let mut view = HttpRequestView::new(parts);
        if let Some(scheme) = &self.default_scheme {
            view = view.with_default_scheme(scheme);
        }
        if let Some(script_name) = &self.script_name {
            view = view.with_script_name(script_name);
        }
        if let Some(route_params) = &self.route_params {
            view = view.with_route_params(route_params(parts));
        }
        view
    }
}

impl RequestViewOptionsBuilder {
    /// Set the route parameter extractor.
    pub fn route_params<F>(&mut self, route_params: F) -> &mut Self
    where
        F: Fn(&Parts) -> Vec<(String, String)> + Send + Sync + 'static,
    {
        let route_params: RouteParamsFn = Arc::new(route_params);
        self.route_params = Some(Some(route_params));
        self
    }
}

impl Debug for RequestViewOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RequestViewOptions")
            .field("default_scheme", &self.default_scheme)
            .field("script_name", &self.script_name)
            .field("route_params", &self.route_params.is_some())
            .finish()
    }
}
