//! The URL view that checksums are computed over.

use {
    crate::{
        canonical::{normalize_uri_path, pairs_to_query_string, query_string_to_pairs},
        constants::*,
        LinkIntegrityError,
    },
    derive_builder::Builder,
    http::uri::Uri,
    log::trace,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// The components of a URL that a link checksum protects.
///
/// `UrlComponents` values are immutable once built; the `with_*` methods return a new value. Use
/// [`UrlComponentsBuilder`] to construct one programmatically, or [`UrlComponents::parse`] to
/// parse a URL string.
///
/// The order of `query_params` is preserved for serialization but is irrelevant to the checksum.
#[derive(Builder, Clone, Debug, Default, Eq, PartialEq)]
#[builder(default)]
pub struct UrlComponents {
    /// The URL scheme, e.g. `http`.
    #[builder(setter(into))]
    scheme: String,

    /// The host name, without the port.
    #[builder(setter(into))]
    authority: String,

    /// The port, as a decimal string. Empty if unknown.
    #[builder(setter(into))]
    port: String,

    /// The path, including any path info, in normalized percent-encoded form.
    #[builder(setter(into))]
    path: String,

    /// Decoded query parameters in the order they appear.
    query_params: Vec<(String, String)>,
}

impl UrlComponents {
    /// Create a [UrlComponentsBuilder] to construct a [UrlComponents].
    #[inline]
    pub fn builder() -> UrlComponentsBuilder {
        UrlComponentsBuilder::default()
    }

    /// Parse a URL string.
    ///
    /// A missing scheme defaults to `http`. A missing port defaults to the scheme's well-known
    /// port when the URL has a host. The host is lower-cased and the path is normalized so that
    /// equivalent percent-encodings produce the same components.
    ///
    /// # Errors
    /// Returns [`LinkIntegrityError::InvalidArgument`] if the URL cannot be parsed or contains a
    /// malformed percent-encoding.
    pub fn parse(url: &str) -> Result<Self, LinkIntegrityError> {
        let url = url.trim();
        let with_scheme = if url.starts_with("//") {
            format!("{}:{}", DEFAULT_SCHEME, url)
        } else if !url.contains("://") && !url.starts_with('/') && !url.is_empty() {
            format!("{}://{}", DEFAULT_SCHEME, url)
        } else {
            url.to_string()
        };

        let uri = with_scheme
            .parse::<Uri>()
            .map_err(|e| LinkIntegrityError::InvalidArgument(format!("Invalid URL '{}': {}", url, e)))?;

        let result = Self::from_uri(&uri)?;
        trace!("Parsed URL {} into {:?}", url, result);
        Ok(result)
    }

    /// Build components from an [`http::Uri`]. Relative URIs get the default scheme and no host.
    pub fn from_uri(uri: &Uri) -> Result<Self, LinkIntegrityError> {
        let scheme = uri.scheme_str().unwrap_or(DEFAULT_SCHEME).to_ascii_lowercase();
        let authority = uri.host().map(|h| h.to_ascii_lowercase()).unwrap_or_default();
        let port = match uri.port_u16() {
            Some(port) => port.to_string(),
            None if !authority.is_empty() => default_port(&scheme).map(|p| p.to_string()).unwrap_or_default(),
            None => String::new(),
        };
        let path = normalize_uri_path(uri.path())?;
        let query_params = query_string_to_pairs(uri.query().unwrap_or(""))?;

        Ok(Self {
            scheme,
            authority,
            port,
            path,
            query_params,
        })
    }

    /// Retrieve the scheme.
    #[inline]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Retrieve the host name, without the port.
    #[inline]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Retrieve the port as a decimal string, or an empty string if unknown.
    #[inline]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Retrieve the normalized path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Retrieve the decoded query parameters in their original order.
    #[inline]
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// Return the first value of the named query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Return a copy with the given path (normalized).
    pub fn with_path(&self, path: &str) -> Result<Self, LinkIntegrityError> {
        Ok(Self {
            path: normalize_uri_path(path)?,
            ..self.clone()
        })
    }

    /// Return a copy with `params` appended to the existing query parameters. Repeated names are
    /// kept.
    pub fn with_appended_params<I>(&self, params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query_params = self.query_params.clone();
        query_params.extend(params);
        Self {
            query_params,
            ..self.clone()
        }
    }

    /// Return a copy whose query parameters are replaced by `params`.
    pub fn with_query_params(&self, params: Vec<(String, String)>) -> Self {
        Self {
            query_params: params,
            ..self.clone()
        }
    }

    /// Remove every instance of the named query parameter, returning the first removed value (or
    /// an empty string if it was absent) along with the remaining components.
    pub fn without_param(&self, name: &str) -> (String, Self) {
        let mut removed = None;
        let mut query_params = Vec::with_capacity(self.query_params.len());

        for (n, v) in self.query_params.iter() {
            if n == name {
                if removed.is_none() {
                    removed = Some(v.clone());
                }
            } else {
                query_params.push((n.clone(), v.clone()));
            }
        }

        (
            removed.unwrap_or_default(),
            Self {
                query_params,
                ..self.clone()
            },
        )
    }

    /// Serialize back into a URL string. The port is omitted when it is the scheme default.
    pub fn to_url_string(&self) -> String {
        let mut result = String::with_capacity(64);

        if !self.authority.is_empty() {
            result.push_str(&self.scheme);
            result.push_str("://");
            result.push_str(&self.authority);

            let is_default = default_port(&self.scheme).map(|p| p.to_string() == self.port).unwrap_or(false);
            if !self.port.is_empty() && !is_default {
                result.push(':');
                result.push_str(&self.port);
            }
        }

        if self.path.is_empty() {
            result.push('/');
        } else {
            result.push_str(&self.path);
        }

        let query = pairs_to_query_string(&self.query_params);
        if !query.is_empty() {
            result.push('?');
            result.push_str(&query);
        }

        result
    }
}

impl Display for UrlComponents {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(&self.to_url_string())
    }
}

/// The well-known port for a scheme, if there is one.
pub(crate) fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        SCHEME_HTTP => Some(DEFAULT_HTTP_PORT),
        SCHEME_HTTPS => Some(DEFAULT_HTTPS_PORT),
        _ => None,
    }
}
