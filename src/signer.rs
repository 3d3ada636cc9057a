use {
    crate::{compute_checksum, ChecksumConfig, ExtraParams, LinkIntegrityError, RequestView, UrlComponents},
    derive_builder::Builder,
    lazy_static::lazy_static,
    log::{debug, trace},
    regex::Regex,
};

lazy_static! {
    /// Leading slashes on a path info override; condensed to a single slash.
    static ref LEADING_SLASHES: Regex = Regex::new("^/*").unwrap();
}

/// Sign a link.
///
/// `base_url` is parsed (a missing scheme defaults to `http`), `extra_params` are appended to its
/// query parameters, any existing checksum parameter is dropped, and the checksum over the result
/// is appended under the configured checksum parameter name.
///
/// # Errors
/// Returns [`LinkIntegrityError::InvalidArgument`] if `base_url` can't be parsed or
/// `extra_params` has an unsupported shape, or [`LinkIntegrityError::Generator`] if a custom
/// generator fails.
pub fn sign_link<P>(config: &ChecksumConfig, base_url: &str, extra_params: P) -> Result<String, LinkIntegrityError>
where
    P: Into<ExtraParams>,
{
    let components = UrlComponents::parse(base_url)?;
    let signed = sign_components(config, &components, extra_params.into())?;
    let result = signed.to_url_string();
    debug!("Signed link {}", result);
    Ok(result)
}

/// Sign parsed URL components, returning new components with the checksum parameter appended.
/// The input is not modified.
pub fn sign_components(
    config: &ChecksumConfig,
    components: &UrlComponents,
    extra_params: ExtraParams,
) -> Result<UrlComponents, LinkIntegrityError> {
    let extra = extra_params.into_pairs()?;
    let (_, unsigned) = components.without_param(config.checksum_param());
    let merged = unsigned.with_appended_params(extra);
    let checksum = compute_checksum(&merged, config)?;
    trace!("Appending {}={} to {}", config.checksum_param(), checksum, merged);
    Ok(merged.with_appended_params([(config.checksum_param().to_string(), checksum)]))
}

/// Options for [`sign_self_link`].
#[derive(Builder, Clone, Debug, Default)]
#[builder(default)]
pub struct SelfLinkOptions {
    /// Keep the current request's path info.
    reuse_path_info: bool,

    /// Replace the path info with this value. Takes precedence over `reuse_path_info`.
    #[builder(setter(into, strip_option))]
    path_info_override: Option<String>,

    /// Replace the query parameters outright instead of keeping the current ones.
    #[builder(setter(into, strip_option))]
    params: Option<ExtraParams>,
}

impl SelfLinkOptions {
    /// Create a [SelfLinkOptionsBuilder] to construct a [SelfLinkOptions].
    #[inline]
    pub fn builder() -> SelfLinkOptionsBuilder {
        SelfLinkOptionsBuilder::default()
    }

    /// Whether the current path info is kept.
    #[inline]
    pub fn reuse_path_info(&self) -> bool {
        self.reuse_path_info
    }

    /// The replacement path info, if any.
    #[inline]
    pub fn path_info_override(&self) -> Option<&str> {
        self.path_info_override.as_deref()
    }

    /// The replacement query parameters, if any.
    #[inline]
    pub fn params(&self) -> Option<&ExtraParams> {
        self.params.as_ref()
    }
}

/// Sign a link back to the current request.
///
/// The link starts from the script URL of the request. The path info is taken from
/// `path_info_override` if given, else from the request if `reuse_path_info` is set, else dropped.
/// The query parameters are `params` if given, else the request's current ones (minus any old
/// checksum).
pub fn sign_self_link<R>(
    config: &ChecksumConfig,
    request: &R,
    options: &SelfLinkOptions,
) -> Result<String, LinkIntegrityError>
where
    R: RequestView + ?Sized,
{
    let script = request.current_url(false)?;
    let path_info = match (options.path_info_override(), options.reuse_path_info()) {
        (Some(path_info), _) => path_info,
        (None, true) => request.path_info(),
        (None, false) => "",
    };

    let mut path = script.path().trim_end_matches('/').to_string();
    if !path_info.is_empty() {
        path.push_str(&LEADING_SLASHES.replace(path_info, "/"));
    }

    let mut base = script.with_path(&path)?;
    if let Some(params) = options.params() {
        base = base.with_query_params(params.clone().into_pairs()?);
    }

    let signed = sign_components(config, &base, ExtraParams::None)?;
    let result = signed.to_url_string();
    debug!("Signed self link {}", result);
    Ok(result)
}
