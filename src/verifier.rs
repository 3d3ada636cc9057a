use {
    crate::{
        compute_checksum, engine::checksums_match, ChecksumConfig, LinkIntegrityError, RequestView, UrlComponents,
    },
    log::{debug, trace},
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// The result of verifying an inbound request.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum VerificationOutcome {
    /// The checksum matches; dispatch to the requested handler.
    Valid,

    /// The checksum is missing or doesn't match; dispatch to the tampered-link handler.
    Tampered,
}

impl VerificationOutcome {
    /// Returns true for [`VerificationOutcome::Valid`].
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl Display for VerificationOutcome {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::Tampered => f.write_str("tampered"),
        }
    }
}

/// Details of a tampered request, handed to a [`TamperCallback`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TamperedLink {
    /// The URL as observed, including the checksum parameter if one was supplied. A URL that
    /// couldn't be parsed is reported exactly as requested.
    pub observed_url: String,

    /// The checksum the client supplied, or an empty string if none.
    pub provided_checksum: String,

    /// The handler the request is being redirected to.
    pub tampered_handler: String,
}

/// Notified synchronously whenever a request is found to be tampered. The callback may perform
/// cleanup (such as invalidating a session); its outcome does not affect verification.
///
/// Any `Fn(&TamperedLink)` that is `Send + Sync` is a callback.
pub trait TamperCallback: Send + Sync {
    /// Handle a tampered request.
    fn on_tampered(&self, link: &TamperedLink);
}

impl<F> TamperCallback for F
where
    F: Fn(&TamperedLink) + Send + Sync,
{
    fn on_tampered(&self, link: &TamperedLink) {
        self(link)
    }
}

/// Verify observed URL components against the checksum they carry.
///
/// The checksum parameter is removed (a missing one is treated as an empty string), the checksum
/// of the remaining components is recomputed, and the two are compared exactly. If verification
/// is disabled, the result is always [`VerificationOutcome::Valid`].
///
/// # Errors
/// Only a failing custom generator produces an error.
pub fn verify_components(
    config: &ChecksumConfig,
    observed: &UrlComponents,
) -> Result<VerificationOutcome, LinkIntegrityError> {
    Ok(check_components(config, observed)?.0)
}

/// Verify the request currently being handled. The observed URL is the request's full URL with
/// its query parameters replaced by every parameter the host routes on.
///
/// A request URL that can't be parsed can't have come from a signed link and is reported as
/// [`VerificationOutcome::Tampered`].
pub fn verify_request<R>(config: &ChecksumConfig, request: &R) -> Result<VerificationOutcome, LinkIntegrityError>
where
    R: RequestView + ?Sized,
{
    Ok(check_request(config, request)?.0)
}

/// Verify a request, returning the tamper details alongside a [`VerificationOutcome::Tampered`].
pub(crate) fn check_request<R>(
    config: &ChecksumConfig,
    request: &R,
) -> Result<(VerificationOutcome, Option<TamperedLink>), LinkIntegrityError>
where
    R: RequestView + ?Sized,
{
    if config.disabled() {
        debug!("Link verification disabled; accepting request");
        return Ok((VerificationOutcome::Valid, None));
    }

    let observed = match observed_components(request) {
        Ok(observed) => observed,
        Err(e) => {
            debug!("Unable to reconstruct request URL ({}); treating as tampered", e);
            let tampered = TamperedLink {
                observed_url: request.requested_url(),
                provided_checksum: String::new(),
                tampered_handler: config.tampered_handler().to_string(),
            };
            return Ok((VerificationOutcome::Tampered, Some(tampered)));
        }
    };

    check_components(config, &observed)
}

fn observed_components<R>(request: &R) -> Result<UrlComponents, LinkIntegrityError>
where
    R: RequestView + ?Sized,
{
    Ok(request.current_url(true)?.with_query_params(request.all_query_params()?))
}

fn check_components(
    config: &ChecksumConfig,
    observed: &UrlComponents,
) -> Result<(VerificationOutcome, Option<TamperedLink>), LinkIntegrityError> {
    if config.disabled() {
        debug!("Link verification disabled; accepting request");
        return Ok((VerificationOutcome::Valid, None));
    }

    let (provided, unsigned) = observed.without_param(config.checksum_param());
    let expected = compute_checksum(&unsigned, config)?;

    if !provided.is_empty() && checksums_match(&provided, &expected) {
        trace!("Checksum matches for {}", unsigned);
        return Ok((VerificationOutcome::Valid, None));
    }

    debug!("Checksum mismatch for {}; dispatching to {}", unsigned, config.tampered_handler());
    let tampered = TamperedLink {
        observed_url: observed.to_url_string(),
        provided_checksum: provided,
        tampered_handler: config.tampered_handler().to_string(),
    };
    Ok((VerificationOutcome::Tampered, Some(tampered)))
}

#[cfg(test)]
mod tests {
    use {
        super::check_request,
        crate::{
            sign_link, verify_components, verify_request, ChecksumConfig, ExtraParams, HttpRequestView,
            LinkIntegrityError, UrlComponents, VerificationOutcome,
        },
        std::sync::Arc,
        tower::BoxError,
    };

    const SCENARIO_URL: &str = "http://www.example.com/script.cgi/path/info?p1=v1&p2=v2&p2=v3";

    fn config() -> ChecksumConfig {
        ChecksumConfig::builder().secret("extra secret").build().unwrap()
    }

    fn verify(config: &ChecksumConfig, url: &str) -> VerificationOutcome {
        verify_components(config, &UrlComponents::parse(url).unwrap()).unwrap()
    }

    fn signed() -> String {
        sign_link(&config(), SCENARIO_URL, ExtraParams::None).unwrap()
    }

    #[test_log::test]
    fn round_trip() {
        assert_eq!(verify(&config(), &signed()), VerificationOutcome::Valid);
        assert!(verify(&config(), &signed()).is_valid());
    }

    #[test_log::test]
    fn reordered_params_still_valid() {
        let signed = UrlComponents::parse(&signed()).unwrap();
        let mut params = signed.query_params().to_vec();
        params.reverse();
        let reordered = signed.with_query_params(params);
        assert_eq!(verify_components(&config(), &reordered).unwrap(), VerificationOutcome::Valid);
    }

    #[test_log::test]
    fn single_component_changes() {
        let signed = signed();
        let checksum = UrlComponents::parse(&signed).unwrap().query_param("_checksum").unwrap().to_string();
        let with = |url: &str| format!("{}{}_checksum={}", url, if url.contains('?') { "&" } else { "?" }, checksum);

        for tampered in [
            "https://www.example.com/script.cgi/path/info?p1=v1&p2=v2&p2=v3",
            "http://www.badhost.com/script.cgi/path/info?p1=v1&p2=v2&p2=v3",
            "http://www.example.com:8080/script.cgi/path/info?p1=v1&p2=v2&p2=v3",
            "http://www.example.com/script.cgi/path/other?p1=v1&p2=v2&p2=v3",
            "http://www.example.com/script.cgi/path/info?p1=v1b&p2=v2&p2=v3",
            "http://www.example.com/script.cgi/path/info?p0=v1&p2=v2&p2=v3",
            "http://www.example.com/script.cgi/path/info?p1=v1&p2=v2&p2=v3&p3=v4",
            "http://www.example.com/script.cgi/path/info?p1=v1&p2=v2",
            "http://www.example.com/script.cgi/path/info?p1=v1&p2=v2&p2=v3&p2=v3",
        ] {
            assert_eq!(verify(&config(), &with(tampered)), VerificationOutcome::Tampered, "{}", tampered);
        }

        assert_eq!(verify(&config(), &with(SCENARIO_URL)), VerificationOutcome::Valid);
    }

    #[test_log::test]
    fn checksum_edits() {
        assert_eq!(verify(&config(), SCENARIO_URL), VerificationOutcome::Tampered);
        assert_eq!(verify(&config(), &format!("{}&_checksum=", SCENARIO_URL)), VerificationOutcome::Tampered);
        assert_eq!(verify(&config(), &format!("{}&_checksum=xxxx", SCENARIO_URL)), VerificationOutcome::Tampered);

        let checksum = UrlComponents::parse(&signed()).unwrap().query_param("_checksum").unwrap().to_string();
        assert_eq!(
            verify(&config(), &format!("{}&_checksum={}", SCENARIO_URL, checksum.to_uppercase())),
            VerificationOutcome::Tampered
        );
    }

    #[test_log::test]
    fn no_params_is_not_automatically_valid() {
        assert_eq!(verify(&config(), "http://www.example.com/"), VerificationOutcome::Tampered);
        let signed = sign_link(&config(), "http://www.example.com/", ExtraParams::None).unwrap();
        assert_eq!(verify(&config(), &signed), VerificationOutcome::Valid);
    }

    #[test_log::test]
    fn disabled_bypass() {
        let disabled = ChecksumConfig::builder().secret("extra secret").disabled(true).build().unwrap();
        assert_eq!(verify(&disabled, SCENARIO_URL), VerificationOutcome::Valid);
        assert_eq!(verify(&disabled, "http://www.badhost.com/?_checksum=xxxx"), VerificationOutcome::Valid);
    }

    #[test_log::test]
    fn mismatched_checksum_param() {
        let sig = ChecksumConfig::builder().secret("extra secret").checksum_param("sig").build().unwrap();
        let signed = signed();
        assert_eq!(verify(&sig, &signed), VerificationOutcome::Tampered);

        let signed_sig = sign_link(&sig, SCENARIO_URL, ExtraParams::None).unwrap();
        assert_eq!(verify(&sig, &signed_sig), VerificationOutcome::Valid);
        assert_eq!(verify(&config(), &signed_sig), VerificationOutcome::Tampered);
    }

    #[test_log::test]
    fn additional_data_binds_link() {
        let session_a = ChecksumConfig::builder().secret("extra secret").additional_data("session-a").build().unwrap();
        let session_b = ChecksumConfig::builder().secret("extra secret").additional_data("session-b").build().unwrap();
        let signed = sign_link(&session_a, SCENARIO_URL, ExtraParams::None).unwrap();
        assert_eq!(verify(&session_a, &signed), VerificationOutcome::Valid);
        assert_eq!(verify(&session_b, &signed), VerificationOutcome::Tampered);
    }

    #[test_log::test]
    fn custom_generator_round_trip() {
        let generator = |_: &[u8], c: &UrlComponents, _: Option<&str>| -> Result<String, BoxError> {
            let mut names: Vec<&str> =
                c.query_params().iter().map(|(n, _)| n.as_str()).filter(|n| *n != "_checksum").collect();
            names.sort_unstable();
            Ok(names.join("-"))
        };
        let config = ChecksumConfig::builder().secret("s").custom_generator(Arc::new(generator)).build().unwrap();
        let signed = sign_link(&config, "http://h/?b=1&a=2", ExtraParams::None).unwrap();
        assert!(signed.ends_with("_checksum=a-b"));
        assert_eq!(verify(&config, &signed), VerificationOutcome::Valid);
        assert_eq!(verify(&config, "http://h/?b=1&a=2&_checksum=b-a"), VerificationOutcome::Tampered);
    }

    #[test_log::test]
    fn failing_generator_is_an_error() {
        let generator =
            |_: &[u8], _: &UrlComponents, _: Option<&str>| -> Result<String, BoxError> { Err("no".into()) };
        let config = ChecksumConfig::builder().secret("s").custom_generator(Arc::new(generator)).build().unwrap();
        let observed = UrlComponents::parse("http://h/?_checksum=x").unwrap();
        assert!(matches!(verify_components(&config, &observed), Err(LinkIntegrityError::Generator(_))));
    }

    #[test_log::test]
    fn request_with_route_params() {
        let signed = sign_link(&config(), "http://www.example.com/users?id=42&tab=profile", ExtraParams::None).unwrap();
        let checksum = UrlComponents::parse(&signed).unwrap().query_param("_checksum").unwrap().to_string();

        let parts = http::Request::builder()
            .uri(format!("/users?tab=profile&_checksum={}", checksum))
            .header("host", "www.example.com")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let bare = HttpRequestView::new(&parts);
        assert_eq!(verify_request(&config(), &bare).unwrap(), VerificationOutcome::Tampered);

        let routed = HttpRequestView::new(&parts).with_route_params(vec![("id".to_string(), "42".to_string())]);
        assert_eq!(verify_request(&config(), &routed).unwrap(), VerificationOutcome::Valid);
    }

    #[test_log::test]
    fn unparseable_request_is_tampered() {
        let parts = http::Request::builder()
            .uri("/x?a=%zz")
            .header("host", "www.example.com")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let view = HttpRequestView::new(&parts);
        assert_eq!(verify_request(&config(), &view).unwrap(), VerificationOutcome::Tampered);

        let (outcome, tampered) = check_request(&config(), &view).unwrap();
        assert_eq!(outcome, VerificationOutcome::Tampered);
        let tampered = tampered.unwrap();
        assert_eq!(tampered.observed_url, "http://www.example.com/x?a=%zz");
        assert_eq!(tampered.provided_checksum, "");
        assert_eq!(tampered.tampered_handler, "link_tampered");

        let disabled = ChecksumConfig::builder().secret("s").disabled(true).build().unwrap();
        assert_eq!(verify_request(&disabled, &view).unwrap(), VerificationOutcome::Valid);
    }
}
