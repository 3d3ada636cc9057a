use {
    crate::{canonical::canonicalize, ChecksumConfig, LinkIntegrityError, UrlComponents},
    log::trace,
    std::fmt::{Debug, Formatter, Result as FmtResult},
    subtle::ConstantTimeEq,
    tower::BoxError,
};

/// A caller-supplied checksum function that replaces the built-in keyed hash.
///
/// The generator receives the secret, the components to protect, and the additional data. The
/// checksum parameter is never present in the components it is given. Its output is used
/// verbatim as the checksum. Generators must be deterministic and ignore query parameter order,
/// or every link they sign will fail verification.
///
/// Any `Fn(&[u8], &UrlComponents, Option<&str>) -> Result<String, BoxError>` that is `Send + Sync`
/// is a generator.
pub trait ChecksumGenerator: Send + Sync {
    /// Produce the checksum string.
    fn generate(
        &self,
        secret: &[u8],
        components: &UrlComponents,
        additional_data: Option<&str>,
    ) -> Result<String, BoxError>;
}

impl<F> ChecksumGenerator for F
where
    F: Fn(&[u8], &UrlComponents, Option<&str>) -> Result<String, BoxError> + Send + Sync,
{
    fn generate(
        &self,
        secret: &[u8],
        components: &UrlComponents,
        additional_data: Option<&str>,
    ) -> Result<String, BoxError> {
        self(secret, components, additional_data)
    }
}

impl Debug for dyn ChecksumGenerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("ChecksumGenerator")
    }
}

/// Compute the checksum for `components` under `config`.
///
/// If the configuration carries a custom generator, it is called with the checksum parameter
/// removed from `components` and its output returned verbatim. Otherwise the canonical form of the components (minus the checksum parameter) is run
/// through the configured keyed hash and returned as lower-case hex.
///
/// # Errors
/// Only a custom generator can fail; its error is returned as
/// [`LinkIntegrityError::Generator`].
pub fn compute_checksum(components: &UrlComponents, config: &ChecksumConfig) -> Result<String, LinkIntegrityError> {
    if let Some(generator) = config.custom_generator() {
        trace!("Computing checksum with custom generator");
        let (_, unsigned) = components.without_param(config.checksum_param());
        return generator.generate(config.secret(), &unsigned, config.additional_data()).map_err(Into::into);
    }

    let canonical = canonicalize(components, config.checksum_param(), config.additional_data());
    let checksum = config.digest_algorithm().hmac_hex(config.secret(), &canonical);
    trace!("Computed {} checksum {}", config.digest_algorithm(), checksum);
    Ok(checksum)
}

/// Exact string comparison that doesn't leak the position of the first difference. Strings of
/// different lengths are unequal.
pub(crate) fn checksums_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
