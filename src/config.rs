use {
    crate::{
        constants::*,
        engine::ChecksumGenerator,
        DigestAlgorithm, LinkIntegrityError,
    },
    derive_builder::{Builder, UninitializedFieldError},
    std::{
        fmt::{Debug, Formatter, Result as FmtResult},
        str::FromStr,
        sync::Arc,
    },
};

/// Configuration shared by link signing and verification.
///
/// `ChecksumConfig` values are immutable. Build one at startup with [`ChecksumConfig::builder`]
/// or [`configure`], then share it (typically behind an [`Arc`]) with every signer and verifier.
/// Nothing in it is mutated afterwards, so concurrent use needs no locking.
#[derive(Builder, Clone)]
#[builder(build_fn(validate = "Self::validate", error = "LinkIntegrityError"))]
pub struct ChecksumConfig {
    /// The key for the keyed hash. Required and non-empty.
    #[builder(setter(into))]
    secret: Vec<u8>,

    /// The query parameter carrying the checksum.
    #[builder(setter(into), default = "DEFAULT_CHECKSUM_PARAM.to_string()")]
    checksum_param: String,

    /// The keyed hash used when no custom generator is set.
    #[builder(default)]
    digest_algorithm: DigestAlgorithm,

    /// Replaces the keyed hash when present.
    #[builder(setter(strip_option), default)]
    custom_generator: Option<Arc<dyn ChecksumGenerator>>,

    /// Opaque data mixed into every checksum, e.g. a session id.
    #[builder(setter(into, strip_option), default)]
    additional_data: Option<String>,

    /// The handler to dispatch to when a link has been tampered with.
    #[builder(setter(into), default = "DEFAULT_TAMPERED_HANDLER.to_string()")]
    tampered_handler: String,

    /// When set, every request verifies as valid.
    #[builder(default)]
    disabled: bool,
}

impl ChecksumConfig {
    /// Create a [ChecksumConfigBuilder] to construct a [ChecksumConfig].
    #[inline]
    pub fn builder() -> ChecksumConfigBuilder {
        ChecksumConfigBuilder::default()
    }

    /// Retrieve the secret key.
    #[inline]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Retrieve the name of the checksum query parameter.
    #[inline]
    pub fn checksum_param(&self) -> &str {
        &self.checksum_param
    }

    /// Retrieve the keyed-hash algorithm.
    #[inline]
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// Retrieve the custom generator, if any.
    #[inline]
    pub fn custom_generator(&self) -> Option<&dyn ChecksumGenerator> {
        self.custom_generator.as_deref()
    }

    /// Retrieve the additional data, if any.
    #[inline]
    pub fn additional_data(&self) -> Option<&str> {
        self.additional_data.as_deref()
    }

    /// Retrieve the identifier of the tampered-link handler.
    #[inline]
    pub fn tampered_handler(&self) -> &str {
        &self.tampered_handler
    }

    /// Whether verification is disabled.
    #[inline]
    pub fn disabled(&self) -> bool {
        self.disabled
    }
}

impl ChecksumConfigBuilder {
    fn validate(&self) -> Result<(), LinkIntegrityError> {
        match &self.secret {
            Some(secret) if !secret.is_empty() => (),
            _ => return Err(LinkIntegrityError::Configuration(MSG_MISSING_SECRET.to_string())),
        }

        if let Some(checksum_param) = &self.checksum_param {
            if checksum_param.is_empty() {
                return Err(LinkIntegrityError::Configuration(
                    "Option 'checksum_param' must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Debug for ChecksumConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ChecksumConfig")
            .field("secret", &"*")
            .field("checksum_param", &self.checksum_param)
            .field("digest_algorithm", &self.digest_algorithm)
            .field("custom_generator", &self.custom_generator.is_some())
            .field("additional_data", &self.additional_data)
            .field("tampered_handler", &self.tampered_handler)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl From<UninitializedFieldError> for LinkIntegrityError {
    fn from(e: UninitializedFieldError) -> LinkIntegrityError {
        match e.field_name() {
            "secret" => LinkIntegrityError::Configuration(MSG_MISSING_SECRET.to_string()),
            _ => LinkIntegrityError::Configuration(e.to_string()),
        }
    }
}

/// A value for a string-keyed option passed to [`configure`].
#[derive(Clone)]
pub enum ConfigValue {
    /// A string value.
    Str(String),

    /// A boolean value.
    Bool(bool),

    /// A checksum generator. Only meaningful for `custom_generator`.
    Generator(Arc<dyn ChecksumGenerator>),
}

impl ConfigValue {
    /// Wrap a generator function.
    pub fn generator<G>(generator: G) -> Self
    where
        G: ChecksumGenerator + 'static,
    {
        Self::Generator(Arc::new(generator))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "a string",
            Self::Bool(_) => "a boolean",
            Self::Generator(_) => "a function",
        }
    }
}

impl Debug for ConfigValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Generator(_) => f.write_str("Generator"),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Build a [`ChecksumConfig`] from string-keyed options.
///
/// Recognized keys (camelCase aliases in parentheses):
/// * `secret`: required.
/// * `checksum_param` (`checksumParamName`): defaults to `_checksum`.
/// * `digest_algorithm` (`digestAlgorithm`): e.g. `SHA256`, `Digest::MD5`; defaults to HMAC-SHA256.
/// * `custom_generator` (`customGenerator`): must be a [`ConfigValue::Generator`].
/// * `additional_data` (`additionalData`)
/// * `tampered_handler` (`tamperedHandlerId`): defaults to `link_tampered`.
/// * `disabled`: a boolean, or one of `true`, `false`, `1`, `0`.
///
/// # Errors
/// Returns [`LinkIntegrityError::Configuration`] for a missing or empty secret, an unknown key, a
/// value of the wrong type, a `custom_generator` that isn't a function, or an unsupported digest
/// algorithm.
pub fn configure<I, K>(options: I) -> Result<ChecksumConfig, LinkIntegrityError>
where
    I: IntoIterator<Item = (K, ConfigValue)>,
    K: AsRef<str>,
{
    let mut builder = ChecksumConfig::builder();

    for (key, value) in options {
        let key = key.as_ref();
        match key {
            "secret" => {
                builder.secret(expect_str(key, value)?);
            }
            "checksum_param" | "checksumParamName" => {
                builder.checksum_param(expect_str(key, value)?);
            }
            "digest_algorithm" | "digestAlgorithm" => {
                builder.digest_algorithm(DigestAlgorithm::from_str(&expect_str(key, value)?)?);
            }
            "custom_generator" | "customGenerator" => match value {
                ConfigValue::Generator(generator) => {
                    builder.custom_generator(generator);
                }
                other => {
                    return Err(LinkIntegrityError::Configuration(format!(
                        "Option '{}' must be a checksum generator function, not {}",
                        key,
                        other.kind()
                    )))
                }
            },
            "additional_data" | "additionalData" => {
                builder.additional_data(expect_str(key, value)?);
            }
            "tampered_handler" | "tamperedHandlerId" => {
                builder.tampered_handler(expect_str(key, value)?);
            }
            "disabled" => {
                builder.disabled(expect_bool(key, value)?);
            }
            _ => return Err(LinkIntegrityError::Configuration(format!("{}{}", MSG_UNKNOWN_OPTION, key))),
        }
    }

    builder.build()
}

fn expect_str(key: &str, value: ConfigValue) -> Result<String, LinkIntegrityError> {
    match value {
        ConfigValue::Str(s) => Ok(s),
        other => {
            Err(LinkIntegrityError::Configuration(format!("Option '{}' must be a string, not {}", key, other.kind())))
        }
    }
}

fn expect_bool(key: &str, value: ConfigValue) -> Result<bool, LinkIntegrityError> {
    match value {
        ConfigValue::Bool(b) => Ok(b),
        ConfigValue::Str(s) => match s.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(LinkIntegrityError::Configuration(format!("Option '{}' must be a boolean, not '{}'", key, s))),
        },
        other => {
            Err(LinkIntegrityError::Configuration(format!("Option '{}' must be a boolean, not {}", key, other.kind())))
        }
    }
}
