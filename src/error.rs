use {
    crate::constants::*,
    http::status::StatusCode,
    scratchstack_errors::ServiceError,
    std::{
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
    },
};

/// Error returned when configuring, signing, or checksumming a link fails.
///
/// A tampered link is *not* an error; it is reported as
/// [`VerificationOutcome::Tampered`][crate::VerificationOutcome::Tampered].
#[derive(Debug)]
#[non_exhaustive]
pub enum LinkIntegrityError {
    /// The checksum configuration is unusable. Sample messages:
    /// `A checksum secret is required`
    /// `Unknown configuration option: checksum_parm`
    /// `Unsupported digest algorithm: Digest::Whirlpool`
    /// `Option 'custom_generator' must be a checksum generator function`
    Configuration(/* message */ String),

    /// A custom checksum generator failed.
    Generator(Box<dyn Error + Send + Sync>),

    /// An argument to a signing call has an unsupported shape or encoding. Sample messages:
    /// `Flat parameter list must contain an even number of elements`
    /// `Incomplete trailing escape % sequence`
    InvalidArgument(/* message */ String),
}

impl LinkIntegrityError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => ERR_CODE_CONFIGURATION_ERROR,
            Self::Generator(_) => ERR_CODE_INTERNAL_FAILURE,
            Self::InvalidArgument(_) => ERR_CODE_INVALID_ARGUMENT,
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Generator(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ServiceError for LinkIntegrityError {
    fn error_code(&self) -> &'static str {
        LinkIntegrityError::error_code(self)
    }

    fn http_status(&self) -> StatusCode {
        LinkIntegrityError::http_status(self)
    }
}

impl Display for LinkIntegrityError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Configuration(msg) => f.write_str(msg),
            Self::Generator(ref e) => Display::fmt(e, f),
            Self::InvalidArgument(msg) => f.write_str(msg),
        }
    }
}

impl Error for LinkIntegrityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Generator(ref e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<Box<dyn Error + Send + Sync>> for LinkIntegrityError {
    fn from(e: Box<dyn Error + Send + Sync>) -> LinkIntegrityError {
        match e.downcast::<LinkIntegrityError>() {
            Ok(li_err) => *li_err,
            Err(e) => LinkIntegrityError::Generator(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use {crate::LinkIntegrityError, scratchstack_errors::ServiceError, std::error::Error};

    #[test_log::test]
    fn test_from() {
        let utf8_error = Box::new(String::from_utf8(b"\x80".to_vec()).unwrap_err());
        let e: LinkIntegrityError = (utf8_error as Box<dyn Error + Send + Sync + 'static>).into();
        assert_eq!(e.error_code(), "InternalFailure");
        assert_eq!(e.http_status(), 500);
        assert!(e.source().is_some());

        let e = LinkIntegrityError::InvalidArgument("foo".to_string());
        let e2 = LinkIntegrityError::from(Box::new(e) as Box<dyn Error + Send + Sync + 'static>);
        assert_eq!(e2.to_string(), "foo");
        assert_eq!(e2.error_code(), "InvalidArgument");
        assert_eq!(e2.http_status(), 400);
        assert!(e2.source().is_none());

        let e = LinkIntegrityError::Configuration("A checksum secret is required".to_string());
        assert_eq!(e.error_code(), "ConfigurationError");
        assert_eq!(e.http_status(), 500);
        assert_eq!(format!("{}", e), "A checksum secret is required");
    }
}
