//! Keyed-hash primitives available for link checksums.

use {
    crate::{constants::MSG_UNSUPPORTED_DIGEST, LinkIntegrityError},
    hmac::{digest::KeyInit, Hmac, Mac},
    md5::Md5,
    sha1::Sha1,
    sha2::{Sha256, Sha512},
    std::{
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// The keyed-hash construction used to compute a link checksum.
///
/// The set is closed: identifiers are resolved when the configuration is built, never when a link
/// is signed or verified.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// HMAC-MD5. Only useful for validating links minted by older deployments.
    HmacMd5,

    /// HMAC-SHA1.
    HmacSha1,

    /// HMAC-SHA256.
    #[default]
    HmacSha256,

    /// HMAC-SHA512.
    HmacSha512,
}

impl DigestAlgorithm {
    /// The canonical name of the algorithm, e.g. `HMAC-SHA256`.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::HmacMd5 => "HMAC-MD5",
            Self::HmacSha1 => "HMAC-SHA1",
            Self::HmacSha256 => "HMAC-SHA256",
            Self::HmacSha512 => "HMAC-SHA512",
        }
    }

    /// Length of the raw digest in bytes. The hex form is twice this.
    pub const fn output_len(&self) -> usize {
        match self {
            Self::HmacMd5 => 16,
            Self::HmacSha1 => 20,
            Self::HmacSha256 => 32,
            Self::HmacSha512 => 64,
        }
    }

    /// Compute the keyed hash of `message` under `key`, returned as lower-case hex.
    pub fn hmac_hex(&self, key: &[u8], message: &[u8]) -> String {
        match self {
            Self::HmacMd5 => keyed_hex::<Hmac<Md5>>(key, message),
            Self::HmacSha1 => keyed_hex::<Hmac<Sha1>>(key, message),
            Self::HmacSha256 => keyed_hex::<Hmac<Sha256>>(key, message),
            Self::HmacSha512 => keyed_hex::<Hmac<Sha512>>(key, message),
        }
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = LinkIntegrityError;

    /// Parse an algorithm identifier. Case, dashes, underscores, an `HMAC` prefix, and a
    /// `Digest::` module prefix are ignored, so `MD5`, `Digest::MD5`, `hmac-md5`, and `HMAC_MD5`
    /// all select [`DigestAlgorithm::HmacMd5`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.trim();
        let stripped = stripped.strip_prefix("Digest::").unwrap_or(stripped);
        let mut normalized: String =
            stripped.chars().filter(|c| *c != '-' && *c != '_').map(|c| c.to_ascii_uppercase()).collect();
        if let Some(rest) = normalized.strip_prefix("HMAC") {
            normalized = rest.to_string();
        }

        match normalized.as_str() {
            "MD5" => Ok(Self::HmacMd5),
            "SHA1" => Ok(Self::HmacSha1),
            "SHA256" => Ok(Self::HmacSha256),
            "SHA512" => Ok(Self::HmacSha512),
            _ => Err(LinkIntegrityError::Configuration(format!("{}{}", MSG_UNSUPPORTED_DIGEST, s))),
        }
    }
}

fn keyed_hex<M>(key: &[u8], message: &[u8]) -> String
where
    M: Mac + KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).expect("HMAC can take a key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}
