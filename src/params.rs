use {
    crate::{canonical::query_string_to_pairs, constants::MSG_ODD_FLAT_PARAMS, LinkIntegrityError},
    std::collections::{BTreeMap, HashMap},
};

/// Extra query parameters to merge into a link before signing.
///
/// Merging appends; names that already exist keep their values and gain the new ones.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ExtraParams {
    /// No extra parameters.
    #[default]
    None,

    /// Ordered `(name, value)` pairs. Names may repeat.
    Pairs(Vec<(String, String)>),

    /// Names mapped to their values. Names are emitted in sorted order.
    Map(BTreeMap<String, Vec<String>>),

    /// Alternating names and values: `[name1, value1, name2, value2, ...]`.
    Flat(Vec<String>),

    /// An already-encoded query string such as `a=1&b=2`, with or without a leading `?`.
    Encoded(String),
}

impl ExtraParams {
    /// Returns true if there is nothing to merge.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Pairs(pairs) => pairs.is_empty(),
            Self::Map(map) => map.values().all(Vec::is_empty),
            Self::Flat(flat) => flat.is_empty(),
            Self::Encoded(encoded) => encoded.trim_start_matches('?').is_empty(),
        }
    }

    /// Convert into decoded `(name, value)` pairs.
    ///
    /// # Errors
    /// Returns [`LinkIntegrityError::InvalidArgument`] if a flat list has an odd number of
    /// elements or an encoded query string contains a malformed percent-encoding.
    pub fn into_pairs(self) -> Result<Vec<(String, String)>, LinkIntegrityError> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Pairs(pairs) => Ok(pairs),
            Self::Map(map) => {
                Ok(map.into_iter().flat_map(|(name, values)| values.into_iter().map(move |v| (name.clone(), v))).collect())
            }
            Self::Flat(flat) => {
                if flat.len() % 2 != 0 {
                    return Err(LinkIntegrityError::InvalidArgument(MSG_ODD_FLAT_PARAMS.to_string()));
                }

                let mut result = Vec::with_capacity(flat.len() / 2);
                let mut iter = flat.into_iter();
                while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
                    result.push((name, value));
                }
                Ok(result)
            }
            Self::Encoded(encoded) => query_string_to_pairs(encoded.trim_start_matches('?')),
        }
    }
}

impl From<Vec<(String, String)>> for ExtraParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::Pairs(pairs)
    }
}

impl From<Vec<(&str, &str)>> for ExtraParams {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        Self::from(pairs.as_slice())
    }
}

impl From<&[(&str, &str)]> for ExtraParams {
    fn from(pairs: &[(&str, &str)]) -> Self {
        Self::Pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }
}

impl From<Vec<String>> for ExtraParams {
    fn from(flat: Vec<String>) -> Self {
        Self::Flat(flat)
    }
}

impl From<BTreeMap<String, Vec<String>>> for ExtraParams {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self::Map(map)
    }
}

impl From<BTreeMap<String, String>> for ExtraParams {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::Map(map.into_iter().map(|(k, v)| (k, vec![v])).collect())
    }
}

impl From<HashMap<String, Vec<String>>> for ExtraParams {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self::Map(map.into_iter().collect())
    }
}

impl From<HashMap<String, String>> for ExtraParams {
    fn from(map: HashMap<String, String>) -> Self {
        Self::Map(map.into_iter().map(|(k, v)| (k, vec![v])).collect())
    }
}

impl From<&str> for ExtraParams {
    fn from(encoded: &str) -> Self {
        Self::Encoded(encoded.to_string())
    }
}

impl<T> From<Option<T>> for ExtraParams
where
    T: Into<ExtraParams>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{ExtraParams, LinkIntegrityError},
        std::collections::{BTreeMap, HashMap},
    };

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test_log::test]
    fn shapes() {
        assert_eq!(ExtraParams::None.into_pairs().unwrap(), vec![]);
        assert_eq!(
            ExtraParams::from(vec![("b", "2"), ("a", "1"), ("b", "3")]).into_pairs().unwrap(),
            pairs(&[("b", "2"), ("a", "1"), ("b", "3")])
        );

        let mut map = HashMap::new();
        map.insert("b".to_string(), vec!["2".to_string(), "3".to_string()]);
        map.insert("a".to_string(), vec!["1".to_string()]);
        assert_eq!(ExtraParams::from(map).into_pairs().unwrap(), pairs(&[("a", "1"), ("b", "2"), ("b", "3")]));

        let mut map = BTreeMap::new();
        map.insert("z".to_string(), "26".to_string());
        assert_eq!(ExtraParams::from(map).into_pairs().unwrap(), pairs(&[("z", "26")]));

        let flat = vec!["a".to_string(), "1".to_string(), "a".to_string(), "2".to_string()];
        assert_eq!(ExtraParams::from(flat).into_pairs().unwrap(), pairs(&[("a", "1"), ("a", "2")]));

        assert_eq!(ExtraParams::from("?a=1&b=x+y").into_pairs().unwrap(), pairs(&[("a", "1"), ("b", "x y")]));
        assert_eq!(ExtraParams::from(None::<&str>), ExtraParams::None);
    }

    #[test_log::test]
    fn empty() {
        assert!(ExtraParams::None.is_empty());
        assert!(ExtraParams::from("?").is_empty());
        assert!(ExtraParams::Flat(vec![]).is_empty());
        assert!(ExtraParams::Map(BTreeMap::from([("a".to_string(), vec![])])).is_empty());
        assert!(!ExtraParams::from(vec![("a", "")]).is_empty());
    }

    #[test_log::test]
    fn invalid_shapes() {
        let flat = vec!["a".to_string(), "1".to_string(), "dangling".to_string()];
        match ExtraParams::from(flat).into_pairs() {
            Err(LinkIntegrityError::InvalidArgument(msg)) => {
                assert_eq!(msg, "Flat parameter list must contain an even number of elements")
            }
            other => panic!("Expected InvalidArgument; got {:?}", other),
        }

        match ExtraParams::from("a=%G1").into_pairs() {
            Err(LinkIntegrityError::InvalidArgument(msg)) => {
                assert_eq!(msg, "Illegal hex character in escape % pattern: %G1")
            }
            other => panic!("Expected InvalidArgument; got {:?}", other),
        }
    }
}
