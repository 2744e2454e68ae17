use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored record: field name to JSON value, in insertion order.
pub type Record = Map<String, Value>;

/// Generic identity field that accompanies the domain tags.
pub const DESC_KEY: &str = "desc";

/// Ordered set of field names deciding whether two records occupy the same slot.
///
/// Order is the configured priority; it only matters for table column layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IdentityKeys {
    keys: Vec<String>,
}

impl IdentityKeys {
    #[must_use]
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if !deduped.contains(&key) {
                deduped.push(key);
            }
        }
        Self { keys: deduped }
    }

    /// Domain tags followed by the generic `desc` field.
    #[must_use]
    pub fn with_desc<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into);
        Self::new(tags.chain(std::iter::once(DESC_KEY.to_string())))
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|candidate| candidate == key)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<Vec<String>> for IdentityKeys {
    fn from(keys: Vec<String>) -> Self {
        Self::new(keys)
    }
}

impl From<IdentityKeys> for Vec<String> {
    fn from(keys: IdentityKeys) -> Self {
        keys.keys
    }
}
