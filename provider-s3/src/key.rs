//! Mapping between item names and object keys.

/// Normalized key prefix for a remote.
///
/// An empty prefix means the bucket root. Otherwise the prefix never starts
/// with `/` and always ends with exactly one `/`, so `phone`, `/phone` and
/// `phone/` all address the same objects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    pub fn new(raw: Option<&str>) -> Self {
        let trimmed = raw.unwrap_or_default().trim_matches('/');
        if trimmed.is_empty() {
            Self(String::new())
        } else {
            Self(format!("{}/", trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Object key for an item name.
    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }

    /// Item name for a listed key.
    ///
    /// Returns `None` for keys outside the prefix, the prefix marker itself
    /// and directory markers (keys ending in `/`).
    pub fn name_for<'a>(&self, key: &'a str) -> Option<&'a str> {
        let name = key.strip_prefix(self.0.as_str())?;
        if name.is_empty() || name.ends_with('/') {
            None
        } else {
            Some(name)
        }
    }
}
