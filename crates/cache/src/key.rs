use std::collections::BTreeMap;
use std::fmt;

/// Prefix shared by every key this crate writes.
pub const KEY_PREFIX: &str = "analytics";

/// A cache key derived deterministically from an aggregation's filter parameters.
///
/// Parameters are sorted by name, and absent optional filters are written as `*`, so the
/// same filter always yields the same key regardless of the order it was built in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn builder(namespace: &str) -> CacheKeyBuilder {
        CacheKeyBuilder {
            namespace: namespace.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// The prefix shared by every key in `namespace`, used for bulk invalidation.
    pub fn namespace_prefix(namespace: &str) -> String {
        format!("{KEY_PREFIX}:{namespace}:")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct CacheKeyBuilder {
    namespace: String,
    params: BTreeMap<&'static str, String>,
}

impl CacheKeyBuilder {
    pub fn param(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.params.insert(name, sanitize(&value.to_string()));
        self
    }

    pub fn optional(self, name: &'static str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self.param(name, "*"),
        }
    }

    pub fn build(self) -> CacheKey {
        let mut key = CacheKey::namespace_prefix(&self.namespace);
        let params: Vec<String> = self
            .params
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        key.push_str(&params.join(":"));
        CacheKey(key)
    }
}

// Separators inside a value would make two different filters collide.
fn sanitize(value: &str) -> String {
    value.replace([':', '='], "_")
}
