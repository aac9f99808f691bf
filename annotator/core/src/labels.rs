use std::collections::BTreeMap;

pub type Map = BTreeMap<String, String>;

/// Selects resources whose labels include every entry of the selector.
///
/// Values are compared exactly; there are no wildcard, prefix or
/// existence-only semantics. An empty selector selects everything.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct Selector(Map);

// === Selector ===

impl Selector {
    pub fn from_map(map: Map) -> Self {
        Self(map)
    }

    pub fn matches(&self, labels: &Map) -> bool {
        for (k, v) in self.0.iter() {
            if labels.get(k) != Some(v) {
                return false;
            }
        }

        true
    }
}

impl From<Map> for Selector {
    #[inline]
    fn from(map: Map) -> Self {
        Self::from_map(map)
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Map {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_matches() {
        for (selector, labels, matches, msg) in &[
            (Selector::default(), labels(&[]), true, "empty match"),
            (
                Selector::default(),
                labels(&[("foo", "bar")]),
                true,
                "empty selector matches labeled resource",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                labels(&[("foo", "bar")]),
                true,
                "exact label match",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                labels(&[("foo", "bar"), ("bah", "baz")]),
                true,
                "sufficient label match",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                labels(&[]),
                false,
                "no labels",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                labels(&[("foo", "baz")]),
                false,
                "value mismatch",
            ),
            (
                Selector::from_iter(Some(("foo", ""))),
                labels(&[("foo", "bar")]),
                false,
                "empty value is not a wildcard",
            ),
            (
                Selector::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                labels(&[("foo", "bar")]),
                false,
                "partial match",
            ),
            (
                Selector::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                labels(&[("foo", "bar"), ("bah", "baz"), ("qux", "quux")]),
                true,
                "multi-label match",
            ),
        ] {
            assert_eq!(selector.matches(labels), *matches, "{}", msg);
        }
    }
}
