use crate::{
    labels::Map,
    rule::{Rule, RuleSet},
};

/// The attributes of a resource under admission that rules may constrain.
#[derive(Copy, Clone, Debug)]
pub struct ResourceContext<'a> {
    pub namespace: &'a str,
    pub kind: &'a str,
    pub name: &'a str,
    pub labels: &'a Map,
}

/// The outcome of evaluating a [`RuleSet`] against a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// The resource's annotations with those of every matching rule applied.
    /// Unchanged when no rule matched.
    pub annotations: Map,

    pub matched: bool,

    /// Indices of the matching rules, in declaration order.
    pub rules: Vec<usize>,
}

// === impl Rule ===

impl Rule {
    /// Returns true if every configured constraint holds for the resource.
    pub fn matches(&self, resource: &ResourceContext<'_>) -> bool {
        fn exact(constraint: &Option<String>, value: &str) -> bool {
            constraint.as_deref().map_or(true, |c| c == value)
        }

        exact(&self.namespace, resource.namespace)
            && exact(&self.kind, resource.kind)
            && exact(&self.resource_name, resource.name)
            && self.labels.matches(resource.labels)
    }
}

// === impl RuleSet ===

impl RuleSet {
    /// Iterates over the rules that match `resource`, with their indices, in
    /// declaration order.
    pub fn matching<'a>(
        &'a self,
        resource: ResourceContext<'a>,
    ) -> impl Iterator<Item = (usize, &'a Rule)> + 'a {
        self.iter()
            .enumerate()
            .filter(move |(_, rule)| rule.matches(&resource))
    }

    /// Applies the annotations of every matching rule to `annotations`.
    ///
    /// Rules are applied in declaration order, so a later rule overwrites
    /// keys set by an earlier one. Keys no rule sets are left untouched. The
    /// result is marked as matched whenever any rule matched, even if no
    /// annotation value changed.
    pub fn evaluate(&self, resource: &ResourceContext<'_>, annotations: Map) -> Evaluation {
        let mut annotations = annotations;
        let mut rules = Vec::new();

        for (idx, rule) in self.matching(*resource) {
            rules.push(idx);
            annotations.extend(
                rule.annotations
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }

        Evaluation {
            matched: !rules.is_empty(),
            annotations,
            rules,
        }
    }
}
