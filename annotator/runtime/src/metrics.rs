use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Default)]
pub struct AdmissionMetrics {
    requests: Family<KindLabels, Counter>,
    matched: Family<KindLabels, Counter>,
    patched: Family<KindLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KindLabels {
    kind: String,
}

// === impl AdmissionMetrics ===

impl AdmissionMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let requests = Family::default();
        reg.register(
            "requests",
            "Count of admission requests reviewed",
            requests.clone(),
        );

        let matched = Family::default();
        reg.register(
            "matched",
            "Count of admission requests matched by at least one rule",
            matched.clone(),
        );

        let patched = Family::default();
        reg.register(
            "patched",
            "Count of admission requests answered with an annotations patch",
            patched.clone(),
        );

        Self {
            requests,
            matched,
            patched,
        }
    }

    pub(crate) fn requested(&self, kind: &str) {
        self.requests.get_or_create(&labels(kind)).inc();
    }

    pub(crate) fn matched(&self, kind: &str) {
        self.matched.get_or_create(&labels(kind)).inc();
    }

    pub(crate) fn patched(&self, kind: &str) {
        self.patched.get_or_create(&labels(kind)).inc();
    }
}

fn labels(kind: &str) -> KindLabels {
    KindLabels {
        kind: kind.to_string(),
    }
}
