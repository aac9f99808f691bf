use crate::{
    core::{Map, ResourceContext, RuleSet},
    metrics::AdmissionMetrics,
};
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use kube::{core::DynamicObject, ResourceExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Answers admission reviews with the annotations required by a [`RuleSet`].
#[derive(Clone, Debug)]
pub struct Admission {
    rules: Arc<RuleSet>,
    metrics: AdmissionMetrics,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[from] hyper::Error),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = kube::core::admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = kube::core::admission::AdmissionResponse;

type Body = http_body_util::Full<bytes::Bytes>;

// === impl Admission ===

impl tower::Service<Request<hyper::body::Incoming>> for Admission {
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        trace!(?req);
        if req.method() != http::Method::POST || req.uri().path() != "/" {
            return Box::pin(future::ok(
                Response::builder()
                    .status(http::StatusCode::NOT_FOUND)
                    .body(Body::default())
                    .expect("not found response must be valid"),
            ));
        }

        let admission = self.clone();
        Box::pin(async move {
            use bytes::Buf;
            let bytes = req.into_body().collect().await?.to_bytes();
            let review: Review = match serde_json::from_reader(bytes.reader()) {
                Ok(review) => review,
                Err(error) => {
                    warn!(%error, "Failed to parse request body");
                    return json_response(AdmissionResponse::invalid(error).into_review());
                }
            };
            trace!(?review);

            let rsp = match review.try_into() {
                Ok(req) => {
                    debug!(?req);
                    admission.admit(req)
                }
                Err(error) => {
                    warn!(%error, "Invalid admission request");
                    AdmissionResponse::invalid(error)
                }
            };
            debug!(?rsp);
            json_response(rsp.into_review())
        })
    }
}

impl Admission {
    pub fn new(rules: Arc<RuleSet>, metrics: AdmissionMetrics) -> Self {
        Self { rules, metrics }
    }

    /// Evaluates the object under review and, when a rule matches, patches
    /// its annotations. Requests are never denied.
    fn admit(&self, req: AdmissionRequest) -> AdmissionResponse {
        let rsp = AdmissionResponse::from(&req);

        let kind = req.kind.kind.as_str();
        self.metrics.requested(kind);

        let obj = match req.object.as_ref() {
            Some(obj) => obj,
            None => {
                debug!(operation = ?req.operation, %kind, "No object under review");
                return rsp;
            }
        };

        // Objects being created frequently omit their namespace, and objects
        // created with `generateName` have no name yet.
        let namespace = obj
            .namespace()
            .filter(|ns| !ns.is_empty())
            .or_else(|| req.namespace.clone())
            .unwrap_or_default();
        let name = match obj.metadata.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => req.name.as_str(),
        };

        let resource = ResourceContext {
            namespace: &namespace,
            kind,
            name,
            labels: obj.labels(),
        };
        let eval = self.rules.evaluate(&resource, obj.annotations().clone());
        if !eval.matched {
            debug!(%namespace, %name, %kind, "No rules matched");
            return rsp;
        }
        self.metrics.matched(kind);

        let rules = eval
            .rules
            .iter()
            .map(|&idx| rule_name(&self.rules, idx))
            .collect::<Vec<_>>();
        debug!(%namespace, %name, %kind, ?rules, "Rules matched");
        for (key, value) in eval.annotations.iter() {
            if obj.annotations().get(key) != Some(value) {
                debug!(%key, %value, "Setting annotation");
            }
        }

        let patch = match annotations_patch(obj, eval.annotations) {
            Ok(patch) => patch,
            Err(error) => {
                warn!(%error, %namespace, %name, %kind, "Failed to build annotations patch");
                return AdmissionResponse::invalid(error);
            }
        };
        if patch.0.is_empty() {
            debug!(%namespace, %name, %kind, "Annotations already up to date");
            return rsp;
        }

        match rsp.with_patch(patch) {
            Ok(rsp) => {
                self.metrics.patched(kind);
                rsp
            }
            Err(error) => {
                warn!(%error, %namespace, %name, %kind, "Failed to encode annotations patch");
                AdmissionResponse::invalid(error)
            }
        }
    }
}

fn rule_name(rules: &RuleSet, idx: usize) -> String {
    match rules.rules().get(idx).and_then(|rule| rule.name()) {
        Some(name) => name.to_string(),
        None => format!("#{idx}"),
    }
}

/// Builds the JSON patch that replaces `obj`'s annotations with `annotations`.
fn annotations_patch(
    obj: &DynamicObject,
    annotations: Map,
) -> Result<json_patch::Patch, serde_json::Error> {
    let before = serde_json::to_value(obj)?;
    let mut obj = obj.clone();
    obj.metadata.annotations = Some(annotations);
    let after = serde_json::to_value(&obj)?;
    Ok(json_patch::diff(&before, &after))
}

fn json_response(rsp: Review) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(&rsp)?;
    Ok(Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("admission review response must be valid"))
}
