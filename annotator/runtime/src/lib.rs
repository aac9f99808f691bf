pub use resource_annotator_core as core;

mod admission;
mod args;
pub mod config;
mod metrics;

pub use self::{admission::Admission, args::Args, metrics::AdmissionMetrics};
