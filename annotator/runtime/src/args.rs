use crate::{admission::Admission, config, metrics::AdmissionMetrics};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(
    name = "resource-annotator",
    about = "A mutating admission webhook that annotates resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "resource_annotator=info,warn",
        env = "RESOURCE_ANNOTATOR_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// YAML file containing the annotation rules.
    #[clap(long, env = "RESOURCE_ANNOTATOR_CONFIG")]
    config: PathBuf,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            config,
        } = self;

        // Nothing is served until the rules have loaded.
        let rules = Arc::new(config::load(&config)?);

        let mut prom = <Registry>::default();
        let metrics = AdmissionMetrics::register(prom.sub_registry_with_prefix("admission"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_server(server)
            .build()
            .await?;

        if rules.is_empty() {
            warn!(config = %config.display(), "No rules loaded; resources will not be annotated");
        } else {
            info!(config = %config.display(), rules = rules.len(), "Loaded rules");
        }

        let runtime = runtime.spawn_server(Admission::new(rules, metrics));

        // Block the main thread on the shutdown signal. Once it fires, wait for the admission
        // server to drain before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
