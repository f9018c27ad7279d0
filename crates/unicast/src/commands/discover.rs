//! `discover`: start a hub, wait for its scans, list what was found.

use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use unicast_core::{Hub, ProviderSummary, ReceiverSummary, ScanEvent, ScanOutcome};

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Row types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Discovered {
    role: &'static str,
    kind: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

impl From<ReceiverSummary> for Discovered {
    fn from(r: ReceiverSummary) -> Self {
        Self {
            role: "receiver",
            kind: r.kind,
            name: r.name,
            address: Some(r.address),
        }
    }
}

impl From<ProviderSummary> for Discovered {
    fn from(p: ProviderSummary) -> Self {
        Self {
            role: "provider",
            kind: p.kind,
            name: p.name,
            address: None,
        }
    }
}

#[derive(Tabled)]
struct DiscoveredRow {
    #[tabled(rename = "Role")]
    role: &'static str,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
}

impl From<&Discovered> for DiscoveredRow {
    fn from(d: &Discovered) -> Self {
        Self {
            role: d.role,
            kind: d.kind.clone(),
            name: d.name.clone(),
            address: d.address.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DiscoverArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let hub_config = config::hub_config(&cfg, args.no_scan)?;
    let timeout = Duration::from_secs(args.timeout.unwrap_or(cfg.defaults.discover_timeout));

    let hub = Hub::new(hub_config);
    let listener = hub.receivers().on_change(|event| {
        if event.is_added() {
            info!(receiver = %event.key(), kind = event.entity().kind(), "receiver discovered");
        }
    });

    let mut receiver_scans = hub.receiver_factories().subscribe_scans();
    let mut provider_scans = hub.provider_factories().subscribe_scans();
    hub.start();

    let deadline = tokio::time::sleep(timeout);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(deadline, interrupt);

    while hub.is_scanning() {
        tokio::select! {
            () = &mut deadline => {
                warn!(timeout_secs = timeout.as_secs(), "discovery timed out, listing partial results");
                break;
            }
            _ = &mut interrupt => {
                info!("discovery interrupted");
                break;
            }
            event = receiver_scans.recv() => log_scan(event),
            event = provider_scans.recv() => log_scan(event),
        }
    }

    hub.shutdown();
    hub.receivers().remove_listener(listener);

    let mut found: Vec<Discovered> = hub
        .receivers()
        .summaries()
        .into_iter()
        .map(Discovered::from)
        .collect();
    found.extend(hub.providers().summaries().into_iter().map(Discovered::from));

    let out = output::render_list(
        &global.output,
        &found,
        |d| DiscoveredRow::from(d),
        |d| d.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn log_scan(event: Result<ScanEvent<String>, RecvError>) {
    match event {
        Ok(ScanEvent {
            key,
            outcome: ScanOutcome::Failed(reason),
            ..
        }) => warn!(factory = %key, %reason, "scan failed"),
        Ok(ScanEvent { key, outcome, .. }) => debug!(factory = %key, %outcome, "scan finished"),
        Err(RecvError::Lagged(skipped)) => debug!(skipped, "scan events lagged"),
        Err(RecvError::Closed) => {}
    }
}
