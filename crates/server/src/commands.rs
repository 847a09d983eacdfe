//! CLI commands

use anyhow::Context;
use hostlock_engine::{AccessService, HostlockConfig};
use hostlock_store::{RegistrySeed, Store};
use std::path::Path;

use crate::http::{serve_until, AppState};

/// Config file (if any) plus environment overrides
pub fn load_config(path: Option<&Path>) -> anyhow::Result<HostlockConfig> {
    let mut config = match path {
        Some(path) => HostlockConfig::load_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HostlockConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

/// Run the pipeline and the HTTP surface until Ctrl-C
pub async fn serve(config: HostlockConfig) -> anyhow::Result<()> {
    let bind = config.http.bind.clone();
    let handle = AccessService::start(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!(bind = %bind, "HTTP surface listening");

    let state = AppState::new(handle.service().clone());
    serve_until(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    })
    .await?;

    handle.shutdown().await?;
    Ok(())
}

/// Load a registry snapshot from a TOML file
pub async fn seed(store: &Store, file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let registry: RegistrySeed = toml::from_str(&content)?;

    let summary = store.seed(&registry).await?;
    println!(
        "✅ Seeded {} properties, {} persons, {} reservations, {} fobs, {} assignments",
        summary.properties, summary.persons, summary.reservations, summary.fobs, summary.assignments
    );
    Ok(())
}

/// Print access history
pub async fn logs(store: &Store, reservation: Option<i64>, limit: u32) -> anyhow::Result<()> {
    let entries = match reservation {
        Some(id) => store.access_logs_for_reservation(id).await?,
        None => store.recent_access_logs(limit).await?,
    };

    if entries.is_empty() {
        println!("No access logs");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {:<12} {:<16} {:<8} {:<16} {:>5.1}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.token,
            entry.label,
            entry.display_status(),
            entry.decision,
            entry.face_confidence,
            entry.snapshot.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

/// Print tamper alerts
pub async fn alerts(store: &Store, host: Option<i64>, limit: u32) -> anyhow::Result<()> {
    let alerts = match host {
        Some(host_id) => store.tamper_alerts_for_host(host_id).await?,
        None => store.recent_tamper_alerts(limit).await?,
    };

    if alerts.is_empty() {
        println!("No tamper alerts");
        return Ok(());
    }

    for alert in alerts {
        println!(
            "{}  {}  {:<8} property={}  {}",
            alert.triggered_at.format("%Y-%m-%d %H:%M:%S"),
            alert.id,
            alert.status,
            alert
                .property_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            alert.snapshot.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

/// Resolve a tamper alert on behalf of a host
pub async fn resolve_alert(store: &Store, tamper_id: &str, host_id: i64) -> anyhow::Result<()> {
    let status = store.resolve_tamper(tamper_id, host_id).await?;
    println!("✅ Tamper alert {tamper_id} is {status}");
    Ok(())
}
