//! Supershow Production - replica runner and bus monitor.
//!
//! ```bash
//! supershow-production            # mirror the match, log every change
//! supershow-production --monitor  # log every raw message on supershow/#
//! ```

use std::sync::Arc;

use anyhow::Context;
use supershow_bus::BusConnection;
use supershow_production::{build_replica, ControlBeacon, ReplicaChange};
use supershow_shared::{
    BusPort, ConnectionState, InboundPayload, JsonCardCatalog, QoS, Settings, WILDCARD_ALL,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

enum Mode {
    Replica,
    Monitor,
}

fn parse_mode() -> anyhow::Result<Mode> {
    let mut mode = Mode::Replica;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--monitor" => mode = Mode::Monitor,
            other => anyhow::bail!("Unknown argument '{}'. Usage: supershow-production [--monitor]", other),
        }
    }
    Ok(mode)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_mode()?;
    let settings = Settings::load().context("Failed to load settings")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bus_config = settings.mqtt.production_bus_config();
    let client_id = bus_config.client_id.clone();
    let bus = Arc::new(BusConnection::mqtt(bus_config));
    let shutdown = CancellationToken::new();

    match mode {
        Mode::Monitor => {
            tracing::info!("Starting Supershow bus monitor");
            attach_monitor(&bus);
        }
        Mode::Replica => {
            tracing::info!("Starting Supershow Production");
            let catalog = JsonCardCatalog::load(&settings.catalog.cards_path)
                .context("Failed to load card catalog")?;
            tracing::info!(cards = catalog.len(), "Card catalog loaded");

            let (router, replica) = build_replica(Arc::new(catalog));
            replica.set_on_change(Box::new(log_change));
            router.attach(&bus, Some(ControlBeacon::new(client_id.clone())));

            if let Some(interval) = settings.production.heartbeat_interval() {
                let beacon = ControlBeacon::new(client_id);
                tokio::spawn(beacon.run_heartbeat(
                    Arc::clone(&bus) as Arc<dyn BusPort>,
                    interval,
                    shutdown.clone(),
                ));
            }
        }
    }

    bus.connect().context("Failed to start bus connection")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    shutdown.cancel();
    bus.disconnect();
    bus.join().await;
    Ok(())
}

fn attach_monitor(bus: &Arc<BusConnection>) {
    bus.set_on_message(Box::new(|message| {
        let text = match InboundPayload::decode(&message.payload) {
            Ok(payload) => payload.raw().to_string(),
            Err(_) => format!("<{} bytes>", message.payload.len()),
        };
        tracing::info!(
            topic = %message.topic,
            retained = message.retained,
            payload = %text,
            "Message"
        );
    }));
    let weak_bus = Arc::downgrade(bus);
    bus.set_on_state_change(Box::new(move |state| {
        if state != ConnectionState::Connected {
            return;
        }
        if let Some(bus) = weak_bus.upgrade() {
            if bus.subscribe(WILDCARD_ALL, QoS::AtLeastOnce) {
                tracing::info!(filter = WILDCARD_ALL, "Monitoring");
            }
        }
    }));
}

fn log_change(change: &ReplicaChange) {
    match change {
        ReplicaChange::MatchInit {
            match_id, title, ..
        } => tracing::info!(%match_id, %title, "Match init"),
        ReplicaChange::MatchReset => tracing::info!("Match reset"),
        ReplicaChange::Competitor {
            player,
            competitor_id,
            card,
        } => tracing::info!(
            player = player.number(),
            competitor_id = competitor_id.as_deref().unwrap_or("-"),
            name = card.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            "Competitor"
        ),
        other => tracing::info!(kind = %other.kind(), change = ?other, "Replica update"),
    }
}
