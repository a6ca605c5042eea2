//! Supershow Controller - operator console entry point.

use std::sync::Arc;

use anyhow::Context;
use supershow_bus::BusConnection;
use supershow_controller::infrastructure::console::HELP;
use supershow_controller::{App, ConsoleCommand, MatchController, Outcome, SystemClock};
use supershow_shared::{BusPort, ConnectionState, JsonCardCatalog, QoS, Settings, WILDCARD_CONTROL};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Supershow Controller");

    let catalog = JsonCardCatalog::load(&settings.catalog.cards_path)
        .context("Failed to load card catalog")?;
    tracing::info!(cards = catalog.len(), path = %settings.catalog.cards_path.display(), "Card catalog loaded");

    let bus = Arc::new(BusConnection::mqtt(settings.mqtt.controller_bus_config()));
    bus.set_on_message(Box::new(|message| {
        supershow_controller::app::log_control_message(&message)
    }));
    let weak_bus = Arc::downgrade(&bus);
    bus.set_on_state_change(Box::new(move |state| {
        if state != ConnectionState::Connected {
            return;
        }
        if let Some(bus) = weak_bus.upgrade() {
            if !bus.subscribe(WILDCARD_CONTROL, QoS::AtLeastOnce) {
                tracing::warn!(filter = WILDCARD_CONTROL, "Control subscription not queued");
            }
        }
    }));

    let controller = MatchController::new(
        Arc::clone(&bus) as Arc<dyn BusPort>,
        Arc::new(SystemClock::new()),
        Arc::new(catalog),
    );
    let mut app = App::new(controller);

    bus.connect().context("Failed to start bus connection")?;

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read console input")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        match app.execute(command) {
            Ok(Outcome::Continue(Some(message))) => println!("{}", message),
            Ok(Outcome::Continue(None)) => {}
            Ok(Outcome::Quit) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Command failed");
                println!("{}", e);
            }
        }
    }

    bus.disconnect();
    bus.join().await;
    tracing::info!("Supershow Controller stopped");
    Ok(())
}
