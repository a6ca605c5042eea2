//! Console command execution against the match controller.

use std::fmt::Write as _;

use supershow_domain::{MatchState, PlayerState};
use supershow_shared::{BusMessage, ControlField, ControlSignal, InboundPayload, Topic};

use crate::infrastructure::console::{ConsoleCommand, HELP};
use crate::match_controller::MatchController;
use crate::ControllerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(Option<String>),
    Quit,
}

impl Outcome {
    fn say(message: impl Into<String>) -> Self {
        Outcome::Continue(Some(message.into()))
    }

    fn quiet() -> Self {
        Outcome::Continue(None)
    }
}

pub struct App {
    controller: MatchController,
}

impl App {
    pub fn new(controller: MatchController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &MatchController {
        &self.controller
    }

    pub fn execute(&mut self, command: ConsoleCommand) -> Result<Outcome, ControllerError> {
        let controller = &mut self.controller;
        let outcome = match command {
            ConsoleCommand::Title(title) => {
                controller.update_title(title);
                Outcome::quiet()
            }
            ConsoleCommand::Stipulations(stipulations) => {
                controller.update_stipulations(stipulations);
                Outcome::quiet()
            }
            ConsoleCommand::Crowd(value) => {
                controller.update_crowd_meter(value);
                Outcome::say(format!("Crowd meter: {}", controller.state().crowd_meter))
            }
            ConsoleCommand::Competitor(player, None) => {
                controller.set_competitor(player, None);
                Outcome::say(format!("Player {} competitor cleared", player))
            }
            ConsoleCommand::Competitor(player, Some(name)) => {
                let card = controller.set_competitor_by_name(player, &name)?;
                Outcome::say(format!("Player {}: {}", player, card))
            }
            ConsoleCommand::Start => {
                if !controller.is_connected() {
                    tracing::warn!("Starting match while disconnected, state will not reach the broker");
                }
                let published = controller.start_staged();
                let id = &controller.state().match_id;
                if published {
                    Outcome::say(format!("Match {} started", id))
                } else {
                    Outcome::say(format!("Match {} started, snapshot incomplete (use resend)", id))
                }
            }
            ConsoleCommand::Reset => {
                controller.reset_match();
                Outcome::say("Match reset")
            }
            ConsoleCommand::Roll(player, roll_type, value) => {
                controller.update_turn_roll(player, roll_type, value);
                Outcome::quiet()
            }
            ConsoleCommand::HandUp(player) => {
                controller.increment_hand_count(player);
                Outcome::say(hand_line(controller.state().player(player)))
            }
            ConsoleCommand::HandDown(player) => {
                controller.decrement_hand_count(player);
                Outcome::say(hand_line(controller.state().player(player)))
            }
            ConsoleCommand::Hand(player, value) => {
                controller.set_hand_count(player, value);
                Outcome::say(hand_line(controller.state().player(player)))
            }
            ConsoleCommand::Finish(player, value) => {
                controller.update_finish_roll(player, value);
                Outcome::quiet()
            }
            ConsoleCommand::Breakout(player, value) => {
                controller.add_breakout_roll(player, value);
                Outcome::quiet()
            }
            ConsoleCommand::BreakoutClear(player) => {
                controller.clear_breakout_rolls(player);
                Outcome::quiet()
            }
            ConsoleCommand::Pass(player) => {
                controller.increment_turns_passed(player);
                Outcome::say(format!(
                    "Player {} turns passed: {}",
                    player,
                    controller.state().player(player).turns_passed
                ))
            }
            ConsoleCommand::Resend => {
                if controller.resend_snapshot() {
                    Outcome::say("Snapshot resent")
                } else {
                    Outcome::say("Nothing resent")
                }
            }
            ConsoleCommand::Status => Outcome::say(render_status(
                controller.state(),
                controller.is_active(),
                controller.is_connected(),
            )),
            ConsoleCommand::Competitors => {
                let names: Vec<String> = controller
                    .competitors()?
                    .into_iter()
                    .map(|card| card.to_string())
                    .collect();
                if names.is_empty() {
                    Outcome::say("No competitors in catalog")
                } else {
                    Outcome::say(names.join("\n"))
                }
            }
            ConsoleCommand::Help => Outcome::say(HELP),
            ConsoleCommand::Quit => Outcome::Quit,
        };
        Ok(outcome)
    }
}

fn hand_line(player: &PlayerState) -> String {
    format!(
        "Player {} hand {} / deck {}",
        player.player_id, player.hand_count, player.deck_count
    )
}

fn render_status(state: &MatchState, active: bool, connected: bool) -> String {
    let mut out = String::new();
    let phase = if active { "active" } else { "staging" };
    let link = if connected { "connected" } else { "offline" };
    let _ = writeln!(out, "[{}] [{}] {}", phase, link, state.match_id);
    let _ = writeln!(out, "Title: {}", state.title);
    let _ = writeln!(out, "Stipulations: {}", state.stipulations);
    let _ = write!(out, "Crowd meter: {}", state.crowd_meter);
    for player in [&state.player1, &state.player2] {
        let rolls: Vec<String> = player.breakout_rolls.iter().map(|r| r.to_string()).collect();
        let _ = write!(
            out,
            "\nP{} {} | hand {} deck {} | roll {} | finish {} | breakout [{}] | passed {}",
            player.player_id,
            player.competitor_id.as_deref().unwrap_or("-"),
            player.hand_count,
            player.deck_count,
            player
                .last_turn_roll
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            player
                .finish_roll
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            rolls.join(", "),
            player.turns_passed,
        );
    }
    out
}

/// Log ready and heartbeat signals from production clients.
pub fn log_control_message(message: &BusMessage) {
    let field = match message.topic.parse::<Topic>() {
        Ok(Topic::Control(field)) => field,
        Ok(_) | Err(_) => {
            tracing::debug!(topic = %message.topic, "Ignoring non-control message");
            return;
        }
    };
    let signal = InboundPayload::decode(&message.payload)
        .and_then(|payload| payload.as_record::<ControlSignal>());
    match (field, signal) {
        (ControlField::Ready, Ok(signal)) => {
            tracing::info!(client_id = %signal.client_id, "Production client ready");
        }
        (ControlField::Heartbeat, Ok(signal)) => {
            tracing::debug!(client_id = %signal.client_id, timestamp = signal.timestamp, "Heartbeat");
        }
        (field, Err(e)) => {
            tracing::warn!(signal = %field, error = %e, "Unreadable control signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use supershow_domain::{PlayerId, RollType};
    use supershow_shared::{ConnectionState, MockBusPort, MockCardCatalog};

    use crate::infrastructure::clock::FixedClock;

    fn app(connected: bool) -> App {
        let mut bus = MockBusPort::new();
        bus.expect_publish().returning(move |_, _, _, _| connected);
        bus.expect_state().returning(move || {
            if connected {
                ConnectionState::Connected
            } else {
                ConnectionState::Backoff
            }
        });
        let mut catalog = MockCardCatalog::new();
        catalog.expect_competitors().returning(|| Ok(Vec::new()));
        catalog.expect_find_competitor().returning(|_| Ok(None));
        App::new(MatchController::new(
            Arc::new(bus),
            Arc::new(FixedClock::at_unix(100)),
            Arc::new(catalog),
        ))
    }

    fn run(app: &mut App, line: &str) -> Outcome {
        app.execute(line.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_stage_then_start() {
        let mut app = app(true);
        run(&mut app, "title Main Event");
        run(&mut app, "crowd 4");
        assert!(!app.controller().is_active());

        let outcome = run(&mut app, "start");
        assert_eq!(outcome, Outcome::say("Match match-100 started"));
        assert!(app.controller().is_active());
        assert_eq!(app.controller().state().title, "Main Event");
        assert_eq!(app.controller().state().crowd_meter.value(), 4);
    }

    #[test]
    fn test_start_while_offline_reports_incomplete_snapshot() {
        let mut app = app(false);
        let Outcome::Continue(Some(message)) = run(&mut app, "start") else {
            panic!("expected a message");
        };
        assert!(message.contains("snapshot incomplete"));
    }

    #[test]
    fn test_hand_commands_report_deck() {
        let mut app = app(true);
        run(&mut app, "start");
        assert_eq!(
            run(&mut app, "hand 1 31"),
            Outcome::say("Player 1 hand 30 / deck 0")
        );
        assert_eq!(
            run(&mut app, "hand- 1"),
            Outcome::say("Player 1 hand 29 / deck 1")
        );
    }

    #[test]
    fn test_status_shows_both_players() {
        let mut app = app(true);
        run(&mut app, "start");
        run(&mut app, "roll 2 power 7");
        run(&mut app, "breakout 2 13");
        let Outcome::Continue(Some(status)) = run(&mut app, "status") else {
            panic!("expected status");
        };
        assert!(status.starts_with("[active] [connected] match-100"));
        assert!(status.contains("P1 -"));
        assert!(status.contains("breakout [12]"));
        assert_eq!(
            app.controller().state().player(PlayerId::Two).last_turn_roll.map(|r| r.roll_type),
            Some(RollType::Power)
        );
    }

    #[test]
    fn test_unknown_competitor_is_an_error() {
        let mut app = app(true);
        let result = app.execute(ConsoleCommand::Competitor(
            PlayerId::One,
            Some("Nobody".to_string()),
        ));
        assert!(matches!(result, Err(ControllerError::UnknownCompetitor(_))));
    }

    #[test]
    fn test_empty_catalog_and_quit() {
        let mut app = app(true);
        assert_eq!(
            run(&mut app, "competitors"),
            Outcome::say("No competitors in catalog")
        );
        assert_eq!(run(&mut app, "quit"), Outcome::Quit);
    }

    #[test]
    fn test_reset_returns_to_staging() {
        let mut app = app(true);
        run(&mut app, "start");
        run(&mut app, "reset");
        assert!(!app.controller().is_active());
        assert_eq!(run(&mut app, "resend"), Outcome::say("Nothing resent"));
    }
}
