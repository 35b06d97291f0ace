use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

pub mod api;
pub mod config;
pub mod error;
pub mod lobby;
pub mod schedule;
pub mod session;
pub mod view;

#[cfg(test)]
mod testing;

use api::{route_url, HttpRoomApi, RoomApi};
use config::{Cli, Command};
use error::ClientError;
use lobby::wait_for_start;
use session::{drive, Role};
use sync_core::{AnswerSubmission, Route};
use view::{TerminalView, View};

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run(cli: Cli) -> Result<(), ClientError> {
    let api = HttpRoomApi::from_args(&cli.connection)?;
    let timing = cli.timing.timing();
    let mut view = TerminalView::new();

    match cli.command {
        Command::Host {
            room_id,
            auto_advance,
        } => {
            let role = Role::Host { auto_advance };
            let route = drive(&api, &mut view, room_id, &role, &timing, None).await;
            announce(&api, &route);
        }
        Command::Wait { pin } => {
            println!("Waiting for room {pin} to start...");
            let route = wait_for_start(&api, &pin, &timing).await;
            announce(&api, &route);
        }
        Command::Play {
            room_id,
            player_id,
            name,
            pin,
        } => {
            if let Some(pin) = pin {
                println!("Waiting for room {pin} to start...");
                let route = wait_for_start(&api, &pin, &timing).await;
                announce(&api, &route);
            }
            println!("Type an option number and press enter to answer.");
            let role = Role::Player { player_id, name };
            let answers = spawn_answer_reader();
            let route = drive(&api, &mut view, room_id, &role, &timing, Some(answers)).await;
            announce(&api, &route);
        }
        Command::Answer {
            room_id,
            player_id,
            question_id,
            option,
        } => {
            let submission = AnswerSubmission {
                player_id,
                question_id,
                selected_option: option,
            };
            match api.submit_answer(room_id, &submission).await {
                Ok(outcome) => view.answer_result(&outcome),
                Err(err) => {
                    view.submission_failed(&err.to_string());
                    return Err(err);
                }
            }
        }
        Command::Players { room_id } => {
            let players = api.players(room_id).await?;
            println!("Players in room {room_id}: {}", players.len());
            for player in players {
                println!("  {} (#{})", player.name, player.id);
            }
        }
    }

    Ok(())
}

fn announce(api: &HttpRoomApi, route: &Route) {
    println!("-> {}", route_url(api.base_url(), route));
}

/// Forwards option numbers typed on stdin to the running session.
/// Blocking reads live on their own thread; tokio's stdin would keep the
/// runtime alive at exit until the next line arrives.
fn spawn_answer_reader() -> mpsc::Receiver<u8> {
    let (tx, rx) = mpsc::channel(8);
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match line.trim().parse::<u8>() {
                Ok(option) => {
                    if tx.blocking_send(option).is_err() {
                        break;
                    }
                }
                Err(_) => println!("Enter an option number."),
            }
        }
    });
    rx
}
