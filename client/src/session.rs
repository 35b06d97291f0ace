//! One "page lifetime" of the game screen: poll the room, keep the local
//! countdown ticking, take player answers, and end on reload or navigation.

use std::future::pending;

use futures::future::{BoxFuture, Fuse, FusedFuture, FutureExt};
use sync_core::{
    poll_failed, reconcile, Action, AnswerSubmission, PlayerId, PollResult, RoomId, Route,
    SyncPhase, SyncState,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::RoomApi;
use crate::config::Timing;
use crate::error::ClientError;
use crate::schedule::{Schedule, Ticker};
use crate::view::View;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Host { auto_advance: bool },
    Player { player_id: PlayerId, name: String },
}

impl Role {
    pub fn initial_state(&self, room_id: RoomId) -> SyncState {
        match self {
            Role::Host { .. } => SyncState::new(room_id),
            Role::Player { name, .. } => SyncState::new(room_id).with_player_name(name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Reload,
    Navigate(Route),
}

/// Runs sessions back to back until one navigates away. Each reload starts
/// over from a fresh server snapshot.
pub async fn drive<A, V>(
    api: &A,
    view: &mut V,
    room_id: RoomId,
    role: &Role,
    timing: &Timing,
    mut answers: Option<mpsc::Receiver<u8>>,
) -> Route
where
    A: RoomApi + ?Sized,
    V: View,
{
    loop {
        let snapshot = match api.current_question(room_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(room_id, error = %err, "could not load room; retrying");
                tokio::time::sleep(timing.retry).await;
                continue;
            }
        };

        let state = role.initial_state(room_id);
        if snapshot.finished {
            return state.podium().clone();
        }

        let state = state.bootstrap(&snapshot);
        match run_session(api, view, role, state, &mut answers, timing).await {
            Exit::Reload => {
                info!(room_id, "reloading game screen");
            }
            Exit::Navigate(route) => {
                info!(room_id, path = %route.path(), "leaving game screen");
                return route;
            }
        }
    }
}

pub async fn run_session<A, V>(
    api: &A,
    view: &mut V,
    role: &Role,
    mut state: SyncState,
    answers: &mut Option<mpsc::Receiver<u8>>,
    timing: &Timing,
) -> Exit
where
    A: RoomApi + ?Sized,
    V: View,
{
    let room_id = state.room_id();

    // Input typed before this question was on screen belongs to no one.
    if let Some(rx) = answers.as_mut() {
        while rx.try_recv().is_ok() {}
    }

    let mut ticker = Ticker::new(timing.tick);
    if let Some(question) = state.question() {
        view.question(question);
        view.timer(
            question.countdown.remaining(),
            question.countdown.fill_percent(),
        );
        if question.countdown.is_running() {
            ticker.start();
        }
    }

    let mut poll = Schedule::new();
    poll.arm(timing.normal);
    let mut fetch: Fuse<BoxFuture<'_, Result<PollResult, ClientError>>> = Fuse::terminated();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(exit) = countdown_tick(api, view, role, &mut state, &mut ticker).await {
                    return exit;
                }
            }
            _ = poll.fired(), if fetch.is_terminated() => {
                debug!(room_id, "polling current question");
                fetch = api.current_question(room_id).fuse();
            }
            result = &mut fetch => {
                let directive = match result {
                    Ok(snapshot) => {
                        let (next, directive) = reconcile(state, &snapshot);
                        state = next;
                        directive
                    }
                    Err(err) => {
                        warn!(room_id, error = %err, "poll failed; retrying");
                        poll_failed(&state)
                    }
                };

                match directive.action {
                    Action::Reload => {
                        info!(room_id, "new question is live");
                        return Exit::Reload;
                    }
                    Action::Navigate(route) => {
                        info!(room_id, "game finished");
                        return Exit::Navigate(route);
                    }
                    // The held countdown keeps running underneath the indicator.
                    Action::ShowTransition => view.transition(),
                    Action::Refresh { answers_count, resynced } => {
                        if let Some(count) = answers_count {
                            view.answers_count(count);
                        }
                        if let Some(remaining) = resynced {
                            debug!(room_id, remaining, "countdown resynced to server");
                            ticker.stop();
                            if let Some(question) = state.question() {
                                view.timer(remaining, question.countdown.fill_percent());
                            }
                        }
                    }
                    Action::None => {}
                }

                if state.phase() == SyncPhase::Synced && !ticker.is_running() {
                    let running = state
                        .question()
                        .is_some_and(|q| q.countdown.is_running());
                    if running {
                        ticker.start();
                    }
                }

                match directive.cadence {
                    Some(cadence) => poll.arm(timing.delay(cadence)),
                    // No further polls once the room is done.
                    None => return Exit::Navigate(state.podium().clone()),
                }
            }
            option = next_answer(answers) => {
                match option {
                    Some(option) => submit_answer(api, view, role, &mut state, option).await,
                    None => *answers = None,
                }
            }
        }
    }
}

async fn next_answer(answers: &mut Option<mpsc::Receiver<u8>>) -> Option<u8> {
    match answers.as_mut() {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn countdown_tick<A, V>(
    api: &A,
    view: &mut V,
    role: &Role,
    state: &mut SyncState,
    ticker: &mut Ticker,
) -> Option<Exit>
where
    A: RoomApi + ?Sized,
    V: View,
{
    let Some(question) = state.question_mut() else {
        ticker.stop();
        return None;
    };
    let running = question.countdown.tick();
    view.timer(
        question.countdown.remaining(),
        question.countdown.fill_percent(),
    );
    if running {
        return None;
    }

    ticker.stop();
    view.time_up();

    if !matches!(role, Role::Host { auto_advance: true }) {
        return None;
    }
    let room_id = state.room_id();
    match api.next_question(room_id).await {
        Ok(next) if next.finished => Some(Exit::Navigate(state.podium().clone())),
        Ok(next) => {
            debug!(room_id, question_id = ?next.question_id, "advanced to next question");
            Some(Exit::Reload)
        }
        Err(err) => {
            warn!(room_id, error = %err, "could not advance; waiting for the server");
            None
        }
    }
}

async fn submit_answer<A, V>(api: &A, view: &mut V, role: &Role, state: &mut SyncState, option: u8)
where
    A: RoomApi + ?Sized,
    V: View,
{
    let Role::Player { player_id, .. } = role else {
        debug!("hosts do not answer; ignoring input");
        return;
    };

    let question_id = match state.claim_answer() {
        Ok(id) => id,
        Err(err) => {
            warn!(error = %err, "answer not sent");
            view.submission_failed(&err.to_string());
            return;
        }
    };

    let submission = AnswerSubmission {
        player_id: *player_id,
        question_id,
        selected_option: option,
    };
    match api.submit_answer(state.room_id(), &submission).await {
        Ok(outcome) => {
            info!(question_id, correct = outcome.correct, points = outcome.points, "answer scored");
            view.answer_result(&outcome);
        }
        Err(err) => {
            warn!(question_id, error = %err, "submission failed");
            view.submission_failed(&err.to_string());
        }
    }
}
