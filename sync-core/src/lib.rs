use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type RoomId = i64;
pub type QuestionId = i64;
pub type PlayerId = i64;

/// Seconds the local countdown may drift from the server before it is resynced.
pub const DRIFT_TOLERANCE_SECS: i64 = 2;
pub const NORMAL_POLL_MS: u64 = 1000;
pub const FAST_POLL_MS: u64 = 500;
pub const RETRY_POLL_MS: u64 = 2000;
pub const STATUS_POLL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionState {
    Active,
    Closed,
    Waiting,
    Finished,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    Waiting,
    Running,
    Finished,
    #[serde(other)]
    Unknown,
}

/// Snapshot returned by `GET /api/rooms/{roomId}/current-question`.
///
/// Every field is optional on the wire: a finished room only sends
/// `finished` and `state`, a waiting room sends no question id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PollResult {
    pub id: Option<QuestionId>,
    pub text: Option<String>,
    pub state: Option<QuestionState>,
    pub is_open: bool,
    pub finished: bool,
    pub answers_count: Option<u32>,
    pub remaining_seconds: Option<i64>,
    pub next_question_soon: bool,
    pub time_limit: Option<u32>,
}

impl PollResult {
    /// True when the server reports this question live and accepting answers.
    pub fn opens_question(&self) -> bool {
        self.id.is_some() && self.state == Some(QuestionState::Active) && self.is_open
    }

    fn is_waiting(&self) -> bool {
        self.id.is_none() && self.state == Some(QuestionState::Waiting)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomStatus {
    pub state: RoomState,
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub player_id: PlayerId,
    pub question_id: QuestionId,
    pub selected_option: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    pub points: i64,
    pub total_score: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NextQuestion {
    pub finished: bool,
    pub question_id: Option<QuestionId>,
}

/// Page-level navigation targets that end a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    PlayGame,
    Podium {
        room_id: RoomId,
        player_name: Option<String>,
    },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::PlayGame => "/play/game".to_string(),
            Route::Podium { room_id, .. } => format!("/rooms/{room_id}/podium"),
        }
    }
}

/// Presentation countdown for the held question.
///
/// Only ever decremented by the tick and overwritten by [`Countdown::resync`];
/// the server value always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    remaining: i64,
}

impl Countdown {
    pub fn new(total: u32, remaining: i64) -> Self {
        Self {
            total,
            remaining: remaining.max(0),
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0
    }

    /// Decrements by one second, never below zero. Returns whether time is left.
    pub fn tick(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        self.is_running()
    }

    pub fn drifted_from(&self, server_remaining: i64) -> bool {
        (self.remaining - server_remaining.max(0)).abs() > DRIFT_TOLERANCE_SECS
    }

    /// Adopts the server value when drift exceeds the tolerance.
    pub fn resync(&mut self, server_remaining: i64) -> bool {
        if !self.drifted_from(server_remaining) {
            return false;
        }
        self.remaining = server_remaining.max(0);
        true
    }

    /// Width of the timer bar in percent.
    pub fn fill_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.remaining.max(0) as f64 / self.total as f64) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalQuestion {
    pub id: QuestionId,
    pub text: Option<String>,
    pub countdown: Countdown,
    answered: bool,
}

impl LocalQuestion {
    pub fn new(id: QuestionId, time_limit: u32, remaining: i64) -> Self {
        Self {
            id,
            text: None,
            countdown: Countdown::new(time_limit, remaining),
            answered: false,
        }
    }

    pub fn time_limit(&self) -> u32 {
        self.countdown.total()
    }

    pub fn answered(&self) -> bool {
        self.answered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Synced,
    AwaitingNext,
    Transitioning,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Fast,
    Normal,
    Retry,
}

impl Cadence {
    pub fn default_millis(self) -> u64 {
        match self {
            Cadence::Fast => FAST_POLL_MS,
            Cadence::Normal => NORMAL_POLL_MS,
            Cadence::Retry => RETRY_POLL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Reload,
    Navigate(Route),
    ShowTransition,
    Refresh {
        answers_count: Option<u32>,
        resynced: Option<i64>,
    },
    None,
}

/// What the runner does after a poll: one action, then either the next
/// poll cadence or no further polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub action: Action,
    pub cadence: Option<Cadence>,
}

impl Directive {
    fn terminal(action: Action) -> Self {
        Self {
            action,
            cadence: None,
        }
    }

    fn next(action: Action, cadence: Cadence) -> Self {
        Self {
            action,
            cadence: Some(cadence),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.cadence.is_none()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("no active question")]
    NoActiveQuestion,
    #[error("question {0} already answered")]
    AlreadyAnswered(QuestionId),
}

/// Client-held view of a room for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    room_id: RoomId,
    podium: Route,
    phase: SyncPhase,
    question: Option<LocalQuestion>,
}

impl SyncState {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            podium: Route::Podium {
                room_id,
                player_name: None,
            },
            phase: SyncPhase::AwaitingNext,
            question: None,
        }
    }

    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        self.podium = Route::Podium {
            room_id: self.room_id,
            player_name: Some(name.into()),
        };
        self
    }

    pub fn holding(mut self, question: LocalQuestion) -> Self {
        self.question = Some(question);
        self.phase = SyncPhase::Synced;
        self
    }

    /// Initial state of a fresh session, taken from a snapshot the way the
    /// server renders the game page. Only a live question is held.
    pub fn bootstrap(self, snapshot: &PollResult) -> Self {
        if !snapshot.opens_question() {
            return self;
        }
        let Some(id) = snapshot.id else {
            return self;
        };
        let remaining = snapshot.remaining_seconds.unwrap_or(0).max(0);
        let time_limit = snapshot
            .time_limit
            .unwrap_or_else(|| u32::try_from(remaining).unwrap_or(u32::MAX));
        let mut question = LocalQuestion::new(id, time_limit, remaining);
        question.text = snapshot.text.clone();
        self.holding(question)
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn podium(&self) -> &Route {
        &self.podium
    }

    pub fn question(&self) -> Option<&LocalQuestion> {
        self.question.as_ref()
    }

    pub fn question_mut(&mut self) -> Option<&mut LocalQuestion> {
        self.question.as_mut()
    }

    /// Reserves the single answer allowed for the held question.
    pub fn claim_answer(&mut self) -> Result<QuestionId, SyncError> {
        let question = self.question.as_mut().ok_or(SyncError::NoActiveQuestion)?;
        if question.answered {
            return Err(SyncError::AlreadyAnswered(question.id));
        }
        question.answered = true;
        Ok(question.id)
    }
}

/// Applies one poll result to the session state.
pub fn reconcile(mut state: SyncState, poll: &PollResult) -> (SyncState, Directive) {
    if state.phase == SyncPhase::Finished {
        return (state, Directive::terminal(Action::None));
    }

    if poll.finished {
        state.phase = SyncPhase::Finished;
        let route = state.podium.clone();
        return (state, Directive::terminal(Action::Navigate(route)));
    }

    let held = state.question.as_ref().map(|q| q.id);
    if let Some(id) = poll.id {
        if held != Some(id) {
            if poll.opens_question() {
                // The session ends here; the reloaded one starts from scratch.
                state.phase = SyncPhase::Transitioning;
                return (state, Directive::terminal(Action::Reload));
            }
            state.phase = SyncPhase::Transitioning;
            return (state, Directive::next(Action::ShowTransition, Cadence::Fast));
        }
    }

    if poll.is_waiting() {
        state.phase = SyncPhase::AwaitingNext;
        return (state, Directive::next(Action::ShowTransition, Cadence::Fast));
    }

    if poll.next_question_soon {
        state.phase = SyncPhase::Transitioning;
        return (state, Directive::next(Action::None, Cadence::Fast));
    }

    state.phase = if state.question.is_some() {
        SyncPhase::Synced
    } else {
        SyncPhase::AwaitingNext
    };

    let resynced = match (state.question.as_mut(), poll.remaining_seconds) {
        (Some(question), Some(server)) => question
            .countdown
            .resync(server)
            .then(|| question.countdown.remaining()),
        _ => None,
    };

    let action = if poll.answers_count.is_none() && resynced.is_none() {
        Action::None
    } else {
        Action::Refresh {
            answers_count: poll.answers_count,
            resynced,
        }
    };
    (state, Directive::next(action, Cadence::Normal))
}

/// Directive after a transport failure or an unreadable body.
pub fn poll_failed(state: &SyncState) -> Directive {
    if state.phase == SyncPhase::Finished {
        return Directive::terminal(Action::None);
    }
    Directive::next(Action::None, Cadence::Retry)
}
