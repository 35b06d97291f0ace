use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use sync_core::{
    AnswerOutcome, AnswerSubmission, NextQuestion, PlayerSummary, PollResult, QuestionId,
    QuestionState, RoomId, RoomState, RoomStatus,
};
use tokio::time::Instant;

use crate::api::RoomApi;
use crate::error::ClientError;

pub enum Scripted {
    Poll(PollResult),
    Fail,
}

/// In-memory server. Polls are served in order; once the script runs out
/// the room reports finished so every session ends.
#[derive(Default)]
pub struct ScriptedApi {
    polls: Mutex<VecDeque<Scripted>>,
    pub poll_times: Mutex<Vec<Instant>>,
    statuses: Mutex<VecDeque<Option<RoomState>>>,
    pub status_times: Mutex<Vec<Instant>>,
    next: Mutex<NextQuestion>,
    pub next_calls: Mutex<u32>,
    pub submissions: Mutex<Vec<AnswerSubmission>>,
    reject_answers: bool,
}

impl ScriptedApi {
    pub fn polls(script: Vec<Scripted>) -> Self {
        Self {
            polls: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn statuses(script: Vec<Option<RoomState>>) -> Self {
        Self {
            statuses: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn with_next(self, next: NextQuestion) -> Self {
        *self.next.lock().unwrap() = next;
        self
    }

    pub fn rejecting_answers(mut self) -> Self {
        self.reject_answers = true;
        self
    }

    pub fn poll_gaps(&self) -> Vec<u128> {
        gaps(&self.poll_times.lock().unwrap())
    }

    pub fn poll_count(&self) -> usize {
        self.poll_times.lock().unwrap().len()
    }
}

pub fn gaps(times: &[Instant]) -> Vec<u128> {
    times
        .windows(2)
        .map(|w| (w[1] - w[0]).as_millis())
        .collect()
}

pub fn active(id: QuestionId) -> PollResult {
    PollResult {
        id: Some(id),
        state: Some(QuestionState::Active),
        is_open: true,
        ..Default::default()
    }
}

pub fn finished() -> PollResult {
    PollResult {
        finished: true,
        state: Some(QuestionState::Finished),
        ..Default::default()
    }
}

pub fn waiting() -> PollResult {
    PollResult {
        state: Some(QuestionState::Waiting),
        ..Default::default()
    }
}

#[async_trait]
impl RoomApi for ScriptedApi {
    async fn current_question(&self, _room_id: RoomId) -> Result<PollResult, ClientError> {
        self.poll_times.lock().unwrap().push(Instant::now());
        match self.polls.lock().unwrap().pop_front() {
            Some(Scripted::Poll(poll)) => Ok(poll),
            Some(Scripted::Fail) => Err(ClientError::Status(StatusCode::BAD_GATEWAY)),
            None => Ok(finished()),
        }
    }

    async fn room_status(&self, pin: &str) -> Result<RoomStatus, ClientError> {
        self.status_times.lock().unwrap().push(Instant::now());
        match self.statuses.lock().unwrap().pop_front() {
            Some(Some(state)) => Ok(RoomStatus {
                state,
                pin: Some(pin.to_string()),
            }),
            Some(None) => Err(ClientError::Status(StatusCode::SERVICE_UNAVAILABLE)),
            None => Ok(RoomStatus {
                state: RoomState::Running,
                pin: Some(pin.to_string()),
            }),
        }
    }

    async fn players(&self, _room_id: RoomId) -> Result<Vec<PlayerSummary>, ClientError> {
        Ok(Vec::new())
    }

    async fn submit_answer(
        &self,
        _room_id: RoomId,
        submission: &AnswerSubmission,
    ) -> Result<AnswerOutcome, ClientError> {
        self.submissions.lock().unwrap().push(submission.clone());
        if self.reject_answers {
            return Err(ClientError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(AnswerOutcome {
            correct: submission.selected_option == 2,
            points: if submission.selected_option == 2 { 100 } else { 0 },
            total_score: 100,
        })
    }

    async fn next_question(&self, _room_id: RoomId) -> Result<NextQuestion, ClientError> {
        *self.next_calls.lock().unwrap() += 1;
        Ok(self.next.lock().unwrap().clone())
    }
}
