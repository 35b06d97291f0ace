use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use sync_core::{
    AnswerOutcome, AnswerSubmission, NextQuestion, PlayerSummary, PollResult, RoomId, RoomStatus,
    Route,
};
use tracing::debug;

use crate::config::{ConnectionArgs, Csrf};
use crate::error::ClientError;

/// The server endpoints a room client talks to.
#[async_trait]
pub trait RoomApi: Send + Sync {
    async fn current_question(&self, room_id: RoomId) -> Result<PollResult, ClientError>;

    async fn room_status(&self, pin: &str) -> Result<RoomStatus, ClientError>;

    async fn players(&self, room_id: RoomId) -> Result<Vec<PlayerSummary>, ClientError>;

    async fn submit_answer(
        &self,
        room_id: RoomId,
        submission: &AnswerSubmission,
    ) -> Result<AnswerOutcome, ClientError>;

    async fn next_question(&self, room_id: RoomId) -> Result<NextQuestion, ClientError>;
}

#[derive(Clone, Debug)]
pub struct HttpRoomApi {
    client: Client,
    base_url: String,
    csrf: Option<Csrf>,
}

impl HttpRoomApi {
    pub fn new(base_url: impl Into<String>, csrf: Option<Csrf>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            csrf,
        }
    }

    pub fn from_args(args: &ConnectionArgs) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = args.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: args.base_url.clone(),
            csrf: args.csrf(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/rooms/{path}", self.base_url.trim_end_matches('/'))
    }

    /// POST with the CSRF header attached when one is configured.
    fn post(&self, url: String) -> RequestBuilder {
        let request = self.client.post(url);
        match &self.csrf {
            Some(csrf) => request.header(csrf.header.as_str(), csrf.token.as_str()),
            None => request,
        }
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RoomApi for HttpRoomApi {
    async fn current_question(&self, room_id: RoomId) -> Result<PollResult, ClientError> {
        let url = self.endpoint(&format!("{room_id}/current-question"));
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn room_status(&self, pin: &str) -> Result<RoomStatus, ClientError> {
        let url = self.endpoint(&format!("{pin}/status"));
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn players(&self, room_id: RoomId) -> Result<Vec<PlayerSummary>, ClientError> {
        let url = self.endpoint(&format!("{room_id}/players"));
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn submit_answer(
        &self,
        room_id: RoomId,
        submission: &AnswerSubmission,
    ) -> Result<AnswerOutcome, ClientError> {
        debug!(room_id, question_id = submission.question_id, "submitting answer");
        let url = self.endpoint(&format!("{room_id}/submit-answer"));
        let response = self.post(url).json(submission).send().await?;
        Self::read(response).await
    }

    async fn next_question(&self, room_id: RoomId) -> Result<NextQuestion, ClientError> {
        let url = self.endpoint(&format!("{room_id}/next-question"));
        let response = self
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Self::read(response).await
    }
}

/// Absolute address of a navigation target.
pub fn route_url(base_url: &str, route: &Route) -> String {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), route.path());
    let Ok(mut url) = Url::parse(&raw) else {
        return raw;
    };
    if let Route::Podium {
        player_name: Some(name),
        ..
    } = route
    {
        url.query_pairs_mut().append_pair("playerName", name);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use sync_core::{QuestionState, RoomState};

    #[derive(Clone, Default)]
    struct Seen {
        csrf: Arc<Mutex<Vec<Option<String>>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    impl Seen {
        fn record(&self, headers: &HeaderMap, body: Option<Value>) {
            let token = headers
                .get("x-csrf-token")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            self.csrf.lock().unwrap().push(token);
            if let Some(body) = body {
                self.bodies.lock().unwrap().push(body);
            }
        }
    }

    async fn current_question(Path(room_id): Path<i64>) -> AxumResponse {
        match room_id {
            1 => Json(json!({
                "id": 11,
                "text": "Largest planet?",
                "isOpen": true,
                "answersCount": 2,
                "finished": false,
                "state": "ACTIVE",
                "remainingSeconds": 14
            }))
            .into_response(),
            2 => (StatusCode::OK, "<html>login</html>").into_response(),
            _ => (StatusCode::NOT_FOUND, "room not found").into_response(),
        }
    }

    async fn status(Path(pin): Path<String>) -> Json<Value> {
        Json(json!({ "state": "RUNNING", "pin": pin }))
    }

    async fn players(Path(_room_id): Path<i64>) -> Json<Value> {
        Json(json!([
            { "id": 1, "name": "ana", "score": 300, "joinedAt": "2024-01-01T00:00:00" },
            { "id": 2, "name": "luis", "score": 0 }
        ]))
    }

    async fn submit_answer(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> AxumResponse {
        let rejected = body["selectedOption"] == 9;
        seen.record(&headers, Some(body));
        if rejected {
            return (StatusCode::INTERNAL_SERVER_ERROR, "question closed").into_response();
        }
        Json(json!({ "correct": true, "points": 100, "totalScore": 300 })).into_response()
    }

    async fn next_question(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
        seen.record(&headers, None);
        Json(json!({ "finished": false, "questionId": 12 }))
    }

    async fn serve(seen: Seen) -> String {
        let router = Router::new()
            .route("/api/rooms/:room_id/current-question", get(current_question))
            .route("/api/rooms/:room_id/status", get(status))
            .route("/api/rooms/:room_id/players", get(players))
            .route("/api/rooms/:room_id/submit-answer", post(submit_answer))
            .route("/api/rooms/:room_id/next-question", post(next_question))
            .with_state(seen);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn csrf() -> Option<Csrf> {
        Some(Csrf {
            header: "X-CSRF-TOKEN".into(),
            token: "tok-123".into(),
        })
    }

    #[tokio::test]
    async fn current_question_decodes_poll_result() {
        let base = serve(Seen::default()).await;
        let api = HttpRoomApi::new(base, None);

        let poll = api.current_question(1).await.unwrap();
        assert_eq!(poll.id, Some(11));
        assert_eq!(poll.state, Some(QuestionState::Active));
        assert_eq!(poll.answers_count, Some(2));
        assert_eq!(poll.remaining_seconds, Some(14));
        assert!(poll.opens_question());
    }

    #[tokio::test]
    async fn unreadable_and_failed_polls_are_errors() {
        let base = serve(Seen::default()).await;
        let api = HttpRoomApi::new(base, None);

        let err = api.current_question(2).await.unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));

        let err = api.current_question(404).await.unwrap_err();
        assert!(matches!(err, ClientError::Status(s) if s.as_u16() == 404));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let api = HttpRoomApi::new(format!("http://{addr}"), None);

        let err = api.current_question(1).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn status_and_roster_decode() {
        let base = serve(Seen::default()).await;
        let api = HttpRoomApi::new(base, None);

        let status = api.room_status("4821").await.unwrap();
        assert_eq!(status.state, RoomState::Running);
        assert_eq!(status.pin.as_deref(), Some("4821"));

        let roster = api.players(1).await.unwrap();
        let names: Vec<&str> = roster.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ana", "luis"]);
        assert_eq!(roster[0].score, Some(300));
    }

    #[tokio::test]
    async fn posts_carry_csrf_header() {
        let seen = Seen::default();
        let base = serve(seen.clone()).await;
        let api = HttpRoomApi::new(base, csrf());

        let outcome = api
            .submit_answer(
                1,
                &AnswerSubmission {
                    player_id: 5,
                    question_id: 11,
                    selected_option: 2,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AnswerOutcome {
                correct: true,
                points: 100,
                total_score: 300
            }
        );

        let next = api.next_question(1).await.unwrap();
        assert!(!next.finished);
        assert_eq!(next.question_id, Some(12));

        let tokens = seen.csrf.lock().unwrap().clone();
        assert_eq!(tokens, vec![Some("tok-123".into()), Some("tok-123".into())]);
        let bodies = seen.bodies.lock().unwrap().clone();
        assert_eq!(
            bodies,
            vec![json!({ "playerId": 5, "questionId": 11, "selectedOption": 2 })]
        );
    }

    #[tokio::test]
    async fn posts_without_csrf_send_no_header() {
        let seen = Seen::default();
        let base = serve(seen.clone()).await;
        let api = HttpRoomApi::new(base, None);

        api.next_question(1).await.unwrap();
        assert_eq!(seen.csrf.lock().unwrap().clone(), vec![None]);
    }

    #[tokio::test]
    async fn rejected_submission_reports_status() {
        let base = serve(Seen::default()).await;
        let api = HttpRoomApi::new(base, csrf());

        let err = api
            .submit_answer(
                1,
                &AnswerSubmission {
                    player_id: 5,
                    question_id: 11,
                    selected_option: 9,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status(s) if s.is_server_error()));
    }

    #[test]
    fn route_urls_are_absolute() {
        assert_eq!(
            route_url("http://quiz.local:8080/", &Route::PlayGame),
            "http://quiz.local:8080/play/game"
        );
        assert_eq!(
            route_url(
                "http://quiz.local:8080",
                &Route::Podium {
                    room_id: 3,
                    player_name: Some("Ana María".into())
                }
            ),
            "http://quiz.local:8080/rooms/3/podium?playerName=Ana+Mar%C3%ADa"
        );
    }
}
