use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sync_core::{
    Cadence, PlayerId, QuestionId, RoomId, FAST_POLL_MS, NORMAL_POLL_MS, RETRY_POLL_MS,
    STATUS_POLL_MS,
};

#[derive(Parser, Debug)]
#[command(name = "quizlive", author, version, about = "Terminal client for QuizLive rooms")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub timing: TimingArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Root of the QuizLive server.
    #[arg(long, env = "QUIZLIVE_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// CSRF token sent on every POST.
    #[arg(long, env = "QUIZLIVE_CSRF_TOKEN")]
    pub csrf_token: Option<String>,

    #[arg(long, env = "QUIZLIVE_CSRF_HEADER", default_value = "X-CSRF-TOKEN")]
    pub csrf_header: String,

    /// Per-request timeout. Requests wait indefinitely when unset.
    #[arg(long, env = "QUIZLIVE_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,
}

impl ConnectionArgs {
    pub fn csrf(&self) -> Option<Csrf> {
        self.csrf_token.as_ref().map(|token| Csrf {
            header: self.csrf_header.clone(),
            token: token.clone(),
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Args, Debug, Clone)]
pub struct TimingArgs {
    #[arg(long, env = "QUIZLIVE_POLL_MS", default_value_t = NORMAL_POLL_MS)]
    pub poll_ms: u64,

    #[arg(long, env = "QUIZLIVE_FAST_POLL_MS", default_value_t = FAST_POLL_MS)]
    pub fast_poll_ms: u64,

    #[arg(long, env = "QUIZLIVE_RETRY_MS", default_value_t = RETRY_POLL_MS)]
    pub retry_ms: u64,

    #[arg(long, env = "QUIZLIVE_STATUS_POLL_MS", default_value_t = STATUS_POLL_MS)]
    pub status_poll_ms: u64,
}

impl TimingArgs {
    pub fn timing(&self) -> Timing {
        Timing {
            normal: Duration::from_millis(self.poll_ms),
            fast: Duration::from_millis(self.fast_poll_ms),
            retry: Duration::from_millis(self.retry_ms),
            status: Duration::from_millis(self.status_poll_ms),
            ..Timing::default()
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Follow a running room from the host's control panel.
    Host {
        room_id: RoomId,
        /// Ask the server for the next question once the timer runs out.
        #[arg(long)]
        auto_advance: bool,
    },
    /// Wait in a room's lobby until the host starts the game.
    Wait { pin: String },
    /// Join the game as a player; answers are read from stdin.
    Play {
        room_id: RoomId,
        player_id: PlayerId,
        #[arg(long)]
        name: String,
        /// Wait for this room PIN to start before playing.
        #[arg(long)]
        pin: Option<String>,
    },
    /// Submit a single answer.
    Answer {
        room_id: RoomId,
        player_id: PlayerId,
        question_id: QuestionId,
        option: u8,
    },
    /// Print the room's roster.
    Players { room_id: RoomId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csrf {
    pub header: String,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub normal: Duration,
    pub fast: Duration,
    pub retry: Duration,
    pub status: Duration,
    pub tick: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            normal: Duration::from_millis(NORMAL_POLL_MS),
            fast: Duration::from_millis(FAST_POLL_MS),
            retry: Duration::from_millis(RETRY_POLL_MS),
            status: Duration::from_millis(STATUS_POLL_MS),
            tick: Duration::from_secs(1),
        }
    }
}

impl Timing {
    pub fn delay(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Fast => self.fast,
            Cadence::Normal => self.normal,
            Cadence::Retry => self.retry,
        }
    }
}
