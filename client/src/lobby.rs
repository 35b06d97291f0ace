use sync_core::{RoomState, Route};
use tracing::{debug, info, warn};

use crate::api::RoomApi;
use crate::config::Timing;
use crate::schedule::Schedule;

/// Polls the room status by PIN until the host starts the game.
pub async fn wait_for_start<A>(api: &A, pin: &str, timing: &Timing) -> Route
where
    A: RoomApi + ?Sized,
{
    let mut next_check = Schedule::new();
    loop {
        match api.room_status(pin).await {
            Ok(status) if status.state == RoomState::Running => {
                info!(pin, "game started");
                return Route::PlayGame;
            }
            Ok(status) => debug!(pin, state = ?status.state, "game not started yet"),
            Err(err) => warn!(pin, error = %err, "status check failed"),
        }
        next_check.arm(timing.status);
        next_check.fired().await;
    }
}
