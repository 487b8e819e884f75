//! Keep-alive task for a directly attached controller.
//!
//! A VESC releases its motor when keep-alive messages stop arriving, so
//! cancelling the heartbeat is itself a stop mechanism. [`HeartbeatGuard`]
//! aborts the task when dropped, which covers early returns and panics as
//! well as the normal teardown path.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::transport::RelayLink;
use crate::error::{ControllerError, TransportError};
use crate::vesc::encoder::encode_request;
use crate::vesc::protocol::Command;

/// Owns the heartbeat task; dropping the guard stops it.
#[derive(Debug)]
pub struct HeartbeatGuard {
    task: Option<JoinHandle<()>>,
}

impl HeartbeatGuard {
    /// Spawn a task sending `ALIVE` over `link` every `period`
    ///
    /// The task holds only a weak reference and ends on its own once the
    /// link's owner is dropped. Must be called from within a tokio runtime.
    pub fn spawn(link: RelayLink, period: Duration) -> Self {
        let frame = encode_request(&Command::Alive, None);

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match link.send(&frame).await {
                    Ok(()) => {}
                    Err(ControllerError::Transport(TransportError::Closed)) => {
                        debug!("Heartbeat link closed, stopping heartbeat");
                        break;
                    }
                    Err(e) => warn!("Failed to send heartbeat: {}", e),
                }
            }
        });

        Self { task: Some(task) }
    }

    /// Stop the heartbeat; later calls do nothing
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Heartbeat cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}
