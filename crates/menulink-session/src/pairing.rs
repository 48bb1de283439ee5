//! Cooperative pairing flow.
//!
//! Pairing tears down any running session, reconnects in pairing mode and
//! then watches the controller state until the device accepts or rejects
//! the identity. The caller drives it by calling
//! [`PairingAttempt::advance`] on its own schedule; there is no internal
//! timer. Every exit path, success, rejection or timeout, stops the
//! session and clears pairing mode.

use tracing::info;

use crate::controller::{ControllerState, MenuController};
use crate::transport::{Transport, TransportError};

/// Overall pairing deadline.
const PAIRING_TIMEOUT_MS: u64 = 60_000;
/// Interval between progress reports.
const REPORT_INTERVAL_MS: u64 = 500;

/// One in-flight pairing attempt.
///
/// Create with [`begin`](PairingAttempt::begin), then call
/// [`advance`](PairingAttempt::advance) repeatedly until it returns
/// `Some(outcome)`.
pub struct PairingAttempt {
    deadline_ms: u64,
    next_report_ms: u64,
    finished: bool,
}

impl PairingAttempt {
    /// Stop any running session and reconnect in pairing mode.
    pub fn begin<T: Transport>(
        controller: &mut MenuController<T>,
        now_ms: u64,
    ) -> Result<Self, TransportError> {
        controller.stop();
        controller.set_pairing_mode(true);
        if let Err(err) = controller.start() {
            controller.set_pairing_mode(false);
            return Err(err);
        }
        info!("pairing attempt started");
        Ok(PairingAttempt {
            deadline_ms: now_ms + PAIRING_TIMEOUT_MS,
            next_report_ms: now_ms,
            finished: false,
        })
    }

    /// Drive the attempt one step.
    ///
    /// Ticks the controller, reports a human readable state string at the
    /// report interval and checks for completion. Returns `Some(true)` when
    /// the device accepted the pairing, `Some(false)` on rejection or
    /// timeout, `None` while still in progress. After completion the
    /// session is stopped and pairing mode cleared; further calls return
    /// `Some(false)`.
    pub fn advance<T: Transport>(
        &mut self,
        controller: &mut MenuController<T>,
        now_ms: u64,
        progress: &mut dyn FnMut(&str),
    ) -> Option<bool> {
        if self.finished {
            return Some(false);
        }
        controller.tick(now_ms);

        if now_ms >= self.next_report_ms {
            progress(controller.state().nice_name());
            self.next_report_ms = now_ms + REPORT_INTERVAL_MS;
        }

        let outcome = match controller.state() {
            ControllerState::PairedOk => Some(true),
            ControllerState::FailedAuthentication => Some(false),
            ControllerState::Stopped => Some(false), // cancelled externally
            _ if now_ms >= self.deadline_ms => Some(false),
            _ => None,
        };
        if let Some(result) = outcome {
            self.finish(controller, result);
        }
        outcome
    }

    fn finish<T: Transport>(&mut self, controller: &mut MenuController<T>, result: bool) {
        info!(result, "pairing attempt finished");
        controller.stop();
        controller.set_pairing_mode(false);
        self.finished = true;
    }
}
