//! Code verification state machine.
//!
//! ```text
//!            submit                 remote ok
//!   Idle ─────────────▶ Submitting ───────────▶ Accepted | Denied
//!    ▲  │                     │
//!    │  │ guard fails         │ remote failure
//!    │  ▼                     ▼
//!    │  Denied | Errored    Errored
//!    │          │
//!    └──reset───┘   (every terminal state is locked until reset)
//! ```
//!
//! Guards run in a fixed order before any remote call: session identity,
//! rate limiter, code grammar. A token is charged before the grammar check,
//! so a malformed code still costs an attempt.

use std::sync::Arc;

use uuid::Uuid;

use crate::gate::code::{self, AccessCode, CODE_LEN};
use crate::gate::error::{GateError, InputField};
use crate::gate::outcome::{normalize_rows, RawVerificationRow, VerificationOutcome};
use crate::gate::session::SessionStore;
use crate::observability::metrics;
use crate::remote::{RemoteAction, RemoteAuthority, RemoteError};
use crate::security::RateLimiter;
use crate::storage::StoreError;

/// Where the workflow stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Waiting on the remote for the named attempt.
    Submitting { attempt_id: Uuid },
    Accepted(VerificationOutcome),
    /// Rate limited, malformed, or rejected by the remote.
    Denied(GateError),
    /// Expired session or remote unavailable.
    Errored(GateError),
}

impl Phase {
    /// Terminal phases lock input until reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::Denied(_) | Self::Errored(_))
    }

    /// Operator-facing message for terminal phases.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Idle | Self::Submitting { .. } => None,
            Self::Accepted(outcome) => Some(outcome.headline()),
            Self::Denied(err) | Self::Errored(err) => Some(err.user_message()),
        }
    }

    /// The normalized remote outcome, when the remote answered.
    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        match self {
            Self::Accepted(outcome) => Some(outcome),
            Self::Denied(GateError::RemoteRejected(outcome)) => Some(outcome),
            _ => None,
        }
    }
}

/// A submission that passed every local guard and awaits the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCheck {
    pub attempt_id: Uuid,
    pub code: AccessCode,
    pub operator_email: String,
}

/// One operator's verification screen.
pub struct VerificationWorkflow<R> {
    remote: Arc<R>,
    limiter: RateLimiter,
    session: SessionStore,
    phase: Phase,
    input: String,
}

impl<R: RemoteAuthority> VerificationWorkflow<R> {
    pub fn new(remote: Arc<R>, limiter: RateLimiter, session: SessionStore) -> Self {
        Self {
            remote,
            limiter,
            session,
            phase: Phase::Idle,
            input: String::new(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The candidate code as entered.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Input is accepted only while idle.
    pub fn input_enabled(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// True between a completed attempt and the next reset.
    pub fn is_locked(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Whether a submit control should be offered.
    pub fn can_submit(&self) -> bool {
        self.input_enabled() && self.input.len() == CODE_LEN
    }

    /// Replace the candidate code, filtered as at entry time. Ignored unless
    /// input is enabled.
    pub fn set_input(&mut self, raw: &str) -> bool {
        if !self.input_enabled() {
            return false;
        }
        self.input = code::filter_input(raw);
        true
    }

    /// Run the local guards and move to `Submitting`.
    ///
    /// Returns `None` when nothing should be sent: either the workflow is not
    /// idle (repeated activation) or a guard put it in a terminal phase.
    pub fn begin_submit(&mut self) -> Option<PendingCheck> {
        if self.phase != Phase::Idle {
            tracing::debug!(phase = ?self.phase, "Ignoring submit outside idle phase");
            return None;
        }

        let attempt_id = Uuid::new_v4();

        let Some(identity) = self.session.current() else {
            tracing::warn!(attempt_id = %attempt_id, "Submit without operator session");
            self.finish(Phase::Errored(GateError::ExpiredSession));
            return None;
        };

        if !self.limiter.try_consume(1) {
            self.finish(Phase::Denied(GateError::RateLimited));
            return None;
        }

        let candidate = code::normalize(&self.input);
        let code = match code::validate(&candidate) {
            Ok(code) => code,
            Err(_) => {
                tracing::info!(attempt_id = %attempt_id, "Rejected malformed access code");
                self.finish(Phase::Denied(GateError::MalformedInput(InputField::Code)));
                return None;
            }
        };

        tracing::info!(
            attempt_id = %attempt_id,
            operator = %identity.email(),
            "Submitting access code"
        );
        self.phase = Phase::Submitting { attempt_id };
        Some(PendingCheck {
            attempt_id,
            code,
            operator_email: identity.email().to_string(),
        })
    }

    /// Apply the remote result of a pending check. Ignored unless that exact
    /// attempt is in flight.
    pub fn complete(
        &mut self,
        pending: &PendingCheck,
        result: Result<Vec<RawVerificationRow>, RemoteError>,
    ) -> &Phase {
        let in_flight = matches!(
            self.phase,
            Phase::Submitting { attempt_id } if attempt_id == pending.attempt_id
        );
        if !in_flight {
            tracing::debug!(attempt_id = %pending.attempt_id, "Ignoring completion for an attempt not in flight");
            return &self.phase;
        }

        let next = match result {
            Ok(rows) => {
                let outcome = normalize_rows(&rows);
                if outcome.accepted {
                    Phase::Accepted(outcome)
                } else {
                    Phase::Denied(GateError::RemoteRejected(Box::new(outcome)))
                }
            }
            Err(e) => {
                tracing::error!(attempt_id = %pending.attempt_id, error = %e, "Verification call failed");
                Phase::Errored(GateError::remote(RemoteAction::Verify, e))
            }
        };

        tracing::info!(
            attempt_id = %pending.attempt_id,
            result = %result_label(&next),
            "Verification finished"
        );
        self.input.clear();
        self.finish(next);
        &self.phase
    }

    /// Full cycle: guards, remote call, normalization.
    pub async fn submit(&mut self) -> &Phase {
        let Some(pending) = self.begin_submit() else {
            return &self.phase;
        };
        let result = self
            .remote
            .verify_code(&pending.code, &pending.operator_email)
            .await;
        self.complete(&pending, result)
    }

    /// Leave a terminal phase: clears the code and the last outcome.
    pub fn reset(&mut self) -> bool {
        if !self.phase.is_terminal() {
            return false;
        }
        self.phase = Phase::Idle;
        self.input.clear();
        true
    }

    /// Clear the operator identity and discard the workflow.
    pub fn logout(self) -> Result<(), StoreError> {
        self.session.clear()
    }

    fn finish(&mut self, phase: Phase) {
        metrics::record_verification(result_label(&phase));
        self.phase = phase;
    }
}

fn result_label(phase: &Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Submitting { .. } => "submitting",
        Phase::Accepted(_) => "accepted",
        Phase::Denied(err) | Phase::Errored(err) => err.result_label(),
    }
}

impl<R> std::fmt::Debug for VerificationWorkflow<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationWorkflow")
            .field("phase", &self.phase)
            .field("input", &self.input)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
