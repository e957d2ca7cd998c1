//! Translation of remote verification rows into [`VerificationOutcome`].
//!
//! The verify procedure has shipped three row shapes. They are resolved by
//! field presence into [`RawVerificationRow`], and nothing past this module
//! sees a revision-specific shape.
//!
//! ```text
//! earliest:  ok, usuario_id, correo, nombre_completo, consumido_en
//! reason:    + reason
//! latest:    + invitacion_tipo
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

const FIELD_ACCEPTED: &str = "ok";
const FIELD_REASON: &str = "reason";
const FIELD_SUBJECT_ID: &str = "usuario_id";
const FIELD_SUBJECT_EMAIL: &str = "correo";
const FIELD_SUBJECT_NAME: &str = "nombre_completo";
const FIELD_CONSUMED_AT: &str = "consumido_en";
const FIELD_INVITATION: &str = "invitacion_tipo";

/// Columns common to every revision, still raw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseRow {
    pub accepted: Option<Value>,
    pub subject_id: Option<Value>,
    pub subject_email: Option<Value>,
    pub subject_name: Option<Value>,
    pub consumed_at: Option<Value>,
}

/// A verification row as returned by one of the known revisions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub enum RawVerificationRow {
    Initial(BaseRow),
    WithReason {
        base: BaseRow,
        reason: Option<Value>,
    },
    WithInvitation {
        base: BaseRow,
        reason: Option<Value>,
        invitation_kind: Option<Value>,
    },
}

impl From<Map<String, Value>> for RawVerificationRow {
    fn from(mut map: Map<String, Value>) -> Self {
        let has_reason = map.contains_key(FIELD_REASON);
        let has_invitation = map.contains_key(FIELD_INVITATION);
        let mut take = |key: &str| map.remove(key).filter(|v| !v.is_null());

        let base = BaseRow {
            accepted: take(FIELD_ACCEPTED),
            subject_id: take(FIELD_SUBJECT_ID),
            subject_email: take(FIELD_SUBJECT_EMAIL),
            subject_name: take(FIELD_SUBJECT_NAME),
            consumed_at: take(FIELD_CONSUMED_AT),
        };
        let reason = take(FIELD_REASON);

        if has_invitation {
            Self::WithInvitation {
                base,
                reason,
                invitation_kind: take(FIELD_INVITATION),
            }
        } else if has_reason {
            Self::WithReason { base, reason }
        } else {
            Self::Initial(base)
        }
    }
}

impl RawVerificationRow {
    fn base(&self) -> &BaseRow {
        match self {
            Self::Initial(base) => base,
            Self::WithReason { base, .. } | Self::WithInvitation { base, .. } => base,
        }
    }

    fn reason(&self) -> Option<&Value> {
        match self {
            Self::Initial(_) => None,
            Self::WithReason { reason, .. } | Self::WithInvitation { reason, .. } => {
                reason.as_ref()
            }
        }
    }

    fn invitation_kind(&self) -> Option<&Value> {
        match self {
            Self::WithInvitation {
                invitation_kind, ..
            } => invitation_kind.as_ref(),
            _ => None,
        }
    }
}

/// Why the remote accepted or denied a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    Ok,
    AlreadyUsed,
    NotFound,
    Unspecified,
}

impl ReasonCode {
    pub fn from_text(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "ok" => Self::Ok,
            "already_used" => Self::AlreadyUsed,
            "not_found" => Self::NotFound,
            _ => Self::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::AlreadyUsed => "already_used",
            Self::NotFound => "not_found",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Invitation category attached to a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationKind {
    Single,
    Double,
    /// Unknown label, lower-cased and kept verbatim.
    Other(String),
    Unspecified,
}

impl InvitationKind {
    pub fn from_text(raw: &str) -> Self {
        let value = raw.trim().to_lowercase();
        if value.is_empty() {
            Self::Unspecified
        } else if value.contains("doble") || value == "2" {
            Self::Double
        } else if value.contains("sencilla")
            || value == "simple"
            || value == "single"
            || value == "1"
        {
            Self::Single
        } else {
            Self::Other(value)
        }
    }

    /// Operator-facing label, `None` when unspecified.
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Single => Some("SINGLE".to_string()),
            Self::Double => Some("DOUBLE".to_string()),
            Self::Other(raw) => Some(raw.to_uppercase()),
            Self::Unspecified => None,
        }
    }
}

/// Identifying details of the code's holder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Canonical result of one verification round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub accepted: bool,
    pub reason: ReasonCode,
    pub subject: Subject,
    pub consumed_at: Option<DateTime<Utc>>,
    pub invitation: InvitationKind,
}

impl VerificationOutcome {
    /// The outcome for an empty result set.
    pub fn empty() -> Self {
        Self {
            accepted: false,
            reason: ReasonCode::Unspecified,
            subject: Subject::default(),
            consumed_at: None,
            invitation: InvitationKind::Unspecified,
        }
    }

    /// One-line operator message.
    pub fn headline(&self) -> String {
        if self.accepted {
            let invitation = self
                .invitation
                .label()
                .unwrap_or_else(|| "NOT AVAILABLE".to_string());
            return format!("ACCESS GRANTED - Invitation: {invitation}");
        }
        match self.reason {
            ReasonCode::AlreadyUsed => match self.invitation.label() {
                Some(label) => format!("ACCESS DENIED: CODE ALREADY USED - Invitation: {label}"),
                None => "ACCESS DENIED: CODE ALREADY USED".to_string(),
            },
            ReasonCode::NotFound => "ACCESS DENIED: CODE DOES NOT EXIST".to_string(),
            ReasonCode::Ok | ReasonCode::Unspecified => "ACCESS DENIED: INVALID CODE".to_string(),
        }
    }

    /// Whether holder details should be shown alongside the headline.
    pub fn shows_subject(&self) -> bool {
        self.accepted || self.reason == ReasonCode::AlreadyUsed
    }

    /// Label for metrics and logs.
    pub fn result_label(&self) -> &'static str {
        if self.accepted {
            "accepted"
        } else {
            match self.reason {
                ReasonCode::AlreadyUsed => "already_used",
                ReasonCode::NotFound => "not_found",
                ReasonCode::Ok | ReasonCode::Unspecified => "denied",
            }
        }
    }
}

/// Boolean coercion for the `accepted` column. Only `true`, the number 1,
/// `"t"` and `"true"` are true; every other value, including absence, is false.
pub fn coerce_accepted(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => matches!(s.as_str(), "t" | "true"),
        _ => false,
    }
}

/// Stringify a scalar column; arrays and objects are dropped.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = text(value)?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(value = %raw, error = %e, "Ignoring unparseable consumption timestamp");
            None
        }
    }
}

/// Normalize one row.
pub fn normalize_row(row: &RawVerificationRow) -> VerificationOutcome {
    let base = row.base();
    VerificationOutcome {
        accepted: coerce_accepted(base.accepted.as_ref()),
        reason: text(row.reason())
            .map(|r| ReasonCode::from_text(&r))
            .unwrap_or(ReasonCode::Unspecified),
        subject: Subject {
            id: text(base.subject_id.as_ref()),
            email: text(base.subject_email.as_ref()),
            name: text(base.subject_name.as_ref()),
        },
        consumed_at: timestamp(base.consumed_at.as_ref()),
        invitation: text(row.invitation_kind())
            .map(|k| InvitationKind::from_text(&k))
            .unwrap_or(InvitationKind::Unspecified),
    }
}

/// Normalize a result set: the first row wins, no row means a generic denial.
pub fn normalize_rows(rows: &[RawVerificationRow]) -> VerificationOutcome {
    rows.first()
        .map(normalize_row)
        .unwrap_or_else(VerificationOutcome::empty)
}
