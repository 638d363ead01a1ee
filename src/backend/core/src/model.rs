//! Core domain types for the ticket lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned ticket identifier.
pub type TicketId = i64;

/// Identifier of an appended ticket-update row.
pub type UpdateId = u64;

/// Actor recorded on updates made by the engine itself.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Note recorded on every automatic closure.
pub const CLOSURE_NOTE: &str = "closed by SYSTEM";

/// Action text recorded when an escalation-family ticket never got a service link.
pub const NO_SERVICE_ACTION: &str = "tidak jadi pasang";

// ═══════════════════════════════════════════════════════════════════════════════
// Enumerations
// ═══════════════════════════════════════════════════════════════════════════════

/// Workflow state of a ticket. Open tickets are stored as `Call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    Call,
    Closed,
}

impl TicketStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket workflow type, with the stable numeric ids used by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketType {
    Request,
    Incident,
    Survey,
    Monitoring,
    Noc,
    Escalation,
}

impl TicketType {
    /// Numeric id as stored in the ticket table.
    pub const fn id(&self) -> i32 {
        match self {
            Self::Request => 1,
            Self::Incident => 2,
            Self::Survey => 5,
            Self::Monitoring => 6,
            Self::Noc => 7,
            Self::Escalation => 10,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Self::Request),
            2 => Some(Self::Incident),
            5 => Some(Self::Survey),
            6 => Some(Self::Monitoring),
            7 => Some(Self::Noc),
            10 => Some(Self::Escalation),
            _ => None,
        }
    }
}

/// Function credited with resolving a ticket on closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolver {
    Helpdesk,
    Engineer,
}

impl Resolver {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Helpdesk => "helpdesk",
            Self::Engineer => "engineer",
        }
    }
}

impl fmt::Display for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scan categories. Each variant is one independent reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    /// Request/incident tickets with an active assignment.
    Assigned,
    /// Request/incident tickets still sitting in the unassigned queue.
    Helpdesk,
    Escalation,
    Noc,
    Survey,
    Monitoring,
}

impl TicketCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Helpdesk => "helpdesk",
            Self::Escalation => "escalation",
            Self::Noc => "noc",
            Self::Survey => "survey",
            Self::Monitoring => "monitoring",
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scan & closure records
// ═══════════════════════════════════════════════════════════════════════════════

/// One row from a stale-ticket scan: a pending update of an open ticket.
///
/// A ticket with several pending updates produces several rows; the scan
/// orders them latest-first per ticket, and the dedup guard keeps only the
/// first one seen.
#[derive(Debug, Clone)]
pub struct StaleCandidate {
    pub ticket_id: TicketId,
    pub last_update: DateTime<Utc>,
    pub ticket_type: TicketType,
    pub customer_id: Option<i64>,
    pub assigned_seq: i32,
    /// Linked service circuit, when the ticket belongs to an active service.
    pub circuit_id: Option<i64>,
    /// Cross-system contact identifier forwarded to the T2T sync call.
    pub external_contact_id: Option<String>,
    /// Job-title label used as the feedback template parameter.
    pub job_title: Option<String>,
}

/// Department and job title of the person a ticket is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub dept_id: String,
    pub job_title: Option<String>,
}

/// Field-level delta recorded alongside a ticket update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// The full write set for closing one ticket: the appended update row, its
/// derived change rows, and the ticket summary mutation. The store applies
/// all of it as one transactional unit.
#[derive(Debug, Clone)]
pub struct ClosurePlan {
    pub ticket_id: TicketId,
    pub closed_at: DateTime<Utc>,
    pub assigned_seq: i32,
    /// Action text on the update row; only the escalation-family passes set one.
    pub action: Option<String>,
    /// Resolver credited on the ticket; `None` is stored as an empty label.
    pub solved_by: Option<Resolver>,
    pub visited: bool,
}

impl ClosurePlan {
    /// Label written to the ticket's solver column.
    pub fn solved_by_label(&self) -> &'static str {
        self.solved_by.map_or("", |resolver| resolver.as_str())
    }

    /// Change rows recorded under the closing update: always the status
    /// transition, plus the solver attribution when a resolver applies.
    pub fn changes(&self) -> Vec<FieldChange> {
        let mut changes = vec![FieldChange {
            field: "Status".to_string(),
            old_value: TicketStatus::Call.as_str().to_string(),
            new_value: TicketStatus::Closed.as_str().to_string(),
        }];
        if let Some(resolver) = self.solved_by {
            changes.push(FieldChange {
                field: "SolvedBy".to_string(),
                old_value: String::new(),
                new_value: resolver.as_str().to_string(),
            });
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_type_ids_round_trip() {
        for ty in [
            TicketType::Request,
            TicketType::Incident,
            TicketType::Survey,
            TicketType::Monitoring,
            TicketType::Noc,
            TicketType::Escalation,
        ] {
            assert_eq!(TicketType::from_id(ty.id()), Some(ty));
        }
        assert_eq!(TicketType::from_id(3), None);
    }

    #[test]
    fn closure_plan_records_status_transition() {
        let plan = ClosurePlan {
            ticket_id: 7,
            closed_at: Utc::now(),
            assigned_seq: 0,
            action: Some(NO_SERVICE_ACTION.to_string()),
            solved_by: None,
            visited: true,
        };

        let changes = plan.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "Status");
        assert_eq!(changes[0].old_value, "Call");
        assert_eq!(changes[0].new_value, "Closed");
        assert_eq!(plan.solved_by_label(), "");
    }

    #[test]
    fn closure_plan_records_solver_attribution() {
        let plan = ClosurePlan {
            ticket_id: 7,
            closed_at: Utc::now(),
            assigned_seq: 2,
            action: None,
            solved_by: Some(Resolver::Engineer),
            visited: true,
        };

        let changes = plan.changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].field, "SolvedBy");
        assert_eq!(changes[1].old_value, "");
        assert_eq!(changes[1].new_value, "engineer");
        assert_eq!(plan.solved_by_label(), "engineer");
    }
}
