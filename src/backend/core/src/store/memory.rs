//! In-memory ticket store for testing and development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::{
    ClosurePlan, Routing, StaleCandidate, TicketId, TicketStatus, TicketType, UpdateId,
    CLOSURE_NOTE, SYSTEM_ACTOR,
};

use super::{AssignmentFilter, ScanFilter, TicketStore};

/// One ticket summary row.
#[derive(Debug, Clone)]
pub struct TicketRecord {
    pub id: TicketId,
    pub ticket_type: TicketType,
    pub status: TicketStatus,
    pub branch_id: String,
    pub customer_id: Option<i64>,
    pub assigned_seq: i32,
    pub circuit_id: Option<i64>,
    pub external_contact_id: Option<String>,
    /// Job-title label surfaced by the scan (joined from the employee row
    /// in the MySQL backend).
    pub job_title: Option<String>,
    pub solved_by: String,
    pub visited: bool,
}

/// Snapshot of the update row a closure appended, for assertions.
#[derive(Debug, Clone)]
pub struct ClosureAudit {
    pub update_id: UpdateId,
    pub actor: String,
    pub action: String,
    pub note: String,
    pub assigned_seq: i32,
}

#[derive(Debug, Clone)]
struct UpdateRecord {
    id: UpdateId,
    ticket_id: TicketId,
    updated_at: DateTime<Utc>,
    actor: String,
    action: String,
    note: String,
    assigned_seq: i32,
    status: TicketStatus,
    /// Routing of the human actor, when one made this update.
    routing: Option<Routing>,
}

#[derive(Debug, Clone)]
struct ChangeRecord {
    update_id: UpdateId,
    field: String,
    old_value: String,
    new_value: String,
}

#[derive(Debug, Clone)]
struct PicRecord {
    ticket_id: TicketId,
    assigned_seq: i32,
    routing: Routing,
}

#[derive(Default)]
struct State {
    tickets: HashMap<TicketId, TicketRecord>,
    updates: Vec<UpdateRecord>,
    changes: Vec<ChangeRecord>,
    pics: Vec<PicRecord>,
    contacts: HashMap<TicketId, Vec<String>>,
    survey_outcomes: HashMap<TicketId, bool>,
    next_update_id: UpdateId,
}

/// In-memory backend mirroring the MySQL table relationships.
pub struct InMemoryTicketStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                next_update_id: 1,
                ..State::default()
            })),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn insert_ticket(&self, ticket: TicketRecord) {
        self.state.write().await.tickets.insert(ticket.id, ticket);
    }

    /// Append a pending (human-made) update row; returns its id.
    pub async fn push_update(
        &self,
        ticket_id: TicketId,
        updated_at: DateTime<Utc>,
        routing: Option<Routing>,
    ) -> UpdateId {
        let mut state = self.state.write().await;
        let id = state.next_update_id;
        state.next_update_id += 1;
        let assigned_seq = state
            .tickets
            .get(&ticket_id)
            .map_or(0, |ticket| ticket.assigned_seq);
        state.updates.push(UpdateRecord {
            id,
            ticket_id,
            updated_at,
            actor: routing
                .as_ref()
                .map_or_else(|| "agent".to_string(), |r| format!("agent-{}", r.dept_id)),
            action: String::new(),
            note: String::new(),
            assigned_seq,
            status: TicketStatus::Call,
            routing,
        });
        id
    }

    pub async fn assign_pic(&self, ticket_id: TicketId, assigned_seq: i32, routing: Routing) {
        self.state.write().await.pics.push(PicRecord {
            ticket_id,
            assigned_seq,
            routing,
        });
    }

    pub async fn add_contact(&self, ticket_id: TicketId, contact_no: &str) {
        self.state
            .write()
            .await
            .contacts
            .entry(ticket_id)
            .or_default()
            .push(contact_no.to_string());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn ticket(&self, ticket_id: TicketId) -> Option<TicketRecord> {
        self.state.read().await.tickets.get(&ticket_id).cloned()
    }

    /// Number of update rows on record for the ticket.
    pub async fn update_count(&self, ticket_id: TicketId) -> usize {
        self.state
            .read()
            .await
            .updates
            .iter()
            .filter(|update| update.ticket_id == ticket_id)
            .count()
    }

    pub async fn total_update_count(&self) -> usize {
        self.state.read().await.updates.len()
    }

    pub async fn total_change_count(&self) -> usize {
        self.state.read().await.changes.len()
    }

    /// `(field, old, new)` rows recorded under one update id.
    pub async fn changes_for(&self, update_id: UpdateId) -> Vec<(String, String, String)> {
        self.state
            .read()
            .await
            .changes
            .iter()
            .filter(|change| change.update_id == update_id)
            .map(|change| {
                (
                    change.field.clone(),
                    change.old_value.clone(),
                    change.new_value.clone(),
                )
            })
            .collect()
    }

    /// The closure update appended by the engine, if the ticket was closed.
    pub async fn closure_update(&self, ticket_id: TicketId) -> Option<ClosureAudit> {
        self.state
            .read()
            .await
            .updates
            .iter()
            .filter(|update| {
                update.ticket_id == ticket_id && update.status == TicketStatus::Closed
            })
            .max_by_key(|update| update.id)
            .map(|update| ClosureAudit {
                update_id: update.id,
                actor: update.actor.clone(),
                action: update.action.clone(),
                note: update.note.clone(),
                assigned_seq: update.assigned_seq,
            })
    }

    pub async fn survey_outcome(&self, ticket_id: TicketId) -> Option<bool> {
        self.state
            .read()
            .await
            .survey_outcomes
            .get(&ticket_id)
            .copied()
    }
}

impl Default for InMemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn stale_candidates(&self, filter: &ScanFilter) -> Result<Vec<StaleCandidate>> {
        let state = self.state.read().await;
        let mut rows: Vec<StaleCandidate> = state
            .updates
            .iter()
            .filter_map(|update| {
                let ticket = state.tickets.get(&update.ticket_id)?;
                if ticket.status != TicketStatus::Call {
                    return None;
                }
                if !filter.ticket_types.contains(&ticket.ticket_type) {
                    return None;
                }
                if ticket.branch_id != filter.branch_id {
                    return None;
                }
                match filter.assignment {
                    AssignmentFilter::Assigned if ticket.assigned_seq <= 0 => return None,
                    AssignmentFilter::Unassigned if ticket.assigned_seq != 0 => return None,
                    _ => {}
                }
                Some(StaleCandidate {
                    ticket_id: ticket.id,
                    last_update: update.updated_at,
                    ticket_type: ticket.ticket_type,
                    customer_id: ticket.customer_id,
                    assigned_seq: ticket.assigned_seq,
                    circuit_id: ticket.circuit_id,
                    external_contact_id: ticket.external_contact_id.clone(),
                    job_title: ticket.job_title.clone(),
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            a.ticket_id
                .cmp(&b.ticket_id)
                .then(b.last_update.cmp(&a.last_update))
        });
        Ok(rows)
    }

    async fn assigned_routing(
        &self,
        ticket_id: TicketId,
        assigned_seq: i32,
    ) -> Result<Option<Routing>> {
        Ok(self
            .state
            .read()
            .await
            .pics
            .iter()
            .find(|pic| pic.ticket_id == ticket_id && pic.assigned_seq == assigned_seq)
            .map(|pic| pic.routing.clone()))
    }

    async fn last_update_routing(&self, ticket_id: TicketId) -> Result<Option<Routing>> {
        Ok(self
            .state
            .read()
            .await
            .updates
            .iter()
            .filter(|update| update.ticket_id == ticket_id)
            .max_by_key(|update| update.id)
            .and_then(|update| update.routing.clone()))
    }

    async fn latest_assignment_seq(&self, ticket_id: TicketId) -> Result<Option<i32>> {
        Ok(self
            .state
            .read()
            .await
            .pics
            .iter()
            .filter(|pic| pic.ticket_id == ticket_id)
            .map(|pic| pic.assigned_seq)
            .max())
    }

    async fn close_ticket(&self, plan: &ClosurePlan) -> Result<UpdateId> {
        let mut state = self.state.write().await;

        if !state.tickets.contains_key(&plan.ticket_id) {
            return Err(sqlx::Error::RowNotFound.into());
        }

        let update_id = state.next_update_id;
        state.next_update_id += 1;
        state.updates.push(UpdateRecord {
            id: update_id,
            ticket_id: plan.ticket_id,
            updated_at: plan.closed_at,
            actor: SYSTEM_ACTOR.to_string(),
            action: plan.action.clone().unwrap_or_default(),
            note: CLOSURE_NOTE.to_string(),
            assigned_seq: plan.assigned_seq,
            status: TicketStatus::Closed,
            routing: None,
        });

        for change in plan.changes() {
            state.changes.push(ChangeRecord {
                update_id,
                field: change.field,
                old_value: change.old_value,
                new_value: change.new_value,
            });
        }

        let ticket = state
            .tickets
            .get_mut(&plan.ticket_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        ticket.status = TicketStatus::Closed;
        ticket.solved_by = plan.solved_by_label().to_string();
        ticket.visited = plan.visited;

        Ok(update_id)
    }

    async fn primary_contact(&self, ticket_id: TicketId) -> Result<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .contacts
            .get(&ticket_id)
            .and_then(|numbers| numbers.last().cloned()))
    }

    async fn set_survey_outcome(&self, ticket_id: TicketId, success: bool) -> Result<()> {
        self.state
            .write()
            .await
            .survey_outcomes
            .insert(ticket_id, success);
        Ok(())
    }
}
