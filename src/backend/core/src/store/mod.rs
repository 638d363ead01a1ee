//! Record-store access for the ticket workflow tables.
//!
//! All reads and writes of the closure engine go through the [`TicketStore`]
//! trait: [`MySqlTicketStore`] talks to the production store, and
//! [`InMemoryTicketStore`] backs tests and local development.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ClosurePlan, Routing, StaleCandidate, TicketId, TicketType, UpdateId};

mod memory;
mod mysql;

pub use memory::{ClosureAudit, InMemoryTicketStore, TicketRecord};
pub use mysql::MySqlTicketStore;

/// Assignment restriction of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentFilter {
    /// Tickets with an active assignment (`assigned_seq > 0`).
    Assigned,
    /// Tickets still in the unassigned queue (`assigned_seq = 0`).
    Unassigned,
    Any,
}

/// Category-specific eligibility criteria for a stale-ticket scan.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    pub ticket_types: Vec<TicketType>,
    pub assignment: AssignmentFilter,
    pub branch_id: String,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Pending updates of open tickets matching the filter, ordered by ticket
    /// id then update time descending, so the first row seen per ticket is
    /// its latest update.
    async fn stale_candidates(&self, filter: &ScanFilter) -> Result<Vec<StaleCandidate>>;

    /// Routing of the PIC holding the given assignment seq on the ticket.
    async fn assigned_routing(
        &self,
        ticket_id: TicketId,
        assigned_seq: i32,
    ) -> Result<Option<Routing>>;

    /// Routing of the actor of the ticket's most recent update row.
    async fn last_update_routing(&self, ticket_id: TicketId) -> Result<Option<Routing>>;

    /// Highest assignment seq ever recorded for the ticket.
    async fn latest_assignment_seq(&self, ticket_id: TicketId) -> Result<Option<i32>>;

    /// Applies the three-step closure transition (append update row, append
    /// its change rows, mutate the ticket summary) as one transactional unit
    /// and returns the id of the new update row.
    async fn close_ticket(&self, plan: &ClosurePlan) -> Result<UpdateId>;

    /// The ticket's most recently registered contact number, if any.
    async fn primary_contact(&self, ticket_id: TicketId) -> Result<Option<String>>;

    /// Survey bookkeeping: records whether the surveyed install went ahead.
    async fn set_survey_outcome(&self, ticket_id: TicketId, success: bool) -> Result<()>;
}
