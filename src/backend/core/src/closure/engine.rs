//! Category passes: scan, dedup, gate, close, notify.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::config::ClosureConfig;
use crate::error::Result;
use crate::gateway::NotificationGateway;
use crate::model::{
    ClosurePlan, Resolver, StaleCandidate, TicketCategory, TicketId, TicketType, UpdateId,
    NO_SERVICE_ACTION,
};
use crate::store::{AssignmentFilter, ScanFilter, TicketStore};
use crate::sync::TicketSync;

use super::feedback::{
    normalize_msisdn, should_request_feedback, FeedbackDispatcher, FeedbackRequest,
};
use super::policy::{due_for_closure, ignored_period, resolve_department_policy};

/// Outcome counters of one category pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Distinct tickets evaluated (after dedup).
    pub scanned: usize,
    pub closed: usize,
    pub feedback_sent: usize,
    pub sync_attempted: usize,
    /// Feedback or sync calls that failed; the closures stand regardless.
    pub notify_failures: usize,
}

/// Drives the reconciliation passes over one record store.
pub struct ClosureEngine {
    store: Arc<dyn TicketStore>,
    feedback: FeedbackDispatcher,
    sync: Arc<dyn TicketSync>,
    config: ClosureConfig,
}

impl ClosureEngine {
    pub fn new(
        store: Arc<dyn TicketStore>,
        gateway: Arc<dyn NotificationGateway>,
        sync: Arc<dyn TicketSync>,
        config: ClosureConfig,
    ) -> Self {
        Self {
            store,
            feedback: FeedbackDispatcher::new(gateway),
            sync,
            config,
        }
    }

    /// Runs one category pass to completion.
    ///
    /// Candidates are processed strictly in scan order, one at a time. A
    /// ticket seen under several pending update rows is evaluated once, on
    /// its latest row. Record-store errors propagate; notification and sync
    /// errors are contained per ticket.
    pub async fn run_pass(&self, category: TicketCategory) -> Result<PassSummary> {
        let candidates = self.store.stale_candidates(&self.scan_filter(category)).await?;

        let mut summary = PassSummary::default();
        let mut proceeded: HashSet<TicketId> = HashSet::new();
        let now = Utc::now();

        for candidate in candidates {
            if !proceeded.insert(candidate.ticket_id) {
                continue;
            }
            summary.scanned += 1;

            match category {
                TicketCategory::Assigned => {
                    self.close_assigned(&candidate, now, &mut summary).await?;
                }
                TicketCategory::Helpdesk => {
                    self.close_helpdesk(&candidate, now, &mut summary).await?;
                }
                TicketCategory::Escalation
                | TicketCategory::Noc
                | TicketCategory::Survey
                | TicketCategory::Monitoring => {
                    self.close_unrouted(category, &candidate, now, &mut summary)
                        .await?;
                }
            }
        }

        info!(
            category = %category,
            scanned = summary.scanned,
            closed = summary.closed,
            feedback_sent = summary.feedback_sent,
            sync_attempted = summary.sync_attempted,
            notify_failures = summary.notify_failures,
            "pass complete"
        );
        Ok(summary)
    }

    fn scan_filter(&self, category: TicketCategory) -> ScanFilter {
        let (ticket_types, assignment) = match category {
            TicketCategory::Assigned => (
                vec![TicketType::Request, TicketType::Incident],
                AssignmentFilter::Assigned,
            ),
            TicketCategory::Helpdesk => (
                vec![TicketType::Request, TicketType::Incident],
                AssignmentFilter::Unassigned,
            ),
            TicketCategory::Escalation => (vec![TicketType::Escalation], AssignmentFilter::Any),
            TicketCategory::Noc => (vec![TicketType::Noc], AssignmentFilter::Any),
            TicketCategory::Survey => (vec![TicketType::Survey], AssignmentFilter::Any),
            TicketCategory::Monitoring => (vec![TicketType::Monitoring], AssignmentFilter::Any),
        };
        ScanFilter {
            ticket_types,
            assignment,
            branch_id: self.config.branch_id.clone(),
        }
    }

    /// Assigned tickets: the grace period and resolver come from the
    /// department of the assigned PIC, falling back to the actor of the
    /// latest update when the assignment row is gone.
    async fn close_assigned(
        &self,
        candidate: &StaleCandidate,
        now: DateTime<Utc>,
        summary: &mut PassSummary,
    ) -> Result<()> {
        let routing = match self
            .store
            .assigned_routing(candidate.ticket_id, candidate.assigned_seq)
            .await?
        {
            Some(routing) => Some(routing),
            None => self.store.last_update_routing(candidate.ticket_id).await?,
        };
        let Some(routing) = routing else {
            debug!(ticket_id = candidate.ticket_id, "no routing on record, skipping");
            return Ok(());
        };

        let Some(policy) = resolve_department_policy(&self.config, &routing.dept_id) else {
            debug!(
                ticket_id = candidate.ticket_id,
                dept_id = %routing.dept_id,
                "no closure policy for department"
            );
            return Ok(());
        };

        if !due_for_closure(candidate.last_update, policy.grace, now) {
            return Ok(());
        }

        let plan = ClosurePlan {
            ticket_id: candidate.ticket_id,
            closed_at: now,
            assigned_seq: candidate.assigned_seq,
            action: None,
            solved_by: Some(policy.resolver),
            visited: policy.resolver == Resolver::Engineer,
        };
        let update_id = self.store.close_ticket(&plan).await?;
        summary.closed += 1;
        counter!("ticketops_tickets_closed_total", "category" => TicketCategory::Assigned.as_str())
            .increment(1);

        self.notify(
            TicketCategory::Assigned,
            candidate,
            update_id,
            policy.resolver,
            routing.job_title.as_deref(),
            summary,
        )
        .await
    }

    /// Unassigned request/incident tickets: fixed helpdesk policy, assignment
    /// seq pinned to zero on the audit trail.
    async fn close_helpdesk(
        &self,
        candidate: &StaleCandidate,
        now: DateTime<Utc>,
        summary: &mut PassSummary,
    ) -> Result<()> {
        if !due_for_closure(candidate.last_update, self.config.grace_helpdesk(), now) {
            return Ok(());
        }

        let plan = ClosurePlan {
            ticket_id: candidate.ticket_id,
            closed_at: now,
            assigned_seq: 0,
            action: None,
            solved_by: Some(Resolver::Helpdesk),
            visited: false,
        };
        let update_id = self.store.close_ticket(&plan).await?;
        summary.closed += 1;
        counter!("ticketops_tickets_closed_total", "category" => TicketCategory::Helpdesk.as_str())
            .increment(1);

        self.notify(
            TicketCategory::Helpdesk,
            candidate,
            update_id,
            Resolver::Helpdesk,
            candidate.job_title.as_deref(),
            summary,
        )
        .await
    }

    /// Escalation, NOC, survey and monitoring tickets: fixed one-day idle
    /// period, no resolver attribution, action text derived from whether a
    /// service circuit ever got linked.
    async fn close_unrouted(
        &self,
        category: TicketCategory,
        candidate: &StaleCandidate,
        now: DateTime<Utc>,
        summary: &mut PassSummary,
    ) -> Result<()> {
        if !due_for_closure(candidate.last_update, ignored_period(), now) {
            return Ok(());
        }

        let assigned_seq = self
            .store
            .latest_assignment_seq(candidate.ticket_id)
            .await?
            .unwrap_or(0);
        let linked = candidate.circuit_id.is_some();
        let action = if linked {
            String::new()
        } else {
            NO_SERVICE_ACTION.to_string()
        };

        let plan = ClosurePlan {
            ticket_id: candidate.ticket_id,
            closed_at: now,
            assigned_seq,
            action: Some(action),
            solved_by: None,
            visited: true,
        };
        let update_id = self.store.close_ticket(&plan).await?;
        summary.closed += 1;
        counter!("ticketops_tickets_closed_total", "category" => category.as_str()).increment(1);

        if category == TicketCategory::Survey {
            self.store
                .set_survey_outcome(candidate.ticket_id, linked)
                .await?;
        }

        self.sync_if_linked(candidate, update_id, summary).await;
        Ok(())
    }

    /// Post-closure fan-out for the department-routed categories: feedback
    /// per the eligibility matrix, then sync. Neither can fail the pass.
    async fn notify(
        &self,
        category: TicketCategory,
        candidate: &StaleCandidate,
        update_id: UpdateId,
        resolver: Resolver,
        job_title: Option<&str>,
        summary: &mut PassSummary,
    ) -> Result<()> {
        if should_request_feedback(category, candidate.ticket_type, resolver) {
            if let Some(contact) = self.store.primary_contact(candidate.ticket_id).await? {
                if !contact.is_empty() {
                    let destination = normalize_msisdn(&contact);
                    let request = FeedbackRequest {
                        ticket_id: candidate.ticket_id,
                        customer_id: candidate.customer_id,
                        update_id,
                        assigned_seq: candidate.assigned_seq,
                        job_title: job_title.unwrap_or_default().to_string(),
                    };
                    match self.feedback.send_and_record(&destination, &request).await {
                        Ok(()) => summary.feedback_sent += 1,
                        Err(error) => {
                            warn!(
                                ticket_id = candidate.ticket_id,
                                error = %error,
                                "feedback notification failed"
                            );
                            counter!("ticketops_notify_failures_total", "kind" => "feedback")
                                .increment(1);
                            summary.notify_failures += 1;
                        }
                    }
                }
            }
        }

        self.sync_if_linked(candidate, update_id, summary).await;
        Ok(())
    }

    async fn sync_if_linked(
        &self,
        candidate: &StaleCandidate,
        update_id: UpdateId,
        summary: &mut PassSummary,
    ) {
        let Some(circuit_id) = candidate.circuit_id else {
            return;
        };
        summary.sync_attempted += 1;

        if let Err(error) = self
            .sync
            .sync_ticket(
                candidate.ticket_id,
                update_id,
                candidate.external_contact_id.as_deref(),
            )
            .await
        {
            warn!(
                ticket_id = candidate.ticket_id,
                circuit_id,
                error = %error,
                "ticket sync failed"
            );
            counter!("ticketops_notify_failures_total", "kind" => "sync").increment(1);
            summary.notify_failures += 1;
        }
    }
}
