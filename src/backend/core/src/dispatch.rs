//! Job selection at the trigger-transport boundary.
//!
//! The transport delivers a job name (or a dotted subject carrying one);
//! [`JobKind`] is the closed set of jobs this runner executes, so adding a
//! category means adding a variant and the compiler walks every dispatch
//! site. A successful [`execute`] return is the acknowledgment signal for
//! the triggering message.

use std::fmt;

use crate::closure::{ClosureEngine, PassSummary};
use crate::error::{Error, Result};
use crate::model::TicketCategory;

/// One runnable job per closure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    CloseAssignedTickets,
    CloseHelpdeskTickets,
    CloseEscalationTickets,
    CloseNocTickets,
    CloseSurveyTickets,
    CloseMonitoringTickets,
}

impl JobKind {
    pub const ALL: [JobKind; 6] = [
        JobKind::CloseAssignedTickets,
        JobKind::CloseHelpdeskTickets,
        JobKind::CloseEscalationTickets,
        JobKind::CloseNocTickets,
        JobKind::CloseSurveyTickets,
        JobKind::CloseMonitoringTickets,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::CloseAssignedTickets => "close-assigned-tickets",
            Self::CloseHelpdeskTickets => "close-helpdesk-tickets",
            Self::CloseEscalationTickets => "close-escalation-tickets",
            Self::CloseNocTickets => "close-noc-tickets",
            Self::CloseSurveyTickets => "close-survey-tickets",
            Self::CloseMonitoringTickets => "close-monitoring-tickets",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Trigger subjects look like `jobs.dispatch.<name>[.<args>]`; the job
    /// name is the third dotted segment.
    pub fn from_subject(subject: &str) -> Option<Self> {
        subject.split('.').nth(2).and_then(Self::from_name)
    }

    /// Accepts either a bare job name or a full trigger subject.
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_name(input)
            .or_else(|| Self::from_subject(input))
            .ok_or_else(|| Error::UnknownJob(input.to_string()))
    }

    pub const fn category(&self) -> TicketCategory {
        match self {
            Self::CloseAssignedTickets => TicketCategory::Assigned,
            Self::CloseHelpdeskTickets => TicketCategory::Helpdesk,
            Self::CloseEscalationTickets => TicketCategory::Escalation,
            Self::CloseNocTickets => TicketCategory::Noc,
            Self::CloseSurveyTickets => TicketCategory::Survey,
            Self::CloseMonitoringTickets => TicketCategory::Monitoring,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs one job to completion.
pub async fn execute(kind: JobKind, engine: &ClosureEngine) -> Result<PassSummary> {
    tracing::info!(job = %kind, "executing job");
    engine.run_pass(kind.category()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in JobKind::ALL {
            assert_eq!(JobKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(JobKind::from_name("frobnicate"), None);
    }

    #[test]
    fn subject_carries_the_job_name_in_the_third_segment() {
        assert_eq!(
            JobKind::from_subject("jobs.dispatch.close-survey-tickets"),
            Some(JobKind::CloseSurveyTickets)
        );
        assert_eq!(
            JobKind::from_subject("jobs.dispatch.close-assigned-tickets.2026-08-06"),
            Some(JobKind::CloseAssignedTickets)
        );
        assert_eq!(JobKind::from_subject("close-survey-tickets"), None);
        assert_eq!(JobKind::from_subject("jobs.dispatch.unknown"), None);
    }

    #[test]
    fn parse_accepts_names_and_subjects() {
        assert_eq!(
            JobKind::parse("close-noc-tickets").unwrap(),
            JobKind::CloseNocTickets
        );
        assert_eq!(
            JobKind::parse("jobs.dispatch.close-noc-tickets").unwrap(),
            JobKind::CloseNocTickets
        );
        assert!(matches!(
            JobKind::parse("jobs.dispatch.bogus"),
            Err(Error::UnknownJob(_))
        ));
    }

    #[test]
    fn every_category_has_a_job() {
        let categories: std::collections::HashSet<_> =
            JobKind::ALL.iter().map(|kind| kind.category()).collect();
        assert_eq!(categories.len(), JobKind::ALL.len());
    }
}
