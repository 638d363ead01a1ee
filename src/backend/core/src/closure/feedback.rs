//! Customer-feedback solicitation after a closure.

use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::gateway::{FeedbackReceipt, NotificationGateway};
use crate::model::{Resolver, TicketCategory, TicketId, TicketType, UpdateId};

/// Country code applied to nationally-formatted numbers.
const COUNTRY_CODE: &str = "+62";

/// Whether a closure event solicits customer feedback.
///
/// Request tickets resolved by helpdesk stay quiet in both department-routed
/// categories; the escalation-family categories never ask.
pub fn should_request_feedback(
    category: TicketCategory,
    ticket_type: TicketType,
    resolver: Resolver,
) -> bool {
    match category {
        TicketCategory::Assigned => {
            !(ticket_type == TicketType::Request && resolver == Resolver::Helpdesk)
        }
        TicketCategory::Helpdesk => ticket_type == TicketType::Incident,
        TicketCategory::Escalation
        | TicketCategory::Noc
        | TicketCategory::Survey
        | TicketCategory::Monitoring => false,
    }
}

/// Normalizes a stored contact number to an international destination:
/// a national `0` prefix becomes the country code, bare digits gain a `+`.
pub fn normalize_msisdn(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix('0') {
        format!("{COUNTRY_CODE}{rest}")
    } else if !raw.starts_with('+') {
        format!("+{raw}")
    } else {
        raw.to_string()
    }
}

/// Everything the gateway needs to correlate one feedback solicitation with
/// the closure event that triggered it.
#[derive(Debug, Clone)]
pub struct FeedbackRequest {
    pub ticket_id: TicketId,
    pub customer_id: Option<i64>,
    pub update_id: UpdateId,
    pub assigned_seq: i32,
    /// Job-title label carried as the template body parameter.
    pub job_title: String,
}

/// Sends the feedback-score template and persists the send receipt.
pub struct FeedbackDispatcher {
    gateway: Arc<dyn NotificationGateway>,
}

impl FeedbackDispatcher {
    pub fn new(gateway: Arc<dyn NotificationGateway>) -> Self {
        Self { gateway }
    }

    /// Both calls are attempted: a failed send still gets its receipt
    /// persisted, so the solicitation is on record either way. The first
    /// error is returned for the caller's per-ticket guard.
    pub async fn send_and_record(
        &self,
        destination: &str,
        request: &FeedbackRequest,
    ) -> Result<()> {
        let send_result = self
            .gateway
            .send_feedback_template(destination, &request.job_title)
            .await;
        if let Err(error) = &send_result {
            warn!(
                ticket_id = request.ticket_id,
                error = %error,
                "feedback template send failed"
            );
        }

        let receipt = FeedbackReceipt {
            destination: destination.to_string(),
            customer_id: request.customer_id,
            ticket_id: request.ticket_id,
            update_id: request.update_id,
            assigned_seq: request.assigned_seq,
        };
        let receipt_result = self.gateway.persist_feedback_receipt(&receipt).await;

        send_result.and(receipt_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_matrix_for_assigned_tickets() {
        use TicketCategory::Assigned;

        assert!(!should_request_feedback(
            Assigned,
            TicketType::Request,
            Resolver::Helpdesk
        ));
        assert!(should_request_feedback(
            Assigned,
            TicketType::Request,
            Resolver::Engineer
        ));
        assert!(should_request_feedback(
            Assigned,
            TicketType::Incident,
            Resolver::Helpdesk
        ));
        assert!(should_request_feedback(
            Assigned,
            TicketType::Incident,
            Resolver::Engineer
        ));
    }

    #[test]
    fn feedback_matrix_for_helpdesk_queue() {
        use TicketCategory::Helpdesk;

        assert!(!should_request_feedback(
            Helpdesk,
            TicketType::Request,
            Resolver::Helpdesk
        ));
        assert!(should_request_feedback(
            Helpdesk,
            TicketType::Incident,
            Resolver::Helpdesk
        ));
    }

    #[test]
    fn escalation_family_never_requests_feedback() {
        for category in [
            TicketCategory::Escalation,
            TicketCategory::Noc,
            TicketCategory::Survey,
            TicketCategory::Monitoring,
        ] {
            assert!(!should_request_feedback(
                category,
                TicketType::Incident,
                Resolver::Engineer
            ));
        }
    }

    #[test]
    fn national_prefix_becomes_country_code() {
        assert_eq!(normalize_msisdn("0812345678"), "+62812345678");
    }

    #[test]
    fn plus_prefixed_numbers_are_unchanged() {
        assert_eq!(normalize_msisdn("+62812345678"), "+62812345678");
        assert_eq!(normalize_msisdn("+18005550100"), "+18005550100");
    }

    #[test]
    fn bare_digits_gain_a_plus() {
        assert_eq!(normalize_msisdn("62812345678"), "+62812345678");
    }
}
