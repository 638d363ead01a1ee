//! Grace-period policies.

use chrono::{DateTime, Duration, Utc};

use crate::config::ClosureConfig;
use crate::model::Resolver;

/// Idle seconds after which escalation, NOC, survey and monitoring tickets
/// become eligible for closure.
pub const IGNORED_PERIOD_SECS: i64 = 86_400;

/// Resolved policy for one ticket: how long it may idle, and which function
/// gets credited when it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GracePolicy {
    pub grace: Duration,
    pub resolver: Resolver,
}

/// Maps an assigned department to its grace period and resolver label.
///
/// Departments outside both sets have no policy; their tickets are left open
/// until a future pass finds them correctly routed.
pub fn resolve_department_policy(config: &ClosureConfig, dept_id: &str) -> Option<GracePolicy> {
    if config.helpdesk_departments.contains(dept_id) {
        Some(GracePolicy {
            grace: config.grace_helpdesk(),
            resolver: Resolver::Helpdesk,
        })
    } else if config.engineer_departments.contains(dept_id) {
        Some(GracePolicy {
            grace: config.grace_engineer(),
            resolver: Resolver::Engineer,
        })
    } else {
        None
    }
}

/// A ticket is due once its grace period has fully elapsed, boundary
/// inclusive: last update at `T` with grace `G` closes from `T + G` onward.
pub fn due_for_closure(last_update: DateTime<Utc>, grace: Duration, now: DateTime<Utc>) -> bool {
    last_update + grace <= now
}

/// Fixed grace period of the escalation-family categories.
pub fn ignored_period() -> Duration {
    Duration::seconds(IGNORED_PERIOD_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClosureConfig {
        ClosureConfig {
            grace_helpdesk_secs: 7200,
            grace_engineer_secs: 10_800,
            ..ClosureConfig::default()
        }
    }

    #[test]
    fn helpdesk_departments_map_to_helpdesk_policy() {
        for dept in ["01", "17", "29"] {
            let policy = resolve_department_policy(&config(), dept).unwrap();
            assert_eq!(policy.resolver, Resolver::Helpdesk);
            assert_eq!(policy.grace, Duration::seconds(7200));
        }
    }

    #[test]
    fn engineer_departments_map_to_engineer_policy() {
        for dept in ["04", "34"] {
            let policy = resolve_department_policy(&config(), dept).unwrap();
            assert_eq!(policy.resolver, Resolver::Engineer);
            assert_eq!(policy.grace, Duration::seconds(10_800));
        }
    }

    #[test]
    fn unmapped_department_has_no_policy() {
        assert_eq!(resolve_department_policy(&config(), "02"), None);
        assert_eq!(resolve_department_policy(&config(), ""), None);
    }

    #[test]
    fn closure_boundary_is_inclusive() {
        let last_update = Utc::now();
        let grace = Duration::seconds(7200);

        assert!(due_for_closure(last_update, grace, last_update + grace));
        assert!(due_for_closure(
            last_update,
            grace,
            last_update + grace + Duration::seconds(1)
        ));
        assert!(!due_for_closure(
            last_update,
            grace,
            last_update + grace - Duration::seconds(1)
        ));
    }

    #[test]
    fn ignored_period_is_one_day() {
        assert_eq!(ignored_period(), Duration::seconds(86_400));
    }
}
