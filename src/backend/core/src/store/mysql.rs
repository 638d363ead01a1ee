//! MySQL-backed ticket store.

use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySqlPool, Row};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::model::{
    ClosurePlan, Routing, StaleCandidate, TicketId, TicketStatus, TicketType, UpdateId,
    CLOSURE_NOTE, SYSTEM_ACTOR,
};

use super::{AssignmentFilter, ScanFilter, TicketStore};

/// Connection pool and queries against the production record store.
#[derive(Clone)]
pub struct MySqlTicketStore {
    pool: MySqlPool,
}

impl MySqlTicketStore {
    /// Create a new connection pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl TicketStore for MySqlTicketStore {
    async fn stale_candidates(&self, filter: &ScanFilter) -> Result<Vec<StaleCandidate>> {
        let placeholders = vec!["?"; filter.ticket_types.len()].join(", ");
        let assignment_clause = match filter.assignment {
            AssignmentFilter::Assigned => "AND t.assigned_seq > 0",
            AssignmentFilter::Unassigned => "AND t.assigned_seq = 0",
            AssignmentFilter::Any => "",
        };

        let sql = format!(
            r#"
            SELECT tu.ticket_id, tu.updated_at, t.ticket_type, t.customer_id,
                   t.assigned_seq, t.circuit_id, cs.external_contact_id,
                   jt.title AS job_title
            FROM ticket_updates tu
            LEFT JOIN tickets t ON tu.ticket_id = t.id
            LEFT JOIN employees e ON t.employee_id = e.id
            LEFT JOIN job_titles jt ON e.job_title_id = jt.id
            LEFT JOIN customer_services cs ON cs.id = t.customer_service_id
            LEFT JOIN customers c ON cs.customer_id = c.id
            WHERE t.ticket_type IN ({placeholders})
              AND t.status = ?
              {assignment_clause}
              AND c.branch_id = ?
            ORDER BY tu.ticket_id, tu.updated_at DESC
            "#
        );

        let mut query = sqlx::query(&sql);
        for ticket_type in &filter.ticket_types {
            query = query.bind(ticket_type.id());
        }
        query = query
            .bind(TicketStatus::Call.as_str())
            .bind(&filter.branch_id);

        let rows = query.fetch_all(&self.pool).await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let type_id: i32 = row.try_get("ticket_type")?;
            let Some(ticket_type) = TicketType::from_id(type_id) else {
                continue;
            };
            candidates.push(StaleCandidate {
                ticket_id: row.try_get("ticket_id")?,
                last_update: row.try_get("updated_at")?,
                ticket_type,
                customer_id: row.try_get("customer_id")?,
                assigned_seq: row.try_get("assigned_seq")?,
                circuit_id: row.try_get("circuit_id")?,
                external_contact_id: row.try_get("external_contact_id")?,
                job_title: row.try_get("job_title")?,
            });
        }
        Ok(candidates)
    }

    async fn assigned_routing(
        &self,
        ticket_id: TicketId,
        assigned_seq: i32,
    ) -> Result<Option<Routing>> {
        let row = sqlx::query(
            r#"
            SELECT e.dept_id, jt.title AS job_title
            FROM ticket_pics tp
            LEFT JOIN employees e ON tp.employee_id = e.id
            LEFT JOIN job_titles jt ON e.job_title_id = jt.id
            WHERE tp.ticket_id = ? AND tp.assigned_seq = ?
            LIMIT 1
            "#,
        )
        .bind(ticket_id)
        .bind(assigned_seq)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let dept_id: Option<String> = row.try_get("dept_id")?;
        let job_title: Option<String> = row.try_get("job_title")?;
        Ok(dept_id.map(|dept_id| Routing { dept_id, job_title }))
    }

    async fn last_update_routing(&self, ticket_id: TicketId) -> Result<Option<Routing>> {
        let row = sqlx::query(
            r#"
            SELECT e.dept_id, jt.title AS job_title
            FROM ticket_updates tu
            LEFT JOIN employees e ON tu.actor = e.id
            LEFT JOIN job_titles jt ON e.job_title_id = jt.id
            WHERE tu.ticket_id = ?
            ORDER BY tu.id DESC
            LIMIT 1
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let dept_id: Option<String> = row.try_get("dept_id")?;
        let job_title: Option<String> = row.try_get("job_title")?;
        Ok(dept_id.map(|dept_id| Routing { dept_id, job_title }))
    }

    async fn latest_assignment_seq(&self, ticket_id: TicketId) -> Result<Option<i32>> {
        let seq: Option<i32> = sqlx::query_scalar(
            "SELECT assigned_seq FROM ticket_pics WHERE ticket_id = ? ORDER BY assigned_seq DESC LIMIT 1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(seq)
    }

    async fn close_ticket(&self, plan: &ClosurePlan) -> Result<UpdateId> {
        let mut tx = self.pool.begin().await?;

        let update_id = sqlx::query(
            r#"
            INSERT INTO ticket_updates
                (ticket_id, updated_at, action_start, action_end, actor, action, note, assigned_seq, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(plan.ticket_id)
        .bind(plan.closed_at)
        .bind(plan.closed_at)
        .bind(plan.closed_at)
        .bind(SYSTEM_ACTOR)
        .bind(plan.action.as_deref().unwrap_or(""))
        .bind(CLOSURE_NOTE)
        .bind(plan.assigned_seq)
        .bind(TicketStatus::Closed.as_str())
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        for change in plan.changes() {
            sqlx::query(
                "INSERT INTO ticket_changes (update_id, field, old_value, new_value) VALUES (?, ?, ?, ?)",
            )
            .bind(update_id)
            .bind(&change.field)
            .bind(&change.old_value)
            .bind(&change.new_value)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE tickets SET status = ?, solved_by = ?, visited = ? WHERE id = ?")
            .bind(TicketStatus::Closed.as_str())
            .bind(plan.solved_by_label())
            .bind(plan.visited)
            .bind(plan.ticket_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(update_id)
    }

    async fn primary_contact(&self, ticket_id: TicketId) -> Result<Option<String>> {
        let contact: Option<String> = sqlx::query_scalar(
            "SELECT contact_no FROM ticket_contacts WHERE ticket_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contact)
    }

    async fn set_survey_outcome(&self, ticket_id: TicketId, success: bool) -> Result<()> {
        sqlx::query("UPDATE ticket_surveys SET is_success = ? WHERE ticket_id = ?")
            .bind(success)
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
