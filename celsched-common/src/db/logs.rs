//! Audit log table

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::SystemLog;
use crate::repository::{LogFilter, LogRepository};
use crate::Result;

pub struct SqliteLogRepository {
    pool: SqlitePool,
}

impl SqliteLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Append `AND ...` clauses for every filter field that is set
fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a LogFilter) {
    if let Some(log_type) = filter.log_type {
        builder.push(" AND log_type = ").push_bind(log_type.as_str());
    }
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(severity) = filter.severity {
        builder.push(" AND severity = ").push_bind(severity.as_str());
    }
    if let Some(volunteer_id) = &filter.volunteer_id {
        builder
            .push(" AND json_extract(document, '$.metadata.volunteerId') = ")
            .push_bind(volunteer_id.as_str());
    }
    if let Some(department_id) = &filter.department_id {
        builder
            .push(" AND json_extract(document, '$.metadata.departmentId') = ")
            .push_bind(department_id.as_str());
    }
}

#[async_trait]
impl LogRepository for SqliteLogRepository {
    async fn create_log(&self, log: &SystemLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO system_logs (id, log_type, category, severity, time_detected, document)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(log.log_type.as_str())
        .bind(log.category.as_str())
        .bind(log.severity.as_str())
        .bind(log.time_detected.to_rfc3339())
        .bind(Json(log))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_logs(&self, filter: &LogFilter) -> Result<(Vec<SystemLog>, u64)> {
        let mut count_query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM system_logs WHERE 1 = 1");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut list_query =
            QueryBuilder::<Sqlite>::new("SELECT document FROM system_logs WHERE 1 = 1");
        push_filters(&mut list_query, filter);
        list_query
            .push(" ORDER BY time_detected DESC, id LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let rows: Vec<(Json<SystemLog>,)> = list_query
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let logs = rows.into_iter().map(|(Json(log),)| log).collect();
        Ok((logs, total.max(0) as u64))
    }
}
