//! Department table

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::Department;
use crate::repository::DepartmentRepository;
use crate::{Error, Result};

pub struct SqliteDepartmentRepository {
    pool: SqlitePool,
}

impl SqliteDepartmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepartmentRepository for SqliteDepartmentRepository {
    async fn create_department(&self, department: &Department) -> Result<()> {
        sqlx::query(
            "INSERT INTO departments (id, department_name, created_at, document) VALUES (?, ?, ?, ?)",
        )
        .bind(&department.id)
        .bind(&department.department_name)
        .bind(department.created_at.to_rfc3339())
        .bind(Json(department))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_department(&self, id: &str) -> Result<Option<Department>> {
        let row: Option<(Json<Department>,)> =
            sqlx::query_as("SELECT document FROM departments WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(department),)| department))
    }

    async fn update_department(&self, department: &Department) -> Result<()> {
        let result =
            sqlx::query("UPDATE departments SET department_name = ?, document = ? WHERE id = ?")
                .bind(&department.department_name)
                .bind(Json(department))
                .bind(&department.id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("department {}", department.id)));
        }
        Ok(())
    }

    async fn list_departments(&self) -> Result<Vec<Department>> {
        let rows: Vec<(Json<Department>,)> =
            sqlx::query_as("SELECT document FROM departments ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(Json(d),)| d).collect())
    }
}
