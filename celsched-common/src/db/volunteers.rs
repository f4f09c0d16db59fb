//! Volunteer table

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::Volunteer;
use crate::repository::VolunteerRepository;
use crate::{Error, Result};

pub struct SqliteVolunteerRepository {
    pool: SqlitePool,
}

impl SqliteVolunteerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VolunteerRepository for SqliteVolunteerRepository {
    async fn create_volunteer(&self, volunteer: &Volunteer) -> Result<()> {
        sqlx::query(
            "INSERT INTO volunteers (id, name, created_at, document) VALUES (?, ?, ?, ?)",
        )
        .bind(&volunteer.id)
        .bind(&volunteer.name)
        .bind(volunteer.created_at.to_rfc3339())
        .bind(Json(volunteer))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_volunteer(&self, id: &str) -> Result<Option<Volunteer>> {
        let row: Option<(Json<Volunteer>,)> =
            sqlx::query_as("SELECT document FROM volunteers WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(volunteer),)| volunteer))
    }

    async fn update_volunteer(&self, volunteer: &Volunteer) -> Result<()> {
        let result = sqlx::query("UPDATE volunteers SET name = ?, document = ? WHERE id = ?")
            .bind(&volunteer.name)
            .bind(Json(volunteer))
            .bind(&volunteer.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("volunteer {}", volunteer.id)));
        }
        Ok(())
    }

    async fn list_volunteers(&self) -> Result<Vec<Volunteer>> {
        let rows: Vec<(Json<Volunteer>,)> =
            sqlx::query_as("SELECT document FROM volunteers ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(Json(v),)| v).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    async fn repo() -> SqliteVolunteerRepository {
        SqliteVolunteerRepository::new(init_memory_database().await.unwrap())
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = repo().await;
        let volunteer = Volunteer::new("Ana");
        repo.create_volunteer(&volunteer).await.unwrap();

        let loaded = repo.get_volunteer(&volunteer.id).await.unwrap();
        assert_eq!(loaded, Some(volunteer));
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let repo = repo().await;
        assert!(repo.get_volunteer("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_persists_and_rejects_unknown() {
        let repo = repo().await;
        let mut volunteer = Volunteer::new("Ana");
        repo.create_volunteer(&volunteer).await.unwrap();

        volunteer.is_disabled = true;
        repo.update_volunteer(&volunteer).await.unwrap();
        let loaded = repo.get_volunteer(&volunteer.id).await.unwrap().unwrap();
        assert!(loaded.is_disabled);

        let stranger = Volunteer::new("Nobody");
        let err = repo.update_volunteer(&stranger).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_includes_disabled() {
        let repo = repo().await;
        let mut disabled = Volunteer::new("Gone");
        disabled.is_disabled = true;
        repo.create_volunteer(&Volunteer::new("Here")).await.unwrap();
        repo.create_volunteer(&disabled).await.unwrap();

        let all = repo.list_volunteers().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_error() {
        let repo = repo().await;
        let volunteer = Volunteer::new("Ana");
        repo.create_volunteer(&volunteer).await.unwrap();
        let err = repo.create_volunteer(&volunteer).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
