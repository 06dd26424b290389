use chrono::{DateTime, Utc};
use sqlx::PgPool;
use updraft_core::{short_url, AppError};

/// A persisted upload record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Upload {
    pub id: i64,
    pub user_id: Option<i64>,
    pub sha1: String,
    pub original_filename: String,
    pub filesize: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub extension: Option<String>,
    pub url: String,
    pub storage_key: String,
    pub secure: bool,
    pub access_control_post_id: Option<i64>,
    pub retain_hours: Option<i32>,
    pub upload_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Upload {
    /// Base62 short code for this upload, e.g. `1VbOIkzDtdqUMFG0eC3g0N`.
    pub fn short_code(&self) -> Option<String> {
        short_url::encode(&self.sha1)
    }
}

/// Fields required to insert a new upload record.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub user_id: Option<i64>,
    pub sha1: String,
    pub original_filename: String,
    pub filesize: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub extension: Option<String>,
    pub url: String,
    pub storage_key: String,
    pub secure: bool,
    pub access_control_post_id: Option<i64>,
    pub retain_hours: Option<i32>,
    pub upload_type: Option<String>,
}

/// Repository for upload records
#[derive(Clone)]
pub struct UploadRepository {
    pool: PgPool,
}

impl UploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select", sha1 = %sha1))]
    pub async fn find_by_sha1(&self, sha1: &str) -> Result<Option<Upload>, AppError> {
        // Use dynamic SQLx queries to avoid requiring DATABASE_URL/sqlx prepare
        let row = sqlx::query_as::<_, Upload>(
            r#"
            SELECT *
            FROM uploads
            WHERE sha1 = $1
            "#,
        )
        .bind(sha1)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select", db.record_id = %id))]
    pub async fn find_by_id_and_url(
        &self,
        id: i64,
        url: &str,
    ) -> Result<Option<Upload>, AppError> {
        let row = sqlx::query_as::<_, Upload>(
            r#"
            SELECT *
            FROM uploads
            WHERE id = $1 AND url = $2
            "#,
        )
        .bind(id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Resolve a base62 short code to its upload.
    ///
    /// The code decodes to a truncated sha1 prefix; prefix collisions resolve
    /// to the oldest matching record.
    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select", code = %code))]
    pub async fn find_by_short_code(&self, code: &str) -> Result<Option<Upload>, AppError> {
        let Some(prefix) = short_url::decode(code) else {
            return Ok(None);
        };

        // The decoded prefix is lowercase hex, so it contains no LIKE
        // metacharacters.
        let row = sqlx::query_as::<_, Upload>(
            r#"
            SELECT *
            FROM uploads
            WHERE sha1 LIKE $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(format!("{}%", prefix))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    pub async fn find_by_url(&self, url: &str) -> Result<Option<Upload>, AppError> {
        let row = sqlx::query_as::<_, Upload>(
            r#"
            SELECT *
            FROM uploads
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Insert a new upload record.
    ///
    /// Two requests can ingest identical content concurrently; the loser of
    /// the unique sha1 race falls back to the record the winner committed.
    #[tracing::instrument(skip(self, new), fields(db.table = "uploads", db.operation = "insert", sha1 = %new.sha1))]
    pub async fn create(&self, new: NewUpload) -> Result<Upload, AppError> {
        let result = sqlx::query_as::<_, Upload>(
            r#"
            INSERT INTO uploads (
                user_id, sha1, original_filename, filesize, width, height,
                extension, url, storage_key, secure, access_control_post_id,
                retain_hours, upload_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(&new.sha1)
        .bind(&new.original_filename)
        .bind(new.filesize)
        .bind(new.width)
        .bind(new.height)
        .bind(&new.extension)
        .bind(&new.url)
        .bind(&new.storage_key)
        .bind(new.secure)
        .bind(new.access_control_post_id)
        .bind(new.retain_hours)
        .bind(&new.upload_type)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(upload) => Ok(upload),
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                let existing = self.find_by_sha1(&new.sha1).await?;
                existing.ok_or_else(|| {
                    AppError::Internal(format!(
                        "upload {} vanished after unique violation",
                        new.sha1
                    ))
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "update", db.record_id = %id))]
    pub async fn update_retain_hours(
        &self,
        id: i64,
        retain_hours: Option<i32>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE uploads
            SET retain_hours = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(retain_hours)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
