use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::info;

use crate::error::StoreError;
use crate::models::{JobPosting, JobStats};

/// SQLite-backed posting store.
///
/// Writes are insert-if-absent keyed on `job_id`: a posting seen again in a
/// later run is ignored, and stored rows never change except for `is_new`.
#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    pub async fn new(db_url: &str) -> Result<Self> {
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            if let Some(dir) = database_dir(db_url) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating database directory {}", dir.display()))?;
            }
            info!("Creating database file");
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePool::connect(db_url).await?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database on a single pinned connection.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    pub async fn exists(&self, job_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Stores the posting unless its `job_id` is already present.
    ///
    /// Returns whether a row was written. New rows get `is_new = true`
    /// whatever the posting carries; `scraped_date` is the posting's `scraped_at`.
    pub async fn insert_if_absent(&self, job: &JobPosting) -> Result<bool, StoreError> {
        let metadata = serde_json::to_string(&job.metadata)?;

        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO jobs
                (job_id, title, company, location, salary_min, salary_max,
                 description, url, source, posted_date, scraped_date, is_new, applied, metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, 0, ?)
            ",
        )
        .bind(&job.job_id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .bind(&job.description)
        .bind(&job.url)
        .bind(&job.source)
        .bind(&job.posted_date)
        .bind(job.scraped_at)
        .bind(metadata)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Postings still flagged new, most recently scraped first.
    #[allow(dead_code)] // read by the dashboard, not by the scraping run
    pub async fn list_new(&self) -> Result<Vec<JobPosting>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT job_id, title, company, location, salary_min, salary_max, description,
                   url, source, posted_date, scraped_date, is_new, applied, metadata
            FROM jobs
            WHERE is_new = 1
            ORDER BY scraped_date DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(posting_from_row).collect()
    }

    /// Clears `is_new` for the given ids. Returns the number of rows changed.
    #[allow(dead_code)] // read by the dashboard, not by the scraping run
    pub async fn mark_processed(&self, job_ids: &[String]) -> Result<u64, StoreError> {
        if job_ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE jobs SET is_new = 0 WHERE is_new = 1 AND job_id IN (");
        let mut ids = query.separated(", ");
        for job_id in job_ids {
            ids.push_bind(job_id);
        }
        ids.push_unseparated(")");

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn stats(&self) -> Result<JobStats, StoreError> {
        let (total, new): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(is_new), 0) FROM jobs")
                .fetch_one(&self.pool)
                .await?;

        let by_source: Vec<(String, i64)> = sqlx::query_as(
            "SELECT source, COUNT(*) AS count FROM jobs GROUP BY source ORDER BY count DESC, source",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(JobStats {
            total,
            new,
            by_source,
        })
    }
}

fn posting_from_row(row: &SqliteRow) -> Result<JobPosting, StoreError> {
    let metadata: String = row.try_get("metadata")?;
    let scraped_at: DateTime<Utc> = row.try_get("scraped_date")?;

    Ok(JobPosting {
        job_id: row.try_get("job_id")?,
        title: row.try_get("title")?,
        company: row.try_get("company")?,
        location: row.try_get("location")?,
        salary_min: row.try_get("salary_min")?,
        salary_max: row.try_get("salary_max")?,
        description: row.try_get("description")?,
        url: row.try_get("url")?,
        source: row.try_get("source")?,
        posted_date: row.try_get("posted_date")?,
        scraped_at,
        is_new: row.try_get("is_new")?,
        applied: row.try_get("applied")?,
        metadata: serde_json::from_str(&metadata)?,
    })
}

/// Parent directory of a file-backed SQLite url, if it has one.
fn database_dir(db_url: &str) -> Option<&Path> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path).parent().filter(|dir| !dir.as_os_str().is_empty())
}
