//! Database initialization and the Postgres stroke store.

use canvas::camera::Point;
use canvas::doc::{BoardId, Stroke, StrokeId};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use crate::services::persistence::{StoreError, StrokeRepo};

/// Initialize the PostgreSQL connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

/// [`StrokeRepo`] backed by the `boards` and `strokes` tables.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type StrokeRow = (StrokeId, Json<Vec<Point>>, String);

fn row_to_stroke((id, Json(path), color): StrokeRow) -> Stroke {
    Stroke { id, path, color }
}

#[async_trait::async_trait]
impl StrokeRepo for PgStore {
    async fn list_strokes(&self, board: &BoardId) -> Result<Vec<Stroke>, StoreError> {
        let rows = sqlx::query_as::<_, StrokeRow>(
            "SELECT id, path, color FROM strokes WHERE board_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(board.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_stroke).collect())
    }

    async fn board_exists(&self, board: &BoardId) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM boards WHERE id = $1)")
            .bind(board.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert_stroke(&self, board: &BoardId, path: Vec<Point>, color: String) -> Result<Stroke, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO boards (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(board.as_str())
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query_as::<_, StrokeRow>(
            "INSERT INTO strokes (board_id, path, color) VALUES ($1, $2, $3) RETURNING id, path, color",
        )
        .bind(board.as_str())
        .bind(Json(path))
        .bind(color)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row_to_stroke(row))
    }

    async fn delete_stroke(&self, board: &BoardId, id: StrokeId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM strokes WHERE id = $1 AND board_id = $2")
            .bind(id)
            .bind(board.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
