use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{Concert, ConcertId, Money};
use crate::domain::port::{ConcertRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool, Row};

/// MySQLコンサートリポジトリ
#[derive(Clone)]
pub struct MySqlConcertRepository {
    pool: Pool<MySql>,
}

impl MySqlConcertRepository {
    /// 新しいMySQLコンサートリポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConcertRepository for MySqlConcertRepository {
    async fn save(&self, concert: &Concert) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO concerts (id, title, ticket_price, published_at)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                title = VALUES(title),
                ticket_price = VALUES(ticket_price),
                published_at = VALUES(published_at)
            "#,
        )
        .bind(concert.id().to_string())
        .bind(concert.title())
        .bind(concert.ticket_price().cents())
        .bind(concert.published_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("コンサートの保存に失敗しました: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, concert_id: ConcertId) -> Result<Option<Concert>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, ticket_price, published_at FROM concerts WHERE id = ?",
        )
        .bind(concert_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("コンサートの取得に失敗しました: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let ticket_price = Money::from_cents(row.get::<i64, _>("ticket_price")).map_err(|e| {
            DatabaseError::InvalidRow(format!("チケット価格の解析に失敗しました: {}", e))
        })?;

        Ok(Some(Concert::reconstruct(
            concert_id,
            row.get("title"),
            ticket_price,
            row.get::<Option<DateTime<Utc>>, _>("published_at"),
        )))
    }
}
