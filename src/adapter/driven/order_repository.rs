use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{ConcertId, Email, Money, Order, OrderId, TicketId};
use crate::domain::port::{OrderRepository, RepositoryError};
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

/// MySQL注文リポジトリ
/// 注文の書き込みは `MySqlTicketInventory` がチケットの確定と同じトランザクションで行う。
/// このリポジトリは読み取り専用
pub struct MySqlOrderRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderRepository {
    /// 新しいMySQL注文リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    ///
    /// # Returns
    /// * MySqlOrderRepositoryのインスタンス
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// JOINされた結果から注文のリストを再構築する
    /// 行は注文IDでまとまって並んでいる前提
    fn build_orders_from_rows(rows: &[MySqlRow]) -> Result<Vec<Order>, DatabaseError> {
        let mut orders = Vec::new();
        let mut start = 0;

        while start < rows.len() {
            let order_id_str: &str = rows[start].get("id");
            let end = rows[start..]
                .iter()
                .position(|row| row.get::<&str, _>("id") != order_id_str)
                .map_or(rows.len(), |offset| start + offset);

            orders.push(Self::build_order(&rows[start..end])?);
            start = end;
        }

        Ok(orders)
    }

    fn build_order(rows: &[MySqlRow]) -> Result<Order, DatabaseError> {
        let first_row = &rows[0];

        let order_id = OrderId::from_string(first_row.get("id"))
            .map_err(|e| DatabaseError::InvalidRow(format!("注文IDの解析に失敗しました: {}", e)))?;

        let concert_id = ConcertId::from_string(first_row.get("concert_id")).map_err(|e| {
            DatabaseError::InvalidRow(format!("コンサートIDの解析に失敗しました: {}", e))
        })?;

        let email = Email::new(first_row.get::<String, _>("email")).map_err(|e| {
            DatabaseError::InvalidRow(format!("メールアドレスの解析に失敗しました: {}", e))
        })?;

        let amount = Money::from_cents(first_row.get::<i64, _>("amount"))
            .map_err(|e| DatabaseError::InvalidRow(format!("金額の解析に失敗しました: {}", e)))?;

        let mut ticket_ids = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(ticket_id) = row.get::<Option<String>, _>("ticket_id") {
                let ticket_id = TicketId::from_string(&ticket_id).map_err(|e| {
                    DatabaseError::InvalidRow(format!("チケットIDの解析に失敗しました: {}", e))
                })?;
                ticket_ids.push(ticket_id);
            }
        }

        Order::reconstruct(order_id, concert_id, email, amount, ticket_ids)
            .map_err(|e| DatabaseError::InvalidRow(format!("注文の再構築に失敗しました: {}", e)))
    }
}

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.concert_id, o.email, o.amount, t.id AS ticket_id
            FROM orders o
            LEFT JOIN tickets t ON t.order_id = o.id
            WHERE o.id = ?
            ORDER BY t.id
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("注文の取得に失敗しました: {}", e)))?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self::build_order(&rows)?))
    }

    async fn find_by_concert_and_email(
        &self,
        concert_id: ConcertId,
        email: &Email,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.concert_id, o.email, o.amount, t.id AS ticket_id
            FROM orders o
            LEFT JOIN tickets t ON t.order_id = o.id
            WHERE o.concert_id = ? AND o.email = ?
            ORDER BY o.id, t.id
            "#,
        )
        .bind(concert_id.to_string())
        .bind(email.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("注文一覧の取得に失敗しました: {}", e)))?;

        Ok(Self::build_orders_from_rows(&rows)?)
    }
}
