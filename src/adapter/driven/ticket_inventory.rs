use crate::adapter::database_error::DatabaseError;
use crate::domain::error::DomainError;
use crate::domain::model::{
    ConcertId, Money, Order, Reservation, ReservationToken, Ticket, TicketId, TicketState,
};
use crate::domain::port::{InventoryError, RepositoryError, TicketInventory};
use async_trait::async_trait;
use sqlx::mysql::MySqlConnection;
use sqlx::{MySql, Pool, Row, Transaction};

/// MySQLチケット在庫
///
/// 在庫を変更する操作はすべて、最初にコンサート行を `SELECT ... FOR UPDATE` で
/// ロックするトランザクション内で実行する。これにより同じコンサートへの操作は
/// 直列化され、異なるコンサート間では互いに待たない。
#[derive(Clone)]
pub struct MySqlTicketInventory {
    pool: Pool<MySql>,
}

impl MySqlTicketInventory {
    /// 新しいMySQLチケット在庫を作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, MySql>, DatabaseError> {
        self.pool.begin().await.map_err(|e| {
            DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
        })
    }
}

/// コンサート行をロックする
/// コンサートが存在しない場合はロックする行がないが、その場合は在庫も存在しない
async fn lock_concert(
    conn: &mut MySqlConnection,
    concert_id: ConcertId,
) -> Result<(), DatabaseError> {
    sqlx::query("SELECT id FROM concerts WHERE id = ? FOR UPDATE")
        .bind(concert_id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("コンサートのロックに失敗しました: {}", e)))?;
    Ok(())
}

async fn count_available(
    conn: &mut MySqlConnection,
    concert_id: ConcertId,
) -> Result<u32, DatabaseError> {
    let count: i64 = sqlx::query(
        r#"
        SELECT COUNT(*) AS remaining FROM tickets
        WHERE concert_id = ? AND order_id IS NULL AND reservation_token IS NULL
        "#,
    )
    .bind(concert_id.to_string())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| DatabaseError::QueryError(format!("残りチケット数の取得に失敗しました: {}", e)))?
    .get("remaining");

    u32::try_from(count)
        .map_err(|e| DatabaseError::InvalidRow(format!("残りチケット数が不正です: {}", e)))
}

async fn commit_tx(tx: Transaction<'_, MySql>) -> Result<(), DatabaseError> {
    tx.commit().await.map_err(|e| {
        DatabaseError::QueryError(format!("トランザクションのコミットに失敗しました: {}", e))
    })
}

#[async_trait]
impl TicketInventory for MySqlTicketInventory {
    async fn add_tickets(&self, tickets: Vec<Ticket>) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;

        for ticket in &tickets {
            sqlx::query(
                r#"
                INSERT INTO tickets (id, concert_id, price, reservation_token, order_id)
                VALUES (?, ?, ?, NULL, NULL)
                "#,
            )
            .bind(ticket.id().to_string())
            .bind(ticket.concert_id().to_string())
            .bind(ticket.price().cents())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("チケットの追加に失敗しました: {}", e)))?;
        }

        commit_tx(tx).await?;
        Ok(())
    }

    async fn reserve(
        &self,
        concert_id: ConcertId,
        quantity: u32,
    ) -> Result<Reservation, InventoryError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity.into());
        }

        let mut tx = self.begin().await.map_err(RepositoryError::from)?;
        lock_concert(&mut tx, concert_id)
            .await
            .map_err(RepositoryError::from)?;

        let available = count_available(&mut tx, concert_id)
            .await
            .map_err(RepositoryError::from)?;
        if available < quantity {
            // ロールバックはトランザクションのドロップ時に行われる
            return Err(DomainError::InsufficientInventory {
                requested: quantity,
                available,
            }
            .into());
        }

        let token = ReservationToken::generate();
        sqlx::query(
            r#"
            UPDATE tickets SET reservation_token = ?
            WHERE concert_id = ? AND order_id IS NULL AND reservation_token IS NULL
            LIMIT ?
            "#,
        )
        .bind(token.to_string())
        .bind(concert_id.to_string())
        .bind(quantity)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("チケットの予約に失敗しました: {}", e)))
        .map_err(RepositoryError::from)?;

        let rows = sqlx::query("SELECT id, price FROM tickets WHERE reservation_token = ?")
            .bind(token.to_string())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!("予約したチケットの取得に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        let mut tickets = Vec::with_capacity(rows.len());
        for row in rows {
            let id = TicketId::from_string(row.get("id"))
                .map_err(|e| DatabaseError::InvalidRow(format!("チケットIDの解析に失敗しました: {}", e)))
                .map_err(RepositoryError::from)?;
            let price = Money::from_cents(row.get::<i64, _>("price"))?;
            tickets.push(Ticket::reconstruct(
                id,
                concert_id,
                price,
                TicketState::Reserved { token },
            ));
        }

        commit_tx(tx).await.map_err(RepositoryError::from)?;
        Ok(Reservation::new(concert_id, token, tickets))
    }

    async fn release(&self, reservation: &Reservation) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        lock_concert(&mut tx, reservation.concert_id()).await?;

        // 確定済みのチケットには触れない
        sqlx::query(
            r#"
            UPDATE tickets SET reservation_token = NULL
            WHERE reservation_token = ? AND order_id IS NULL
            "#,
        )
        .bind(reservation.token().to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("予約の解放に失敗しました: {}", e)))?;

        commit_tx(tx).await?;
        Ok(())
    }

    async fn commit(
        &self,
        reservation: &Reservation,
        order: &Order,
    ) -> Result<(), InventoryError> {
        let mut tx = self.begin().await.map_err(RepositoryError::from)?;
        lock_concert(&mut tx, reservation.concert_id())
            .await
            .map_err(RepositoryError::from)?;

        sqlx::query("INSERT INTO orders (id, concert_id, email, amount) VALUES (?, ?, ?, ?)")
            .bind(order.id().to_string())
            .bind(order.concert_id().to_string())
            .bind(order.email().as_str())
            .bind(order.amount().cents())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("注文の保存に失敗しました: {}", e)))
            .map_err(RepositoryError::from)?;

        let bound = sqlx::query(
            r#"
            UPDATE tickets SET order_id = ?, reservation_token = NULL
            WHERE reservation_token = ? AND order_id IS NULL
            "#,
        )
        .bind(order.id().to_string())
        .bind(reservation.token().to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("チケットの確定に失敗しました: {}", e)))
        .map_err(RepositoryError::from)?
        .rows_affected();

        if bound != u64::from(reservation.quantity()) {
            // 予約の一部が失われている。注文の挿入ごとロールバックする
            return Err(DomainError::InvalidValue(format!(
                "予約 {} のチケットが {} 枚中 {} 枚しか押さえられていません",
                reservation.token(),
                reservation.quantity(),
                bound
            ))
            .into());
        }

        commit_tx(tx).await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn cancel_order(&self, order: &Order) -> Result<Option<u32>, RepositoryError> {
        let mut tx = self.begin().await?;
        lock_concert(&mut tx, order.concert_id()).await?;

        let deleted = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(order.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("注文の削除に失敗しました: {}", e)))?
            .rows_affected();
        if deleted == 0 {
            // 別のキャンセルが先に完了している
            return Ok(None);
        }

        let released = sqlx::query("UPDATE tickets SET order_id = NULL WHERE order_id = ?")
            .bind(order.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("チケットの解放に失敗しました: {}", e)))?
            .rows_affected();

        commit_tx(tx).await?;
        Ok(Some(u32::try_from(released).unwrap_or(u32::MAX)))
    }

    async fn tickets_remaining(&self, concert_id: ConcertId) -> Result<u32, RepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            DatabaseError::ConnectionError(format!("コネクションの取得に失敗しました: {}", e))
        })?;
        Ok(count_available(&mut conn, concert_id).await?)
    }
}
