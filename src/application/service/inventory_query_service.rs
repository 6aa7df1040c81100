use crate::application::ApplicationError;
use crate::domain::model::ConcertId;
use crate::domain::port::TicketInventory;
use std::sync::Arc;

/// 在庫クエリサービス
/// 読み取り専用の在庫操作を提供する
pub struct InventoryQueryService {
    inventory: Arc<dyn TicketInventory>,
}

impl InventoryQueryService {
    /// 新しい在庫クエリサービスを作成
    ///
    /// # Arguments
    /// * `inventory` - チケット在庫
    pub fn new(inventory: Arc<dyn TicketInventory>) -> Self {
        Self { inventory }
    }

    /// 販売可能なチケット数を取得
    /// 予約中・販売済みのチケットは含まない
    pub async fn tickets_remaining(&self, concert_id: ConcertId) -> Result<u32, ApplicationError> {
        self.inventory
            .tickets_remaining(concert_id)
            .await
            .map_err(ApplicationError::from)
    }
}
