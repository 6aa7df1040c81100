mod inventory_query_service;
mod order_query_service;
mod purchase_service;

pub use inventory_query_service::InventoryQueryService;
pub use order_query_service::OrderQueryService;
pub use purchase_service::{
    PurchaseRequest, PurchaseService, PurchaseStage, DEFAULT_PAYMENT_TIMEOUT,
};

use crate::application::ApplicationError;
use crate::domain::model::{Concert, ConcertId, Money, OrderId};
use crate::domain::port::{ConcertRepository, Logger, OrderRepository, TicketInventory};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// コンサートアプリケーションサービス
pub struct ConcertApplicationService {
    concert_repository: Arc<dyn ConcertRepository>,
    inventory: Arc<dyn TicketInventory>,
}

impl ConcertApplicationService {
    /// 新しいコンサートアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `concert_repository` - コンサートリポジトリ
    /// * `inventory` - チケット在庫
    pub fn new(
        concert_repository: Arc<dyn ConcertRepository>,
        inventory: Arc<dyn TicketInventory>,
    ) -> Self {
        Self {
            concert_repository,
            inventory,
        }
    }

    /// 未公開のコンサートを作成
    ///
    /// # Returns
    /// * `Ok(ConcertId)` - 作成されたコンサートのID
    /// * `Err(ApplicationError)` - 作成失敗
    pub async fn create_concert(
        &self,
        title: String,
        ticket_price: Money,
    ) -> Result<ConcertId, ApplicationError> {
        let concert = Concert::new(ConcertId::new(), title, ticket_price);
        self.concert_repository.save(&concert).await?;
        Ok(concert.id())
    }

    /// コンサートを公開
    ///
    /// # Arguments
    /// * `concert_id` - コンサートID
    /// * `at` - 公開日時（未来の日時なら、その時刻まで購入できない）
    pub async fn publish_concert(
        &self,
        concert_id: ConcertId,
        at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let mut concert = self.find_concert(concert_id).await?;
        concert.publish(at);
        self.concert_repository.save(&concert).await?;
        Ok(())
    }

    /// 現在のチケット価格でチケットを発行して在庫に追加
    ///
    /// # Arguments
    /// * `concert_id` - コンサートID
    /// * `quantity` - 発行枚数
    pub async fn add_tickets(
        &self,
        concert_id: ConcertId,
        quantity: u32,
    ) -> Result<(), ApplicationError> {
        let concert = self.find_concert(concert_id).await?;
        let tickets = concert.issue_tickets(quantity)?;
        self.inventory.add_tickets(tickets).await?;
        Ok(())
    }

    /// コンサートIDでコンサートを取得
    pub async fn get_concert(
        &self,
        concert_id: ConcertId,
    ) -> Result<Option<Concert>, ApplicationError> {
        self.concert_repository
            .find_by_id(concert_id)
            .await
            .map_err(ApplicationError::from)
    }

    async fn find_concert(&self, concert_id: ConcertId) -> Result<Concert, ApplicationError> {
        self.concert_repository
            .find_by_id(concert_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("コンサートが見つかりません: {}", concert_id))
            })
    }
}

/// 注文アプリケーションサービス
/// 購入後の注文キャンセルを担当
pub struct OrderApplicationService {
    order_repository: Arc<dyn OrderRepository>,
    inventory: Arc<dyn TicketInventory>,
    logger: Arc<dyn Logger>,
}

impl OrderApplicationService {
    /// 新しい注文アプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `order_repository` - 注文リポジトリ
    /// * `inventory` - チケット在庫
    /// * `logger` - ロガー
    pub fn new(
        order_repository: Arc<dyn OrderRepository>,
        inventory: Arc<dyn TicketInventory>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            order_repository,
            inventory,
            logger,
        }
    }

    /// 注文をキャンセル
    /// 紐付いたチケットをすべて販売可能に戻し、注文を削除する
    ///
    /// # Arguments
    /// * `order_id` - 注文ID
    ///
    /// # Returns
    /// * `Ok(u32)` - 解放したチケット数
    /// * `Err(ApplicationError::NotFound)` - 注文が存在しない
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<u32, ApplicationError> {
        let order = self
            .order_repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("注文が見つかりません: {}", order_id))
            })?;

        // 検索後に別のキャンセルが先に完了していれば在庫側で検出される
        let released = self
            .inventory
            .cancel_order(&order)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("注文が見つかりません: {}", order_id))
            })?;

        let mut context = HashMap::new();
        context.insert("order_id".to_string(), order_id.to_string());
        context.insert("concert_id".to_string(), order.concert_id().to_string());
        context.insert("released".to_string(), released.to_string());
        self.logger.info(
            "OrderApplicationService",
            "Order cancelled",
            None,
            Some(context),
        );

        Ok(released)
    }
}
