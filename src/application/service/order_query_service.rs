use crate::application::ApplicationError;
use crate::domain::model::{ConcertId, Email, Order, OrderId};
use crate::domain::port::OrderRepository;
use std::sync::Arc;

/// 注文クエリサービス
/// 読み取り専用の注文操作を提供する
pub struct OrderQueryService {
    order_repository: Arc<dyn OrderRepository>,
}

impl OrderQueryService {
    /// 新しい注文クエリサービスを作成
    ///
    /// # Arguments
    /// * `order_repository` - 注文リポジトリ
    pub fn new(order_repository: Arc<dyn OrderRepository>) -> Self {
        Self { order_repository }
    }

    /// 注文IDで注文を取得
    ///
    /// # Returns
    /// * `Ok(Some(Order))` - 注文が見つかった
    /// * `Ok(None)` - 注文が見つからなかった
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn get_order_by_id(&self, id: OrderId) -> Result<Option<Order>, ApplicationError> {
        self.order_repository
            .find_by_id(id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 顧客がコンサートに対して持つ注文を取得
    pub async fn orders_for(
        &self,
        concert_id: ConcertId,
        email: &Email,
    ) -> Result<Vec<Order>, ApplicationError> {
        self.order_repository
            .find_by_concert_and_email(concert_id, email)
            .await
            .map_err(ApplicationError::from)
    }

    /// 顧客がコンサートの注文を持っているか
    pub async fn has_order_for(
        &self,
        concert_id: ConcertId,
        email: &Email,
    ) -> Result<bool, ApplicationError> {
        Ok(!self.orders_for(concert_id, email).await?.is_empty())
    }
}
