use crate::domain::model::Order;
use serde::{Deserialize, Serialize};

/// 購入完了時のレスポンスDTO
/// 金額は最小通貨単位（セント）
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct OrderResponse {
    pub order_id: String,
    pub email: String,
    pub ticket_quantity: u32,
    pub amount: i64,
}

impl OrderResponse {
    /// ドメインオブジェクトからOrderResponseを作成
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            email: order.email().as_str().to_string(),
            ticket_quantity: order.ticket_quantity(),
            amount: order.amount().cents(),
        }
    }
}

/// 注文キャンセル時のレスポンスDTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CancelOrderResponse {
    pub order_id: String,
    pub released_tickets: u32,
}
