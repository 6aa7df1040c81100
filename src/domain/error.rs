use crate::domain::model::TicketId;

/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// 無効な数量（例: 0枚のチケット購入）
    #[error("Invalid quantity")]
    InvalidQuantity,
    /// 在庫不足（要求枚数に対して販売可能なチケットが足りない）
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },
    /// 無効なチケット状態（例: 販売済みのチケットを予約しようとした）
    #[error("Invalid ticket state for {ticket_id}: {message}")]
    InvalidTicketState { ticket_id: TicketId, message: String },
    /// 無効な値
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
