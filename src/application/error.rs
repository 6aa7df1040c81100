use crate::domain::error::DomainError;
use crate::domain::model::{ConcertId, Money};
use crate::domain::port::{InventoryError, PaymentError, RepositoryError};

/// アプリケーション層のエラー型
/// 購入フローの失敗分類と、ドメイン・リポジトリのエラーをラップする
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplicationError {
    /// コンサートが存在しない、または未公開
    #[error("Concert not available: {0}")]
    ConcertNotAvailable(ConcertId),
    /// 販売可能なチケットが要求枚数に足りない
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },
    /// 決済が拒否された、またはエラー・タイムアウトになった
    #[error("Payment failed: {0}")]
    PaymentFailed(PaymentError),
    /// 決済成功後に注文の確定に失敗した（手動での照合が必要）
    #[error("Charged {amount} but order could not be fulfilled: {reason}")]
    FulfillmentFailed { amount: Money, reason: String },
    /// ドメインエラー（ビジネスルール違反）
    #[error("Domain error: {0}")]
    Domain(DomainError),
    /// リポジトリエラー（永続化の失敗）
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// エンティティが見つからない
    #[error("Not found: {0}")]
    NotFound(String),
    /// 購入処理タスクの異常終了
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// 呼び出し側が条件を変えて再送できる拒否かどうか
    /// 在庫不足と決済失敗は境界で区別せずに同じ扱いにする
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ApplicationError::InsufficientInventory { .. } | ApplicationError::PaymentFailed(_)
        )
    }
}

// From実装でエラー変換を簡潔に
impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientInventory {
                requested,
                available,
            } => ApplicationError::InsufficientInventory {
                requested,
                available,
            },
            other => ApplicationError::Domain(other),
        }
    }
}

impl From<InventoryError> for ApplicationError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Domain(err) => err.into(),
            InventoryError::Repository(err) => ApplicationError::Repository(err),
        }
    }
}

impl From<PaymentError> for ApplicationError {
    fn from(err: PaymentError) -> Self {
        ApplicationError::PaymentFailed(err)
    }
}
