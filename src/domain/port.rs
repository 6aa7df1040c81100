// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::error::DomainError;
use crate::domain::model::{
    Concert, ConcertId, Email, Money, Order, OrderId, Reservation, Ticket,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// 指定レベルのログを出力
    fn log(
        &self,
        level: LogLevel,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.log(LogLevel::Debug, component, message, correlation_id, context);
    }

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.log(LogLevel::Info, component, message, correlation_id, context);
    }

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.log(LogLevel::Warning, component, message, correlation_id, context);
    }

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.log(LogLevel::Error, component, message, correlation_id, context);
    }
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作に失敗
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// データの取得に失敗
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
}

/// 在庫操作のエラー型
/// ビジネスルール違反と永続化の失敗を区別する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 決済エラー型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    /// 決済ゲートウェイが明示的に拒否した
    #[error("Payment declined: {0}")]
    Declined(String),
    /// 決済ゲートウェイとの通信などで失敗した
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    /// 決済が時間内に完了しなかった
    #[error("Payment timed out after {0:?}")]
    TimedOut(Duration),
}

/// コンサートリポジトリトレイト
#[async_trait]
pub trait ConcertRepository: Send + Sync {
    /// コンサートを保存する
    async fn save(&self, concert: &Concert) -> Result<(), RepositoryError>;

    /// コンサートIDでコンサートを検索する
    ///
    /// # Returns
    /// * `Ok(Some(Concert))` - コンサートが見つかった
    /// * `Ok(None)` - コンサートが見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_id(&self, concert_id: ConcertId) -> Result<Option<Concert>, RepositoryError>;
}

/// チケット在庫トレイト
/// コンサート単位の在庫を管理する唯一の共有可変リソース
///
/// 実装は同じコンサートに対する `reserve` / `release` / `commit` / `cancel_order` を
/// 直列化しなければならない。異なるコンサート間では互いに待たせない。
#[async_trait]
pub trait TicketInventory: Send + Sync {
    /// 発行したチケットを在庫に追加する
    async fn add_tickets(&self, tickets: Vec<Ticket>) -> Result<(), RepositoryError>;

    /// 販売可能なチケットを指定枚数だけ予約する
    /// 在庫不足の場合はどのチケットも変更しない
    ///
    /// # Returns
    /// * `Ok(Reservation)` - 予約成功
    /// * `Err(InventoryError::Domain(DomainError::InsufficientInventory))` - 在庫不足
    async fn reserve(
        &self,
        concert_id: ConcertId,
        quantity: u32,
    ) -> Result<Reservation, InventoryError>;

    /// 予約したチケットを販売可能に戻す（べき等）
    async fn release(&self, reservation: &Reservation) -> Result<(), RepositoryError>;

    /// 注文を保存し、予約したチケットを一度の原子的な操作で注文に紐付ける
    async fn commit(&self, reservation: &Reservation, order: &Order)
        -> Result<(), InventoryError>;

    /// 注文に紐付いたチケットを販売可能に戻し、注文を削除する
    ///
    /// # Returns
    /// * `Ok(Some(u32))` - 解放したチケット数
    /// * `Ok(None)` - 注文がすでに存在しない（何も変更しない）
    async fn cancel_order(&self, order: &Order) -> Result<Option<u32>, RepositoryError>;

    /// 販売可能なチケット数
    async fn tickets_remaining(&self, concert_id: ConcertId) -> Result<u32, RepositoryError>;
}

/// 注文リポジトリトレイト
/// 注文の作成と削除は `TicketInventory` がチケットの紐付けと同時に行う
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 注文IDで注文を検索する
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// コンサートと顧客メールアドレスで注文を検索する
    async fn find_by_concert_and_email(
        &self,
        concert_id: ConcertId,
        email: &Email,
    ) -> Result<Vec<Order>, RepositoryError>;
}

/// 決済ゲートウェイトレイト
/// 外部の決済サービスとの契約: 成功か失敗のみ
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 指定金額を決済トークンで請求する
    async fn charge(&self, amount: Money, token: &str) -> Result<(), PaymentError>;
}
