use crate::application::ApplicationError;
use crate::domain::model::{ConcertId, Email, Order, OrderId, Reservation};
use crate::domain::port::{
    ConcertRepository, Logger, PaymentError, PaymentGateway, TicketInventory,
};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// 決済の既定のタイムアウト
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(10);

const COMPONENT: &str = "PurchaseService";

/// 検証済みの購入リクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRequest {
    pub concert_id: ConcertId,
    pub email: Email,
    pub ticket_quantity: u32,
    pub payment_token: String,
}

/// 購入フローの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStage {
    Requested,
    Reserving,
    Charging,
    Committing,
    Releasing,
    Completed,
    Rejected,
}

impl fmt::Display for PurchaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            PurchaseStage::Requested => "Requested",
            PurchaseStage::Reserving => "Reserving",
            PurchaseStage::Charging => "Charging",
            PurchaseStage::Committing => "Committing",
            PurchaseStage::Releasing => "Releasing",
            PurchaseStage::Completed => "Completed",
            PurchaseStage::Rejected => "Rejected",
        };
        write!(f, "{}", stage)
    }
}

/// 購入サービス
/// 予約 → 請求 → 確定／解放 の購入フローを調整する
///
/// 在庫の排他は予約・確定・解放の間だけ保持され、請求中は保持しない。
/// 一回の購入リクエストにつき請求は高々一度で、予約は必ず確定か解放で解決される。
#[derive(Clone)]
pub struct PurchaseService {
    concert_repository: Arc<dyn ConcertRepository>,
    inventory: Arc<dyn TicketInventory>,
    payment_gateway: Arc<dyn PaymentGateway>,
    logger: Arc<dyn Logger>,
    payment_timeout: Duration,
}

impl PurchaseService {
    /// 新しい購入サービスを作成
    ///
    /// # Arguments
    /// * `concert_repository` - コンサートリポジトリ
    /// * `inventory` - チケット在庫
    /// * `payment_gateway` - 決済ゲートウェイ
    /// * `logger` - ロガー
    pub fn new(
        concert_repository: Arc<dyn ConcertRepository>,
        inventory: Arc<dyn TicketInventory>,
        payment_gateway: Arc<dyn PaymentGateway>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            concert_repository,
            inventory,
            payment_gateway,
            logger,
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
        }
    }

    /// 決済のタイムアウトを設定
    pub fn with_payment_timeout(mut self, payment_timeout: Duration) -> Self {
        self.payment_timeout = payment_timeout;
        self
    }

    /// チケットを購入する
    ///
    /// 購入処理は独立したタスクで実行するため、呼び出し側がこのFutureを
    /// 途中で破棄しても予約は確定か解放のどちらかで必ず解決される。
    ///
    /// # Returns
    /// * `Ok(Order)` - 購入成功
    /// * `Err(ApplicationError::ConcertNotAvailable)` - コンサートが存在しないか未公開
    /// * `Err(ApplicationError::InsufficientInventory)` - 在庫不足（請求なし）
    /// * `Err(ApplicationError::PaymentFailed)` - 決済失敗（予約は解放済み）
    pub async fn purchase_tickets(
        &self,
        request: PurchaseRequest,
    ) -> Result<Order, ApplicationError> {
        let service = self.clone();
        let correlation_id = Uuid::new_v4();
        tokio::spawn(async move { service.run_purchase(request, correlation_id).await })
            .await
            .map_err(|e| ApplicationError::Internal(format!("購入処理が異常終了しました: {}", e)))?
    }

    async fn run_purchase(
        &self,
        request: PurchaseRequest,
        correlation_id: Uuid,
    ) -> Result<Order, ApplicationError> {
        let mut context = HashMap::new();
        context.insert("concert_id".to_string(), request.concert_id.to_string());
        context.insert(
            "ticket_quantity".to_string(),
            request.ticket_quantity.to_string(),
        );
        self.enter(PurchaseStage::Requested, correlation_id, &context);

        let concert = self
            .concert_repository
            .find_by_id(request.concert_id)
            .await?
            .filter(|concert| concert.is_published());
        if concert.is_none() {
            return Err(self.reject(
                ApplicationError::ConcertNotAvailable(request.concert_id),
                correlation_id,
                &context,
            ));
        }

        self.enter(PurchaseStage::Reserving, correlation_id, &context);
        let reservation = match self
            .inventory
            .reserve(request.concert_id, request.ticket_quantity)
            .await
        {
            Ok(reservation) => reservation,
            Err(err) => return Err(self.reject(err.into(), correlation_id, &context)),
        };

        let amount = reservation.total_cost();
        context.insert("amount".to_string(), amount.cents().to_string());
        context.insert(
            "reservation_token".to_string(),
            reservation.token().to_string(),
        );

        self.enter(PurchaseStage::Charging, correlation_id, &context);
        if let Err(payment_error) = self.charge(&reservation, &request.payment_token).await {
            self.enter(PurchaseStage::Releasing, correlation_id, &context);
            // 解放の失敗はrelease内でログ済み。呼び出し側には決済失敗をそのまま返す
            let _ = self.release(&reservation, correlation_id, &context).await;
            return Err(self.reject(
                ApplicationError::PaymentFailed(payment_error),
                correlation_id,
                &context,
            ));
        }

        self.enter(PurchaseStage::Committing, correlation_id, &context);
        let order = Order::for_reservation(OrderId::new(), request.email, &reservation);
        if let Err(err) = self.inventory.commit(&reservation, &order).await {
            // 請求済みだが注文を作成できなかった: 手動での照合が必要
            self.logger.error(
                COMPONENT,
                &format!("Charged but order could not be committed: {}", err),
                Some(correlation_id),
                Some(context.clone()),
            );
            self.enter(PurchaseStage::Releasing, correlation_id, &context);
            let reason = match self.release(&reservation, correlation_id, &context).await {
                Ok(()) => err.to_string(),
                Err(release_err) => {
                    format!("{}; reservation not released: {}", err, release_err)
                }
            };
            return Err(ApplicationError::FulfillmentFailed { amount, reason });
        }

        context.insert("order_id".to_string(), order.id().to_string());
        self.enter(PurchaseStage::Completed, correlation_id, &context);
        Ok(order)
    }

    /// 予約の合計金額を一度だけ請求する
    /// タイムアウトとゲートウェイ内のパニックは決済失敗として扱う
    async fn charge(&self, reservation: &Reservation, token: &str) -> Result<(), PaymentError> {
        let charge = AssertUnwindSafe(
            self.payment_gateway
                .charge(reservation.total_cost(), token),
        )
        .catch_unwind();
        match tokio::time::timeout(self.payment_timeout, charge).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(PaymentError::Gateway(format!(
                "payment gateway panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(PaymentError::TimedOut(self.payment_timeout)),
        }
    }

    async fn release(
        &self,
        reservation: &Reservation,
        correlation_id: Uuid,
        context: &HashMap<String, String>,
    ) -> Result<(), ApplicationError> {
        self.inventory.release(reservation).await.map_err(|err| {
            self.logger.error(
                COMPONENT,
                &format!("Failed to release reserved tickets: {}", err),
                Some(correlation_id),
                Some(context.clone()),
            );
            ApplicationError::from(err)
        })
    }

    fn enter(
        &self,
        stage: PurchaseStage,
        correlation_id: Uuid,
        context: &HashMap<String, String>,
    ) {
        self.logger.info(
            COMPONENT,
            &format!("Purchase stage: {}", stage),
            Some(correlation_id),
            Some(context.clone()),
        );
    }

    fn reject(
        &self,
        err: ApplicationError,
        correlation_id: Uuid,
        context: &HashMap<String, String>,
    ) -> ApplicationError {
        self.logger.warn(
            COMPONENT,
            &format!("Purchase stage: {} ({})", PurchaseStage::Rejected, err),
            Some(correlation_id),
            Some(context.clone()),
        );
        err
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
