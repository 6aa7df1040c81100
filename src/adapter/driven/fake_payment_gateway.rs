use crate::domain::model::Money;
use crate::domain::port::{PaymentError, PaymentGateway};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 最初の請求の直前に一度だけ実行されるフック
pub type BeforeChargeHook = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// 常に成功するテスト用トークン
const VALID_TEST_TOKEN: &str = "valid-token";

/// テスト用の決済ゲートウェイ
/// 有効なトークンでの請求を記録し、それ以外は拒否する
#[derive(Default)]
pub struct FakePaymentGateway {
    charges: Mutex<Vec<Money>>,
    before_first_charge: Mutex<Option<BeforeChargeHook>>,
}

impl FakePaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に成功する決済トークン
    pub fn valid_test_token(&self) -> &'static str {
        VALID_TEST_TOKEN
    }

    /// これまでに成功した請求の合計金額
    pub fn total_charges(&self) -> Money {
        self.recorded_charges().iter().copied().sum()
    }

    /// これまでに成功した請求の件数
    pub fn charge_count(&self) -> usize {
        self.recorded_charges().len()
    }

    /// 請求の記録
    /// 記録中に別スレッドがパニックしても、記録済みの請求はそのまま読める
    fn recorded_charges(&self) -> MutexGuard<'_, Vec<Money>> {
        self.charges.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 最初の請求を処理する直前に実行するフックを登録する
    /// 請求の途中で別の購入を割り込ませるテストに使う
    pub fn before_first_charge<F, Fut>(&self, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: BeforeChargeHook = Box::new(move || Box::pin(hook()));
        *self
            .before_first_charge
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn charge(&self, amount: Money, token: &str) -> Result<(), PaymentError> {
        // フック内の請求で再度呼ばれないよう、実行前に取り外す
        let hook = {
            let mut slot = self
                .before_first_charge
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            slot.take()
        };
        if let Some(hook) = hook {
            hook().await;
        }

        if token != VALID_TEST_TOKEN {
            return Err(PaymentError::Declined(format!(
                "invalid payment token: {}",
                token
            )));
        }

        self.recorded_charges().push(amount);
        Ok(())
    }
}
