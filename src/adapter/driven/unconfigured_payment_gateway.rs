use crate::domain::model::Money;
use crate::domain::port::{PaymentError, PaymentGateway};
use async_trait::async_trait;

/// 決済プロバイダーが設定されていないときの決済ゲートウェイ
/// すべての請求を拒否するため、購入は決済失敗となり予約は解放される
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredPaymentGateway;

impl UnconfiguredPaymentGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for UnconfiguredPaymentGateway {
    async fn charge(&self, amount: Money, _token: &str) -> Result<(), PaymentError> {
        Err(PaymentError::Gateway(format!(
            "no payment provider configured; refusing to charge {}",
            amount
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_charge_is_refused() {
        let gateway = UnconfiguredPaymentGateway::new();

        let result = gateway
            .charge(Money::from_cents(2500).unwrap(), "valid-token")
            .await;

        assert!(
            matches!(result, Err(PaymentError::Gateway(msg)) if msg.contains("no payment provider"))
        );
    }
}
