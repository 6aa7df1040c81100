use crate::application::service::PurchaseRequest;
use crate::domain::model::{ConcertId, Email};
use serde::{Deserialize, Serialize};

/// チケット購入用のリクエストDTO
/// 形の検証はこの境界で行い、アプリケーション層には検証済みの値だけを渡す
#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseTicketsRequest {
    pub email: Option<String>,
    pub ticket_quantity: Option<i64>,
    pub payment_token: Option<String>,
}

impl PurchaseTicketsRequest {
    /// リクエストを検証して購入リクエストに変換する
    ///
    /// # Returns
    /// * `Ok(PurchaseRequest)` - 検証済みの購入リクエスト
    /// * `Err(Vec<&'static str>)` - 不正なフィールド名の一覧
    pub fn validate(self, concert_id: ConcertId) -> Result<PurchaseRequest, Vec<&'static str>> {
        let mut invalid = Vec::new();

        let email = self.email.and_then(|email| Email::new(email).ok());
        if email.is_none() {
            invalid.push("email");
        }

        let ticket_quantity = self
            .ticket_quantity
            .filter(|quantity| *quantity >= 1)
            .and_then(|quantity| u32::try_from(quantity).ok());
        if ticket_quantity.is_none() {
            invalid.push("ticket_quantity");
        }

        let payment_token = self.payment_token.filter(|token| !token.trim().is_empty());
        if payment_token.is_none() {
            invalid.push("payment_token");
        }

        match (email, ticket_quantity, payment_token) {
            (Some(email), Some(ticket_quantity), Some(payment_token)) => Ok(PurchaseRequest {
                concert_id,
                email,
                ticket_quantity,
                payment_token,
            }),
            _ => Err(invalid),
        }
    }
}
