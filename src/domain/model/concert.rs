use crate::domain::error::DomainError;
use crate::domain::model::{ConcertId, Money, Ticket};
use chrono::{DateTime, Utc};

/// コンサート集約
/// 公開状態とチケット価格を管理する
#[derive(Debug, Clone, PartialEq)]
pub struct Concert {
    id: ConcertId,
    title: String,
    ticket_price: Money,
    published_at: Option<DateTime<Utc>>,
}

impl Concert {
    /// 未公開のコンサートを作成
    pub fn new(id: ConcertId, title: impl Into<String>, ticket_price: Money) -> Self {
        Self {
            id,
            title: title.into(),
            ticket_price,
            published_at: None,
        }
    }

    /// データベースから取得したデータでコンサートを再構築
    pub fn reconstruct(
        id: ConcertId,
        title: String,
        ticket_price: Money,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            title,
            ticket_price,
            published_at,
        }
    }

    pub fn id(&self) -> ConcertId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn ticket_price(&self) -> Money {
        self.ticket_price
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    /// 指定日時に公開する
    pub fn publish(&mut self, at: DateTime<Utc>) {
        self.published_at = Some(at);
    }

    /// 指定時点で公開済みかどうか
    /// 公開日時が設定されていて、かつ過去である場合のみ公開済み
    pub fn is_published_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.published_at, Some(published_at) if published_at <= now)
    }

    /// 現在時刻で公開済みかどうか
    pub fn is_published(&self) -> bool {
        self.is_published_at(Utc::now())
    }

    /// 現在のチケット価格でチケットを発行する
    pub fn issue_tickets(&self, quantity: u32) -> Result<Vec<Ticket>, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        Ok((0..quantity)
            .map(|_| Ticket::issue(self.id, self.ticket_price))
            .collect())
    }
}
