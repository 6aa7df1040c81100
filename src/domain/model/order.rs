use crate::domain::error::DomainError;
use crate::domain::model::{ConcertId, Email, Money, OrderId, Reservation, TicketId};

/// Order集約
/// 決済成功後にのみ作成され、購入したチケットを所有する
/// 金額は作成時に確定し、その後チケット価格が変わっても再計算しない
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    concert_id: ConcertId,
    email: Email,
    amount: Money,
    ticket_ids: Vec<TicketId>,
}

impl Order {
    /// 予約から注文を作成
    /// 金額は予約の合計金額（＝決済金額）
    pub fn for_reservation(id: OrderId, email: Email, reservation: &Reservation) -> Self {
        Self {
            id,
            concert_id: reservation.concert_id(),
            email,
            amount: reservation.total_cost(),
            ticket_ids: reservation.ticket_ids(),
        }
    }

    /// データベースから取得したデータで注文を再構築
    /// リポジトリでの使用を想定
    pub fn reconstruct(
        id: OrderId,
        concert_id: ConcertId,
        email: Email,
        amount: Money,
        ticket_ids: Vec<TicketId>,
    ) -> Result<Self, DomainError> {
        if ticket_ids.is_empty() {
            return Err(DomainError::InvalidValue(format!(
                "チケットのない注文は存在できません: {}",
                id
            )));
        }
        Ok(Self {
            id,
            concert_id,
            email,
            amount,
            ticket_ids,
        })
    }

    /// 注文IDを取得
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// コンサートIDを取得
    pub fn concert_id(&self) -> ConcertId {
        self.concert_id
    }

    /// 顧客のメールアドレスを取得
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// 決済金額を取得
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// 紐付いたチケットIDのリストを取得
    pub fn ticket_ids(&self) -> &[TicketId] {
        &self.ticket_ids
    }

    /// チケット枚数
    pub fn ticket_quantity(&self) -> u32 {
        self.ticket_ids.len() as u32
    }
}
