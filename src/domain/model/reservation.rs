use crate::domain::model::{ConcertId, Money, ReservationToken, Ticket, TicketId};

/// 予約
/// 一回の購入試行の間だけ存在する、仮押さえしたチケットの集合
/// 永続化されず、注文への確定か解放のどちらかで必ず解決される
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    concert_id: ConcertId,
    token: ReservationToken,
    tickets: Vec<Ticket>,
}

impl Reservation {
    pub fn new(concert_id: ConcertId, token: ReservationToken, tickets: Vec<Ticket>) -> Self {
        Self {
            concert_id,
            token,
            tickets,
        }
    }

    pub fn concert_id(&self) -> ConcertId {
        self.concert_id
    }

    pub fn token(&self) -> ReservationToken {
        self.token
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn ticket_ids(&self) -> Vec<TicketId> {
        self.tickets.iter().map(Ticket::id).collect()
    }

    pub fn quantity(&self) -> u32 {
        self.tickets.len() as u32
    }

    /// 合計金額（保持しているチケット価格の総和）
    pub fn total_cost(&self) -> Money {
        self.tickets.iter().map(Ticket::price).sum()
    }
}
