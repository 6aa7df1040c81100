use crate::domain::error::DomainError;
use crate::domain::model::{ConcertId, Money, OrderId, ReservationToken, TicketId};

/// チケットの状態
/// 販売可能・予約中・販売済みの3状態のいずれか一つだけを取る
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    /// 販売可能
    Available,
    /// 購入試行によって仮押さえされている
    Reserved { token: ReservationToken },
    /// 注文に紐付け済み
    Sold { order_id: OrderId },
}

impl TicketState {
    /// 永続化された2つのnull許容カラムから状態を復元する
    /// 注文IDが設定されていれば予約トークンに関わらず販売済みとする
    pub fn from_columns(
        reservation_token: Option<ReservationToken>,
        order_id: Option<OrderId>,
    ) -> Self {
        match (reservation_token, order_id) {
            (_, Some(order_id)) => TicketState::Sold { order_id },
            (Some(token), None) => TicketState::Reserved { token },
            (None, None) => TicketState::Available,
        }
    }
}

/// チケットエンティティ
/// 必ず一つのコンサートに属し、発行時点の価格を保持する
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    id: TicketId,
    concert_id: ConcertId,
    price: Money,
    state: TicketState,
}

impl Ticket {
    /// 販売可能な状態の新しいチケットを発行
    pub fn issue(concert_id: ConcertId, price: Money) -> Self {
        Self {
            id: TicketId::new(),
            concert_id,
            price,
            state: TicketState::Available,
        }
    }

    /// データベースから取得したデータでチケットを再構築
    pub fn reconstruct(
        id: TicketId,
        concert_id: ConcertId,
        price: Money,
        state: TicketState,
    ) -> Self {
        Self {
            id,
            concert_id,
            price,
            state,
        }
    }

    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn concert_id(&self) -> ConcertId {
        self.concert_id
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn state(&self) -> TicketState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.state == TicketState::Available
    }

    /// 指定したトークンで予約中かどうか
    pub fn is_reserved_by(&self, token: ReservationToken) -> bool {
        self.state == TicketState::Reserved { token }
    }

    /// 指定した注文に販売済みかどうか
    pub fn is_sold_to(&self, order_id: OrderId) -> bool {
        self.state == TicketState::Sold { order_id }
    }

    /// チケットを予約する
    /// 販売可能な状態からのみ遷移できる
    pub fn reserve(&mut self, token: ReservationToken) -> Result<(), DomainError> {
        if !self.is_available() {
            return Err(DomainError::InvalidTicketState {
                ticket_id: self.id,
                message: "販売可能なチケットのみ予約できます".to_string(),
            });
        }
        self.state = TicketState::Reserved { token };
        Ok(())
    }

    /// 予約中のチケットを注文に紐付ける
    /// 同じトークンで予約されている場合のみ遷移できる
    pub fn sell(&mut self, token: ReservationToken, order_id: OrderId) -> Result<(), DomainError> {
        if !self.is_reserved_by(token) {
            return Err(DomainError::InvalidTicketState {
                ticket_id: self.id,
                message: "この予約で押さえられていないチケットは販売できません".to_string(),
            });
        }
        self.state = TicketState::Sold { order_id };
        Ok(())
    }

    /// チケットを解放して販売可能に戻す
    /// 既に販売可能な場合は何もしない
    pub fn release(&mut self) {
        self.state = TicketState::Available;
    }
}
