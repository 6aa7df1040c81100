// ドメインサービス
// 一つのコンサートのチケット集合に対する割り当てルールを実装
// 呼び出し側がコンサート単位の排他を保証したうえで使用する

use crate::domain::error::DomainError;
use crate::domain::model::{ConcertId, OrderId, Reservation, ReservationToken, Ticket, TicketId};
use std::collections::HashSet;

/// チケット割り当てサービス
/// 予約・解放・注文への紐付け・紐付け解除を担当
pub struct TicketAllocator;

impl TicketAllocator {
    /// 販売可能なチケット数
    pub fn available_count(tickets: &[Ticket]) -> u32 {
        tickets.iter().filter(|t| t.is_available()).count() as u32
    }

    /// 販売可能なチケットを指定枚数だけ予約する
    /// 枚数が足りない場合はどのチケットも変更しない
    ///
    /// # Arguments
    /// * `concert_id` - 対象コンサート
    /// * `tickets` - コンサートの全チケット
    /// * `quantity` - 予約する枚数（1以上）
    ///
    /// # Returns
    /// * `Ok(Reservation)` - 新しいトークンで予約したチケットの集合
    /// * `Err(DomainError::InsufficientInventory)` - 在庫不足
    pub fn reserve(
        concert_id: ConcertId,
        tickets: &mut [Ticket],
        quantity: u32,
    ) -> Result<Reservation, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }

        let available = Self::available_count(tickets);
        if available < quantity {
            return Err(DomainError::InsufficientInventory {
                requested: quantity,
                available,
            });
        }

        let token = ReservationToken::generate();
        let mut reserved = Vec::with_capacity(quantity as usize);
        for ticket in tickets
            .iter_mut()
            .filter(|t| t.is_available())
            .take(quantity as usize)
        {
            ticket.reserve(token)?;
            reserved.push(ticket.clone());
        }

        Ok(Reservation::new(concert_id, token, reserved))
    }

    /// 予約したチケットを販売可能に戻す
    /// このトークンで予約中のチケットだけが対象で、既に販売可能なものは何もしない
    ///
    /// # Returns
    /// * 解放したチケット数
    pub fn release(tickets: &mut [Ticket], reservation: &Reservation) -> u32 {
        let ids: HashSet<TicketId> = reservation.ticket_ids().into_iter().collect();
        let mut released = 0;
        for ticket in tickets
            .iter_mut()
            .filter(|t| ids.contains(&t.id()) && t.is_reserved_by(reservation.token()))
        {
            ticket.release();
            released += 1;
        }
        released
    }

    /// 予約したチケットをすべて注文に紐付ける
    /// 一枚でもこの予約で押さえられていなければ何も変更せずに失敗する
    pub fn sell(
        tickets: &mut [Ticket],
        reservation: &Reservation,
        order_id: OrderId,
    ) -> Result<(), DomainError> {
        let ids: HashSet<TicketId> = reservation.ticket_ids().into_iter().collect();
        let held = tickets
            .iter()
            .filter(|t| ids.contains(&t.id()) && t.is_reserved_by(reservation.token()))
            .count();
        if held != ids.len() {
            return Err(DomainError::InvalidValue(format!(
                "予約 {} のチケットが {} 枚中 {} 枚しか押さえられていません",
                reservation.token(),
                ids.len(),
                held
            )));
        }

        for ticket in tickets.iter_mut().filter(|t| ids.contains(&t.id())) {
            ticket.sell(reservation.token(), order_id)?;
        }
        Ok(())
    }

    /// 注文に紐付いたチケットを販売可能に戻す（注文キャンセル時）
    ///
    /// # Returns
    /// * 解放したチケット数
    pub fn unbind_order(tickets: &mut [Ticket], order_id: OrderId) -> u32 {
        let mut released = 0;
        for ticket in tickets.iter_mut().filter(|t| t.is_sold_to(order_id)) {
            ticket.release();
            released += 1;
        }
        released
    }
}
