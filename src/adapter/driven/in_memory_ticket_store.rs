use crate::domain::model::{Concert, ConcertId, Email, Order, OrderId, Reservation, Ticket};
use crate::domain::port::{
    ConcertRepository, InventoryError, OrderRepository, RepositoryError, TicketInventory,
};
use crate::domain::service::TicketAllocator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// コンサートごとのチケット集合
/// このMutexがコンサート単位の排他ドメインになる
type ConcertTickets = Arc<Mutex<Vec<Ticket>>>;

/// インメモリのチケットストア
/// コンサート・チケット在庫・注文を一つのプロセス内で保持する
///
/// 同じコンサートに対する予約・解放・確定・キャンセルはコンサートごとの
/// Mutexで直列化される。ロック順序は常に「コンサートのチケット → 注文」。
#[derive(Default)]
pub struct InMemoryTicketStore {
    concerts: RwLock<HashMap<ConcertId, Concert>>,
    inventories: Mutex<HashMap<ConcertId, ConcertTickets>>,
    orders: Mutex<HashMap<OrderId, Order>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// コンサートのチケット集合を取得（なければ作成）
    /// チケットを追加するときだけ使う。マップのロックは取得後すぐに手放す
    async fn concert_tickets_or_insert(&self, concert_id: ConcertId) -> ConcertTickets {
        let mut inventories = self.inventories.lock().await;
        inventories
            .entry(concert_id)
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }

    /// 既存のコンサートのチケット集合を取得
    /// 一度もチケットが追加されていないコンサートでは `None`
    async fn concert_tickets(&self, concert_id: ConcertId) -> Option<ConcertTickets> {
        let inventories = self.inventories.lock().await;
        inventories.get(&concert_id).cloned()
    }

    /// コンサートの全チケットのスナップショット
    pub async fn tickets_for(&self, concert_id: ConcertId) -> Vec<Ticket> {
        match self.concert_tickets(concert_id).await {
            Some(tickets) => tickets.lock().await.clone(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl ConcertRepository for InMemoryTicketStore {
    async fn save(&self, concert: &Concert) -> Result<(), RepositoryError> {
        let mut concerts = self.concerts.write().await;
        concerts.insert(concert.id(), concert.clone());
        Ok(())
    }

    async fn find_by_id(&self, concert_id: ConcertId) -> Result<Option<Concert>, RepositoryError> {
        let concerts = self.concerts.read().await;
        Ok(concerts.get(&concert_id).cloned())
    }
}

#[async_trait]
impl TicketInventory for InMemoryTicketStore {
    async fn add_tickets(&self, new_tickets: Vec<Ticket>) -> Result<(), RepositoryError> {
        let mut by_concert: HashMap<ConcertId, Vec<Ticket>> = HashMap::new();
        for ticket in new_tickets {
            by_concert.entry(ticket.concert_id()).or_default().push(ticket);
        }

        for (concert_id, batch) in by_concert {
            let tickets = self.concert_tickets_or_insert(concert_id).await;
            let mut guard = tickets.lock().await;
            guard.extend(batch);
        }
        Ok(())
    }

    async fn reserve(
        &self,
        concert_id: ConcertId,
        quantity: u32,
    ) -> Result<Reservation, InventoryError> {
        let Some(tickets) = self.concert_tickets(concert_id).await else {
            // チケットのないコンサートは在庫ゼロとして扱う
            return Ok(TicketAllocator::reserve(concert_id, &mut [], quantity)?);
        };
        let mut guard = tickets.lock().await;
        let reservation = TicketAllocator::reserve(concert_id, &mut guard, quantity)?;
        Ok(reservation)
    }

    async fn release(&self, reservation: &Reservation) -> Result<(), RepositoryError> {
        if let Some(tickets) = self.concert_tickets(reservation.concert_id()).await {
            let mut guard = tickets.lock().await;
            TicketAllocator::release(&mut guard, reservation);
        }
        Ok(())
    }

    async fn commit(
        &self,
        reservation: &Reservation,
        order: &Order,
    ) -> Result<(), InventoryError> {
        let Some(tickets) = self.concert_tickets(reservation.concert_id()).await else {
            return Ok(TicketAllocator::sell(&mut [], reservation, order.id())?);
        };
        let mut guard = tickets.lock().await;
        TicketAllocator::sell(&mut guard, reservation, order.id())?;

        let mut orders = self.orders.lock().await;
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn cancel_order(&self, order: &Order) -> Result<Option<u32>, RepositoryError> {
        let Some(tickets) = self.concert_tickets(order.concert_id()).await else {
            return Ok(None);
        };
        let mut guard = tickets.lock().await;

        let mut orders = self.orders.lock().await;
        if orders.remove(&order.id()).is_none() {
            // 別のキャンセルが先に完了している
            return Ok(None);
        }
        Ok(Some(TicketAllocator::unbind_order(&mut guard, order.id())))
    }

    async fn tickets_remaining(&self, concert_id: ConcertId) -> Result<u32, RepositoryError> {
        match self.concert_tickets(concert_id).await {
            Some(tickets) => Ok(TicketAllocator::available_count(&tickets.lock().await)),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryTicketStore {
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.lock().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn find_by_concert_and_email(
        &self,
        concert_id: ConcertId,
        email: &Email,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.lock().await;
        Ok(orders
            .values()
            .filter(|order| order.concert_id() == concert_id && order.email() == email)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::model::{Money, ReservationToken, TicketState};

    async fn store_with_tickets(quantity: u32) -> (Arc<InMemoryTicketStore>, Concert) {
        let store = Arc::new(InMemoryTicketStore::new());
        let concert = Concert::new(ConcertId::new(), "Test", Money::from_cents(1200).unwrap());
        ConcertRepository::save(store.as_ref(), &concert).await.unwrap();
        store
            .add_tickets(concert.issue_tickets(quantity).unwrap())
            .await
            .unwrap();
        (store, concert)
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let (store, concert) = store_with_tickets(10).await;

        let reservation = store.reserve(concert.id(), 4).await.unwrap();
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 6);

        store.release(&reservation).await.unwrap();
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 10);

        // 二度目の解放は何もしない
        store.release(&reservation).await.unwrap();
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_reserve_unknown_concert_is_insufficient() {
        let store = InMemoryTicketStore::new();
        let result = store.reserve(ConcertId::new(), 1).await;
        assert_eq!(
            result.unwrap_err(),
            InventoryError::Domain(DomainError::InsufficientInventory {
                requested: 1,
                available: 0
            })
        );
    }

    #[tokio::test]
    async fn test_commit_binds_tickets_and_stores_order() {
        let (store, concert) = store_with_tickets(5).await;
        let reservation = store.reserve(concert.id(), 2).await.unwrap();
        let order = Order::for_reservation(
            OrderId::new(),
            Email::new("jane@example.com").unwrap(),
            &reservation,
        );

        store.commit(&reservation, &order).await.unwrap();

        let stored = OrderRepository::find_by_id(store.as_ref(), order.id())
            .await
            .unwrap();
        assert_eq!(stored, Some(order.clone()));
        let sold = store
            .tickets_for(concert.id())
            .await
            .into_iter()
            .filter(|t| t.state() == TicketState::Sold { order_id: order.id() })
            .count();
        assert_eq!(sold, 2);
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_commit_after_release_fails_and_stores_nothing() {
        let (store, concert) = store_with_tickets(5).await;
        let reservation = store.reserve(concert.id(), 2).await.unwrap();
        store.release(&reservation).await.unwrap();
        let order = Order::for_reservation(
            OrderId::new(),
            Email::new("jane@example.com").unwrap(),
            &reservation,
        );

        assert!(store.commit(&reservation, &order).await.is_err());
        assert!(OrderRepository::find_by_id(store.as_ref(), order.id())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cancel_order_releases_tickets_and_deletes_order() {
        let (store, concert) = store_with_tickets(10).await;
        let reservation = store.reserve(concert.id(), 5).await.unwrap();
        let order = Order::for_reservation(
            OrderId::new(),
            Email::new("jane@example.com").unwrap(),
            &reservation,
        );
        store.commit(&reservation, &order).await.unwrap();
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 5);

        let released = store.cancel_order(&order).await.unwrap();

        assert_eq!(released, Some(5));
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 10);
        assert!(OrderRepository::find_by_id(store.as_ref(), order.id())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_second_cancel_of_an_order_changes_nothing() {
        let (store, concert) = store_with_tickets(6).await;
        let reservation = store.reserve(concert.id(), 3).await.unwrap();
        let order = Order::for_reservation(
            OrderId::new(),
            Email::new("jane@example.com").unwrap(),
            &reservation,
        );
        store.commit(&reservation, &order).await.unwrap();
        assert_eq!(store.cancel_order(&order).await.unwrap(), Some(3));

        // 解放済みのチケットを別の注文が買い直している
        let rebought = store.reserve(concert.id(), 6).await.unwrap();
        let second_order = Order::for_reservation(
            OrderId::new(),
            Email::new("jon@example.com").unwrap(),
            &rebought,
        );
        store.commit(&rebought, &second_order).await.unwrap();

        assert_eq!(store.cancel_order(&order).await.unwrap(), None);
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 0);
        assert!(OrderRepository::find_by_id(store.as_ref(), second_order.id())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_queries_on_unknown_concert_do_not_create_inventory() {
        let store = InMemoryTicketStore::new();
        let concert_id = ConcertId::new();

        assert_eq!(store.tickets_remaining(concert_id).await.unwrap(), 0);
        assert!(store.tickets_for(concert_id).await.is_empty());
        assert!(store.reserve(concert_id, 2).await.is_err());
        assert_eq!(
            store.reserve(concert_id, 0).await.unwrap_err(),
            InventoryError::Domain(DomainError::InvalidQuantity)
        );
        let reservation = Reservation::new(concert_id, ReservationToken::generate(), Vec::new());
        store.release(&reservation).await.unwrap();
        let order = Order::for_reservation(
            OrderId::new(),
            Email::new("jane@example.com").unwrap(),
            &reservation,
        );
        assert_eq!(store.cancel_order(&order).await.unwrap(), None);

        assert!(store.inventories.lock().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_never_oversell() {
        let (store, concert) = store_with_tickets(10).await;

        let mut handles = Vec::new();
        for _ in 0..25 {
            let store = store.clone();
            let concert_id = concert.id();
            handles.push(tokio::spawn(async move { store.reserve(concert_id, 1).await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_for_the_same_last_tickets() {
        let (store, concert) = store_with_tickets(3).await;

        let first = {
            let store = store.clone();
            let concert_id = concert.id();
            tokio::spawn(async move { store.reserve(concert_id, 2).await })
        };
        let second = {
            let store = store.clone();
            let concert_id = concert.id();
            tokio::spawn(async move { store.reserve(concert_id, 2).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.tickets_remaining(concert.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_concert_and_email() {
        let (store, concert) = store_with_tickets(4).await;
        let jane = Email::new("jane@example.com").unwrap();
        let jon = Email::new("jon@example.com").unwrap();
        for email in [&jane, &jane, &jon] {
            let reservation = store.reserve(concert.id(), 1).await.unwrap();
            let order = Order::for_reservation(OrderId::new(), email.clone(), &reservation);
            store.commit(&reservation, &order).await.unwrap();
        }

        let orders = store
            .find_by_concert_and_email(concert.id(), &jane)
            .await
            .unwrap();
        assert_eq!(orders.len(), 2);
        assert!(store
            .find_by_concert_and_email(ConcertId::new(), &jane)
            .await
            .unwrap()
            .is_empty());
    }
}
