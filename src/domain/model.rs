// ドメインモデル（エンティティと値オブジェクト）

mod value_objects;
mod concert;
mod ticket;
mod reservation;
mod order;

pub use value_objects::{
    ConcertId, TicketId, OrderId, ReservationToken,
    Money,
    Email,
};

pub use concert::Concert;
pub use ticket::{Ticket, TicketState};
pub use reservation::Reservation;
pub use order::Order;
