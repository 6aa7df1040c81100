// 駆動される側アダプター（在庫・リポジトリ・決済・ロガーの実装）

mod concert_repository;
mod fake_payment_gateway;
mod in_memory_ticket_store;
mod order_repository;
mod ticket_inventory;
mod tracing_logger;
mod unconfigured_payment_gateway;

pub use concert_repository::MySqlConcertRepository;
pub use fake_payment_gateway::{BeforeChargeHook, FakePaymentGateway};
pub use in_memory_ticket_store::InMemoryTicketStore;
pub use order_repository::MySqlOrderRepository;
pub use ticket_inventory::MySqlTicketInventory;
pub use tracing_logger::TracingLogger;
pub use unconfigured_payment_gateway::UnconfiguredPaymentGateway;
