use concert_ticket_sales::adapter::driven::{
    FakePaymentGateway, MySqlConcertRepository, MySqlOrderRepository, MySqlTicketInventory,
    TracingLogger, UnconfiguredPaymentGateway,
};
use concert_ticket_sales::adapter::driver::rest_api::{create_router, AppState};
use concert_ticket_sales::adapter::{DatabaseConfig, PaymentGatewayKind, ServerConfig};
use concert_ticket_sales::application::service::{OrderApplicationService, PurchaseService};
use concert_ticket_sales::domain::port::PaymentGateway;

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let database_config = DatabaseConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    tracing::info!(
        host = %database_config.host,
        port = database_config.port,
        "Loaded database configuration"
    );

    // 接続プールを作成（スキーマは事前に用意されている前提）
    let pool = MySqlPoolOptions::new()
        .max_connections(database_config.max_connections)
        .connect(&database_config.connection_string())
        .await?;

    let concert_repository = Arc::new(MySqlConcertRepository::new(pool.clone()));
    let inventory = Arc::new(MySqlTicketInventory::new(pool.clone()));
    let order_repository = Arc::new(MySqlOrderRepository::new(pool));
    let logger = Arc::new(TracingLogger::new());

    let payment_gateway: Arc<dyn PaymentGateway> = match server_config.payment_gateway {
        PaymentGatewayKind::Fake => {
            tracing::warn!(
                "Using the fake payment gateway; charges are not sent to a payment provider"
            );
            Arc::new(FakePaymentGateway::new())
        }
        PaymentGatewayKind::Unconfigured => {
            tracing::warn!("No payment gateway configured; every purchase will be refused");
            Arc::new(UnconfiguredPaymentGateway::new())
        }
    };

    let purchase_service = PurchaseService::new(
        concert_repository,
        inventory.clone(),
        payment_gateway,
        logger.clone(),
    )
    .with_payment_timeout(server_config.payment_timeout);
    let order_service = OrderApplicationService::new(order_repository, inventory, logger);

    let app_state = AppState {
        purchase_service: Arc::new(purchase_service),
        order_service: Arc::new(order_service),
    };

    let app = create_router()
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(server_config.bind_address.as_str()).await?;
    tracing::info!(address = %server_config.bind_address, "REST API server started");

    axum::serve(listener, app).await?;

    Ok(())
}
