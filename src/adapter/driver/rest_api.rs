use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapter::driver::request_dto::PurchaseTicketsRequest;
use crate::adapter::driver::response_dto::{CancelOrderResponse, OrderResponse};
use crate::application::service::{OrderApplicationService, PurchaseService};
use crate::application::ApplicationError;
use crate::domain::model::{ConcertId, OrderId};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub purchase_service: Arc<PurchaseService>,
    pub order_service: Arc<OrderApplicationService>,
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/concerts/:concert_id/orders", post(purchase_tickets))
        .route("/orders/:order_id", delete(cancel_order))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "concert-ticket-sales",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// チケット購入エンドポイント
async fn purchase_tickets(
    State(state): State<AppState>,
    Path(concert_id): Path<String>,
    body: Result<Json<PurchaseTicketsRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    // 不正なIDのコンサートは存在しないコンサートと同じ扱い
    let concert_id = ConcertId::from_string(&concert_id).map_err(|_| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("Concert not found: {}", concert_id),
            "CONCERT_NOT_FOUND",
        )
    })?;

    let Json(body) = body.map_err(|rejection| {
        api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            rejection.body_text(),
            "INVALID_REQUEST",
        )
    })?;

    let request = body.validate(concert_id).map_err(|fields| {
        api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Invalid fields: {}", fields.join(", ")),
            "VALIDATION_ERROR",
        )
    })?;

    let order = state
        .purchase_service
        .purchase_tickets(request)
        .await
        .map_err(map_application_error)?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from_order(&order))))
}

// 注文キャンセルエンドポイント
async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<CancelOrderResponse>> {
    let order_id = OrderId::from_string(&order_id).map_err(|_| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("Order not found: {}", order_id),
            "ORDER_NOT_FOUND",
        )
    })?;

    let released_tickets = state
        .order_service
        .cancel_order(order_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(CancelOrderResponse {
        order_id: order_id.to_string(),
        released_tickets,
    }))
}

fn api_error(status: StatusCode, error: String, code: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error,
            code: code.to_string(),
        }),
    )
}

// アプリケーションエラーをHTTPエラーにマッピング
// 在庫不足と決済失敗はどちらも422で、境界では区別しない
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let message = err.to_string();
    match err {
        ApplicationError::ConcertNotAvailable(_) => {
            api_error(StatusCode::NOT_FOUND, message, "CONCERT_NOT_FOUND")
        }
        ApplicationError::NotFound(_) => api_error(StatusCode::NOT_FOUND, message, "NOT_FOUND"),
        err if err.is_rejection() => {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, message, "PURCHASE_REJECTED")
        }
        ApplicationError::Domain(_) => {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, message, "INVALID_VALUE")
        }
        ApplicationError::FulfillmentFailed { .. } => {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, message, "FULFILLMENT_FAILED")
        }
        ApplicationError::Repository(_) => {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, message, "REPOSITORY_ERROR")
        }
        _ => api_error(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{FakePaymentGateway, InMemoryTicketStore, TracingLogger};
    use crate::application::service::ConcertApplicationService;
    use crate::domain::model::Money;
    use crate::domain::port::{PaymentError, TicketInventory};
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use serde_json::json;

    struct Harness {
        server: TestServer,
        store: Arc<InMemoryTicketStore>,
        gateway: Arc<FakePaymentGateway>,
        concerts: ConcertApplicationService,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryTicketStore::new());
        let gateway = Arc::new(FakePaymentGateway::new());
        let logger = Arc::new(TracingLogger::new());
        let state = AppState {
            purchase_service: Arc::new(PurchaseService::new(
                store.clone(),
                store.clone(),
                gateway.clone(),
                logger.clone(),
            )),
            order_service: Arc::new(OrderApplicationService::new(
                store.clone(),
                store.clone(),
                logger,
            )),
        };
        let server = TestServer::new(create_router().with_state(state)).unwrap();
        Harness {
            server,
            concerts: ConcertApplicationService::new(store.clone(), store.clone()),
            store,
            gateway,
        }
    }

    async fn published_concert(harness: &Harness, price: i64, tickets: u32) -> ConcertId {
        let concert_id = harness
            .concerts
            .create_concert("Example Band".to_string(), Money::from_cents(price).unwrap())
            .await
            .unwrap();
        harness
            .concerts
            .publish_concert(concert_id, Utc::now() - Duration::weeks(1))
            .await
            .unwrap();
        harness.concerts.add_tickets(concert_id, tickets).await.unwrap();
        concert_id
    }

    #[tokio::test]
    async fn test_customer_can_purchase_tickets() {
        let harness = harness();
        let concert_id = published_concert(&harness, 3250, 3).await;

        let response = harness
            .server
            .post(&format!("/concerts/{}/orders", concert_id))
            .json(&json!({
                "email": "john@example.com",
                "ticket_quantity": 3,
                "payment_token": harness.gateway.valid_test_token(),
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<OrderResponse>();
        assert_eq!(body.email, "john@example.com");
        assert_eq!(body.ticket_quantity, 3);
        assert_eq!(body.amount, 9750);
        assert_eq!(harness.gateway.total_charges(), Money::from_cents(9750).unwrap());
        assert_eq!(harness.store.tickets_remaining(concert_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cannot_purchase_more_tickets_than_remain() {
        let harness = harness();
        let concert_id = published_concert(&harness, 3250, 50).await;

        let response = harness
            .server
            .post(&format!("/concerts/{}/orders", concert_id))
            .json(&json!({
                "email": "john@example.com",
                "ticket_quantity": 51,
                "payment_token": harness.gateway.valid_test_token(),
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<ApiError>().code, "PURCHASE_REJECTED");
        assert_eq!(harness.gateway.charge_count(), 0);
        assert_eq!(harness.store.tickets_remaining(concert_id).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_order_is_not_created_if_payment_fails() {
        let harness = harness();
        let concert_id = published_concert(&harness, 3250, 3).await;

        let response = harness
            .server
            .post(&format!("/concerts/{}/orders", concert_id))
            .json(&json!({
                "email": "john@example.com",
                "ticket_quantity": 3,
                "payment_token": "invalid-payment-token",
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(harness.store.tickets_remaining(concert_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_cannot_purchase_tickets_to_an_unpublished_concert() {
        let harness = harness();
        let concert_id = harness
            .concerts
            .create_concert("Example Band".to_string(), Money::from_cents(3250).unwrap())
            .await
            .unwrap();
        harness.concerts.add_tickets(concert_id, 3).await.unwrap();

        let response = harness
            .server
            .post(&format!("/concerts/{}/orders", concert_id))
            .json(&json!({
                "email": "john@example.com",
                "ticket_quantity": 3,
                "payment_token": harness.gateway.valid_test_token(),
            }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(harness.gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_concert_id_is_not_found() {
        let harness = harness();

        let response = harness
            .server
            .post("/concerts/not-a-uuid/orders")
            .json(&json!({
                "email": "john@example.com",
                "ticket_quantity": 1,
                "payment_token": "valid-token",
            }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_fields_are_rejected_before_purchase() {
        let harness = harness();
        let concert_id = published_concert(&harness, 3250, 3).await;

        let response = harness
            .server
            .post(&format!("/concerts/{}/orders", concert_id))
            .json(&json!({
                "email": "not-an-email",
                "ticket_quantity": 0,
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let error = response.json::<ApiError>();
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.error.contains("email"));
        assert!(error.error.contains("ticket_quantity"));
        assert!(error.error.contains("payment_token"));
        assert_eq!(harness.gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_order_releases_tickets() {
        let harness = harness();
        let concert_id = published_concert(&harness, 1200, 5).await;
        let order = harness
            .server
            .post(&format!("/concerts/{}/orders", concert_id))
            .json(&json!({
                "email": "jane@example.com",
                "ticket_quantity": 2,
                "payment_token": harness.gateway.valid_test_token(),
            }))
            .await
            .json::<OrderResponse>();

        let response = harness
            .server
            .delete(&format!("/orders/{}", order.order_id))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<CancelOrderResponse>().released_tickets, 2);
        assert_eq!(harness.store.tickets_remaining(concert_id).await.unwrap(), 5);

        harness
            .server
            .delete(&format!("/orders/{}", order.order_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_check() {
        let harness = harness();
        let response = harness.server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["status"], "healthy");
    }

    #[test]
    fn test_map_application_error() {
        let (status, Json(error)) =
            map_application_error(ApplicationError::ConcertNotAvailable(ConcertId::new()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error.code, "CONCERT_NOT_FOUND");

        let (status, _) = map_application_error(ApplicationError::InsufficientInventory {
            requested: 51,
            available: 50,
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = map_application_error(ApplicationError::PaymentFailed(
            PaymentError::Declined("invalid".to_string()),
        ));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, Json(error)) = map_application_error(ApplicationError::FulfillmentFailed {
            amount: Money::from_cents(6500).unwrap(),
            reason: "lost".to_string(),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.code, "FULFILLMENT_FAILED");
    }
}
