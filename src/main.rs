// main.rs
// Axum server wiring: connects to MongoDB, builds the /api router, and
// serves on $PORT (default 8080). Every route sits behind the bearer-token
// middleware; token issuance belongs to the external auth service.

use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};
use dotenvy::dotenv;
use std::{env, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

use udhar_khata::{routes, session, state};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "udhar_khata=info".into()),
        )
        .init();

    let state = Arc::new(
        state::init_state()
            .await
            .expect("failed to initialize MongoDB state"),
    );

    let api = Router::new()
        .route(
            "/api/customers",
            get(routes::customers_index).post(routes::customers_create),
        )
        .route(
            "/api/customers/{id}",
            put(routes::customers_update).delete(routes::customers_delete),
        )
        .route(
            "/api/customer-udhar",
            get(routes::udhar_index).post(routes::udhar_create),
        )
        .route(
            "/api/customer-udhar/{id}",
            put(routes::udhar_update).delete(routes::udhar_delete),
        )
        .route("/api/customer-udhar/{id}/paid", patch(routes::udhar_mark_paid))
        .route(
            "/api/customer-udhar/{id}/partial-payment",
            patch(routes::udhar_partial_payment),
        )
        .route(
            "/api/customer-udhar/{id}/carry-forward",
            post(routes::udhar_carry_forward),
        )
        .route(
            "/api/shop-borrow",
            get(routes::borrow_index).post(routes::borrow_create),
        )
        .route(
            "/api/shop-borrow/{id}",
            put(routes::borrow_update).delete(routes::borrow_delete),
        )
        .route("/api/shop-borrow/{id}/paid", patch(routes::borrow_mark_paid))
        .route("/api/sales", get(routes::sales_index).post(routes::sales_create))
        .route(
            "/api/sales/{id}",
            get(routes::sales_show)
                .put(routes::sales_update)
                .delete(routes::sales_delete),
        )
        .route("/api/dashboard/stats", get(routes::dashboard_show))
        .route("/api/notifications", get(routes::notifications_index))
        .route(
            "/api/notifications/{id}/read",
            patch(routes::notifications_mark_read),
        )
        .route(
            "/api/notifications/read-all",
            patch(routes::notifications_mark_all_read),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_owner,
        ));

    let app = Router::new().merge(api).with_state(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{addr}");
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
