//! Order endpoints.
//!
//! Payment processing itself is external; these exist to carry the
//! order-ownership permission check: only the customer who placed an
//! order may read it.

use crate::auth::middleware::{AppState, AuthUser};
use crate::error::AppError;
use crate::models::{unix_now, CreateOrderRequest, OrderInfo, StoredOrder};
use crate::storage;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

/// POST /api/orders — Place an order for an ad.
pub async fn create_order(
    customer: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    super::validate_id(&req.ad_id, "ad ID", 12)?;

    let mut con = state.connection().await?;

    let ad = storage::ad::get_ad(&mut con, &req.ad_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ad not found".to_string()))?;
    if !ad.confirmed || !ad.active {
        return Err(AppError::BadRequest(
            "Ad is not available for orders".to_string(),
        ));
    }

    let order = StoredOrder {
        id: nanoid::nanoid!(12),
        customer_id: customer.user_id.clone(),
        ad_id: req.ad_id,
        created_at: unix_now(),
    };

    storage::order::store_order(&mut con, &order).await?;

    tracing::info!(action = "order_created", order_id = %order.id, customer_id = %customer.user_id, "Order placed");

    Ok(Json(OrderInfo::from(order)))
}

/// GET /api/orders/:id — Fetch an order; customer-only ownership check.
pub async fn get_order(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    super::validate_id(&id, "order ID", 12)?;

    let mut con = state.connection().await?;

    let order = storage::order::get_order(&mut con, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if order.customer_id != caller.user_id {
        return Err(AppError::Forbidden(
            "You do not own this order".to_string(),
        ));
    }

    Ok(Json(OrderInfo::from(order)))
}
