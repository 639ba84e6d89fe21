use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    db::{StoreError, SCAN_LIMIT},
    error::{AppError, AppResult},
    models::{Product, ProductPayload},
    AppState,
};

// ── List ──────────────────────────────────────────────────────────────────────

/// One scan page of at most `SCAN_LIMIT` products. `count` is the page size,
/// not the table size.
pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let products = state.store.scan(SCAN_LIMIT).await.map_err(|e| {
        error!(error = %e, "Failed to scan products");
        match e {
            StoreError::Codec(_) => AppError::Storage("Failed to unmarshal products".to_string()),
            other => AppError::Storage(other.to_string()),
        }
    })?;

    info!(count = products.len(), "Listed products");

    Ok((
        StatusCode::OK,
        Json(json!({
            "products": products,
            "count": products.len(),
        })),
    ))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    payload: ProductPayload,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = payload.into_product(Uuid::new_v4().to_string(), state.clock.now());

    // unconditional: an id collision overwrites
    state.store.put(&product).await.map_err(|e| {
        error!(id = %product.product_id, error = %e, "Failed to store product");
        AppError::Storage(e.to_string())
    })?;

    info!(id = %product.product_id, name = %product.name, "Created product");

    Ok((StatusCode::CREATED, Json(product)))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = state.store.get(&id).await.map_err(|e| {
        error!(id = %id, error = %e, "Failed to fetch product");
        match e {
            StoreError::Codec(_) => AppError::Storage("Failed to unmarshal product".to_string()),
            other => AppError::Storage(other.to_string()),
        }
    })?;

    product
        .map(|product| (StatusCode::OK, Json(product)))
        .ok_or(AppError::NotFound)
}

// ── Update ────────────────────────────────────────────────────────────────────

/// Full overwrite of the mutable fields. `productId` and `createdAt` are kept.
/// Any store failure, not only a missing record, answers 404.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: ProductPayload,
) -> AppResult<(StatusCode, Json<Product>)> {
    let updated_at = state.clock.now();

    let product = match state.store.update(&id, &payload, updated_at).await {
        Ok(product) => product,
        Err(StoreError::Codec(e)) => {
            error!(id = %id, error = %e, "Failed to unmarshal updated product");
            return Err(AppError::Storage("Failed to unmarshal product".to_string()));
        }
        Err(e) => {
            warn!(id = %id, error = %e, "Update rejected");
            return Err(AppError::NotFound);
        }
    };

    info!(id = %id, "Updated product");

    Ok((StatusCode::OK, Json(product)))
}

// ── Delete ────────────────────────────────────────────────────────────────────

/// Any store failure, not only a missing record, answers 404.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if let Err(e) = state.store.delete(&id).await {
        warn!(id = %id, error = %e, "Delete rejected");
        return Err(AppError::NotFound);
    }

    info!(id = %id, "Deleted product");

    Ok(StatusCode::NO_CONTENT)
}
