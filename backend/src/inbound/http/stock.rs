//! Stock decrement HTTP handler.
//!
//! ```text
//! POST /api/v1/merchants/{merchant_id}/stock-decrements
//! ```
//!
//! Called by order-commit flows (group checkout, direct checkout, point of
//! sale). Applying the decrement also emits the resulting delta to the
//! merchant's live feed.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::CommitStockDecrementRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid, require_positive};

/// Request payload for committing a stock decrement.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockDecrementRequestBody {
    #[schema(format = "uuid")]
    pub item_id: String,
    /// Units to subtract; the counter saturates at zero.
    pub delta: u32,
}

/// Response payload carrying the post-decrement level.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockDecrementResponseBody {
    #[schema(format = "uuid")]
    pub item_id: String,
    pub quantity: u32,
}

/// Commit an order's stock decrement and broadcast the new level.
#[utoipa::path(
    post,
    path = "/api/v1/merchants/{merchant_id}/stock-decrements",
    request_body = StockDecrementRequestBody,
    params(("merchant_id" = String, Path, description = "Merchant identifier")),
    responses(
        (status = 200, description = "Decrement applied", body = StockDecrementResponseBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Item is not stock-tracked", body = Error)
    ),
    tags = ["stock"],
    operation_id = "commitStockDecrement"
)]
#[post("/merchants/{merchant_id}/stock-decrements")]
pub async fn commit_stock_decrement(
    state: web::Data<HttpState>,
    merchant_id: web::Path<String>,
    payload: web::Json<StockDecrementRequestBody>,
) -> ApiResult<web::Json<StockDecrementResponseBody>> {
    let merchant_id = parse_uuid(&merchant_id, FieldName::new("merchantId"))?;
    let payload = payload.into_inner();
    let item_id = parse_uuid(&payload.item_id, FieldName::new("itemId"))?;
    let delta = require_positive(payload.delta, FieldName::new("delta"))?;

    let response = state
        .stock
        .commit_decrement(CommitStockDecrementRequest {
            merchant_id,
            item_id,
            delta,
        })
        .await?;

    Ok(web::Json(StockDecrementResponseBody {
        item_id: response.level.item_id.to_string(),
        quantity: response.level.quantity,
    }))
}
