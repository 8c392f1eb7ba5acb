//! Catalog product endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use store::{OrderStore, ProductQuery, ProductRecord, query};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Decimal price, e.g. "2.50". Digits beyond cents round half away
    /// from zero.
    pub price: String,
    pub stock: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub price_cents: i64,
    pub stock: i64,
}

impl From<ProductRecord> for ProductResponse {
    fn from(p: ProductRecord) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name,
            description: p.description,
            price: p.price.to_string(),
            price_cents: p.price.cents(),
            stock: p.stock,
        }
    }
}

#[derive(Serialize)]
pub struct ProductListResponse {
    pub items: Vec<ProductResponse>,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_records: usize,
}

const MAX_STOCK: i64 = 100_000;
// 1,000,000.00 — leaves ample headroom before price * quantity can overflow
// 64-bit cents.
const MAX_PRICE_CENTS: i64 = 100_000_000;

fn validate(req: &CreateProductRequest) -> Result<Money, ApiError> {
    // Lengths are counted in characters, not bytes.
    let name_chars = req.name.trim().chars().count();
    if name_chars < 4 || name_chars > 120 {
        return Err(ApiError::BadRequest(
            "name must be between 4 and 120 characters".to_string(),
        ));
    }
    if let Some(desc) = &req.description {
        let desc_chars = desc.chars().count();
        if desc_chars < 4 || desc_chars > 1000 {
            return Err(ApiError::BadRequest(
                "description must be between 4 and 1000 characters".to_string(),
            ));
        }
    }
    let price =
        Money::parse(&req.price).map_err(|e| ApiError::BadRequest(format!("invalid price: {e}")))?;
    if !price.is_positive() {
        return Err(ApiError::BadRequest("price must be positive".to_string()));
    }
    if price.cents() > MAX_PRICE_CENTS {
        return Err(ApiError::BadRequest(format!(
            "price must not exceed {}",
            Money::from_cents(MAX_PRICE_CENTS)
        )));
    }
    if req.stock < 0 || req.stock > MAX_STOCK {
        return Err(ApiError::BadRequest(format!(
            "stock must be between 0 and {MAX_STOCK}"
        )));
    }
    Ok(price)
}

// -- Handlers --

/// POST /products — add a product to the catalog.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(axum::http::StatusCode, Json<ProductResponse>), ApiError> {
    let price = validate(&req)?;
    let product = ProductRecord {
        id: ProductId::new(),
        name: req.name.trim().to_string(),
        description: req.description,
        price,
        stock: req.stock,
    };
    state.store.insert_product(&product).await?;
    Ok((axum::http::StatusCode::CREATED, Json(product.into())))
}

/// GET /products/:id — load one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .store
        .get_product(ProductId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;
    Ok(Json(product.into()))
}

/// GET /products — paginated listing with diacritic-insensitive ranked
/// name search.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListProductsQuery>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let products = state.store.list_products().await?;
    let page = query::search(
        products,
        &ProductQuery {
            term: params.q,
            page: params.page.unwrap_or(1),
            per_page: params.per_page.unwrap_or(5),
        },
    );
    Ok(Json(ProductListResponse {
        items: page.items.into_iter().map(Into::into).collect(),
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
        total_records: page.total_records,
    }))
}
