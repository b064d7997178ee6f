//! Card endpoints: paginated listing, name search and lookup by UUID.
//!
//! Optional trailing path segments (`page`, `limit`) are modelled as separate
//! routes that share one query function each.

use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{Card, CardPage};
use crate::routes::helpers::{substring_pattern, validate_search_name};
use crate::routes::params::{DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT, Paging};

const CARD_COLUMNS: &str =
    "id, uuid, name, mana_value, mana_cost, rarity, set_code, subtype, text, type";

async fn fetch_page(pool: &PgPool, paging: Paging) -> Result<CardPage, ApiError> {
    let cards: Vec<Card> = sqlx::query_as(&format!(
        "SELECT {CARD_COLUMNS} FROM cards ORDER BY id ASC LIMIT $1 OFFSET $2"
    ))
    .bind(i64::from(paging.limit()))
    .bind(paging.offset())
    .fetch_all(pool)
    .await?;

    Ok(CardPage {
        cards,
        page: paging.page(),
        limit: paging.limit(),
    })
}

async fn search_page(pool: &PgPool, name: &str, paging: Paging) -> Result<CardPage, ApiError> {
    validate_search_name(name)?;

    let cards: Vec<Card> = sqlx::query_as(&format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE name ILIKE $1 ORDER BY id ASC LIMIT $2 OFFSET $3"
    ))
    .bind(substring_pattern(name))
    .bind(i64::from(paging.limit()))
    .bind(paging.offset())
    .fetch_all(pool)
    .await?;

    log::debug!("search '{}' matched {} cards", name, cards.len());

    Ok(CardPage {
        cards,
        page: paging.page(),
        limit: paging.limit(),
    })
}

/// List cards using the default page (1) and limit (100).
#[openapi(tag = "Card")]
#[get("/all")]
pub async fn list_cards(pool: &State<PgPool>) -> Result<Json<CardPage>, ApiError> {
    let paging = Paging::new(None, None, DEFAULT_LIST_LIMIT);
    Ok(Json(fetch_page(pool, paging).await?))
}

/// List one page of cards with the default limit (100).
#[openapi(tag = "Card")]
#[get("/all/<page>")]
pub async fn list_cards_page(pool: &State<PgPool>, page: u32) -> Result<Json<CardPage>, ApiError> {
    let paging = Paging::new(Some(page), None, DEFAULT_LIST_LIMIT);
    Ok(Json(fetch_page(pool, paging).await?))
}

/// List one page of cards with an explicit page size.
///
/// `limit` is clamped to 1..=500; the response echoes the applied limit,
/// which can differ from the requested one.
#[openapi(tag = "Card")]
#[get("/all/<page>/<limit>")]
pub async fn list_cards_paged(
    pool: &State<PgPool>,
    page: u32,
    limit: u32,
) -> Result<Json<CardPage>, ApiError> {
    let paging = Paging::new(Some(page), Some(limit), DEFAULT_LIST_LIMIT);
    Ok(Json(fetch_page(pool, paging).await?))
}

/// Search cards whose name contains `name` (at least three characters).
#[openapi(tag = "Card")]
#[get("/search/<name>")]
pub async fn search_cards(pool: &State<PgPool>, name: String) -> Result<Json<CardPage>, ApiError> {
    let paging = Paging::new(None, None, DEFAULT_SEARCH_LIMIT);
    Ok(Json(search_page(pool, &name, paging).await?))
}

/// Search cards by name, returning the requested page (limit 20).
#[openapi(tag = "Card")]
#[get("/search/<name>/<page>")]
pub async fn search_cards_page(
    pool: &State<PgPool>,
    name: String,
    page: u32,
) -> Result<Json<CardPage>, ApiError> {
    let paging = Paging::new(Some(page), None, DEFAULT_SEARCH_LIMIT);
    Ok(Json(search_page(pool, &name, paging).await?))
}

/// Search cards by name with an explicit page and page size.
///
/// `limit` is clamped to 1..=500 and the applied value is echoed back.
#[openapi(tag = "Card")]
#[get("/search/<name>/<page>/<limit>")]
pub async fn search_cards_paged(
    pool: &State<PgPool>,
    name: String,
    page: u32,
    limit: u32,
) -> Result<Json<CardPage>, ApiError> {
    let paging = Paging::new(Some(page), Some(limit), DEFAULT_SEARCH_LIMIT);
    Ok(Json(search_page(pool, &name, paging).await?))
}

/// Fetch a single card by UUID.
#[openapi(tag = "Card")]
#[get("/<uuid>")]
pub async fn get_card(pool: &State<PgPool>, uuid: String) -> Result<Json<Card>, ApiError> {
    let card: Option<Card> =
        sqlx::query_as(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE uuid = $1"))
            .bind(&uuid)
            .fetch_optional(pool.inner())
            .await?;

    card.map(Json)
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))
}
