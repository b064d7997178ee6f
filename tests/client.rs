use card_api::client::{CardClient, ClientError};
use card_api::error::ApiError;
use card_api::models::{Card, CardPage};
use rocket::config::LogLevel;
use rocket::fairing::AdHoc;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, routes};
use std::net::TcpListener;
use tokio::sync::oneshot;

fn stored_card() -> Card {
    Card {
        id: 1,
        uuid: "bolt-1".to_string(),
        name: "Lightning Bolt".to_string(),
        mana_value: 1.0,
        mana_cost: Some("{R}".to_string()),
        rarity: "common".to_string(),
        set_code: "LEA".to_string(),
        subtype: None,
        text: Some("Lightning Bolt deals 3 damage.\\nInstant speed.".to_string()),
        card_type: "Instant".to_string(),
    }
}

#[get("/all/<page>/<limit>")]
fn all_cards(page: u32, limit: u32) -> Json<CardPage> {
    Json(CardPage {
        cards: vec![stored_card()],
        page,
        limit,
    })
}

#[get("/search/<name>/<page>/<limit>")]
fn search(name: String, page: u32, limit: u32) -> Result<Json<CardPage>, ApiError> {
    if name.chars().count() < 3 {
        return Err(ApiError::BadRequest(
            "Card name must contain at least 3 characters".to_string(),
        ));
    }
    let cards = std::iter::once(stored_card())
        .filter(|card| card.name.contains(&name))
        .collect();
    Ok(Json(CardPage { cards, page, limit }))
}

#[get("/<uuid>")]
fn card(uuid: String) -> Result<Json<Card>, ApiError> {
    if uuid == "bolt-1" {
        Ok(Json(stored_card()))
    } else {
        Err(ApiError::NotFound("Card not found".to_string()))
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("free local port")
}

/// Serve canned card responses on a local port and return its base URL.
async fn spawn_card_server() -> String {
    let port = free_port();
    let figment = rocket::Config::figment()
        .merge(("address", "127.0.0.1"))
        .merge(("port", port))
        .merge(("log_level", LogLevel::Off))
        .merge(("cli_colors", false));

    let (ready_tx, ready_rx) = oneshot::channel();
    let rocket = rocket::custom(figment)
        .mount("/api/card", routes![all_cards, search, card])
        .attach(AdHoc::on_liftoff("Ready", move |_| {
            Box::pin(async move {
                let _ = ready_tx.send(());
            })
        }));

    tokio::spawn(rocket.launch());
    ready_rx.await.expect("card server started");

    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn fetch_card_normalizes_escaped_newlines() {
    let client = CardClient::new(&spawn_card_server().await).expect("client");

    let card = client
        .fetch_card("bolt-1")
        .await
        .expect("request succeeded")
        .expect("card exists");

    assert_eq!(card.name, "Lightning Bolt");
    assert_eq!(
        card.text.as_deref(),
        Some("Lightning Bolt deals 3 damage.\nInstant speed.")
    );
}

#[tokio::test]
async fn unknown_card_is_none() {
    let client = CardClient::new(&spawn_card_server().await).expect("client");

    let card = client
        .fetch_card("unknown-uuid")
        .await
        .expect("404 is not an error");
    assert!(card.is_none());
}

#[tokio::test]
async fn lists_and_searches_pages() {
    let client = CardClient::new(&spawn_card_server().await).expect("client");

    let page = client.fetch_all_cards(2, 50).await.expect("card page");
    assert_eq!((page.page, page.limit), (2, 50));
    assert_eq!(page.cards.len(), 1);

    let page = client
        .search_cards("Lightning", 1, 20)
        .await
        .expect("search page");
    assert_eq!(page.cards.len(), 1);
    assert_eq!(page.cards[0].uuid, "bolt-1");
}

#[tokio::test]
async fn short_search_surfaces_the_error_status() {
    let client = CardClient::new(&spawn_card_server().await).expect("client");

    match client.search_cards("ab", 1, 20).await {
        Err(ClientError::Status { status, body }) => {
            assert_eq!(status.as_u16(), Status::BadRequest.code);
            assert!(body.contains("at least 3 characters"));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}
