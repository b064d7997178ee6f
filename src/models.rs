use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Card Models =====

/// A stored card as exposed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i32,
    pub uuid: String,
    pub name: String,
    pub mana_value: f64,
    pub mana_cost: Option<String>,
    pub rarity: String,
    pub set_code: String,
    pub subtype: Option<String>,
    pub text: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub card_type: String,
}

/// A card built from an import row, not yet assigned a database id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub uuid: String,
    pub name: String,
    pub mana_value: f64,
    pub mana_cost: Option<String>,
    pub rarity: String,
    pub set_code: String,
    pub subtype: Option<String>,
    pub text: Option<String>,
    pub card_type: String,
}

// ===== Response Wrappers =====

/// One page of cards, echoing the normalized paging parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CardPage {
    pub cards: Vec<Card>,
    pub page: u32,
    pub limit: u32,
}
