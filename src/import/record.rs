//! Header-driven mapping from CSV rows to cards.

use csv::StringRecord;
use std::collections::HashMap;

use super::error::{ImportError, RowError};
use crate::models::NewCard;

/// Columns the import file must provide.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "uuid",
    "manaValue",
    "manaCost",
    "name",
    "rarity",
    "setCode",
    "subtypes",
    "text",
    "type",
];

/// Column name to position mapping built from the header row.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
    width: usize,
}

impl ColumnIndex {
    /// Build the mapping, failing when a required column is absent.
    pub fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let mut positions = HashMap::with_capacity(headers.len());
        for (position, name) in headers.iter().enumerate() {
            // First occurrence wins for repeated header names.
            positions.entry(name.trim().to_string()).or_insert(position);
        }

        let missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !positions.contains_key(*column))
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        Ok(Self {
            positions,
            width: headers.len(),
        })
    }

    /// Number of columns declared by the header.
    pub fn width(&self) -> usize {
        self.width
    }

    fn field<'a>(&self, row: &'a StringRecord, column: &str) -> Option<&'a str> {
        self.positions
            .get(column)
            .and_then(|position| row.get(*position))
    }
}

/// One parsed row, addressed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRecord {
    pub line: u64,
    pub uuid: String,
    pub mana_value: String,
    pub mana_cost: String,
    pub name: String,
    pub rarity: String,
    pub set_code: String,
    pub subtypes: String,
    pub text: String,
    pub card_type: String,
}

impl CardRecord {
    /// Map a raw row through the header.
    ///
    /// Rows with fewer fields than the header are rejected. Trailing extra
    /// fields are ignored.
    pub fn from_row(row: &StringRecord, columns: &ColumnIndex) -> Result<Self, RowError> {
        let line = row.position().map(|pos| pos.line()).unwrap_or(0);
        if row.len() < columns.width() {
            return Err(RowError::format(
                line,
                format!("expected {} fields, found {}", columns.width(), row.len()),
            ));
        }

        let get = |column: &str| -> Result<String, RowError> {
            columns
                .field(row, column)
                .map(str::to_string)
                .ok_or_else(|| RowError::format(line, format!("missing column '{column}'")))
        };

        Ok(Self {
            line,
            uuid: get("uuid")?.trim().to_string(),
            mana_value: get("manaValue")?,
            mana_cost: get("manaCost")?,
            name: get("name")?,
            rarity: get("rarity")?,
            set_code: get("setCode")?,
            subtypes: get("subtypes")?,
            text: get("text")?,
            card_type: get("type")?,
        })
    }

    /// Convert the record into a card ready to be staged.
    pub fn into_card(self) -> Result<NewCard, RowError> {
        if self.uuid.is_empty() {
            return Err(RowError::format(self.line, "empty uuid"));
        }

        let mana_value = match self.mana_value.trim() {
            "" => 0.0,
            raw => raw.parse::<f64>().map_err(|_| {
                RowError::format(self.line, format!("invalid manaValue '{raw}'"))
            })?,
        };

        Ok(NewCard {
            uuid: self.uuid,
            name: self.name,
            mana_value,
            mana_cost: non_empty(self.mana_cost),
            rarity: self.rarity,
            set_code: self.set_code,
            subtype: non_empty(self.subtypes),
            text: non_empty(self.text),
            card_type: self.card_type,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
