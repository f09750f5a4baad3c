//! Typed records of the ticket catalogue schema.
//!
//! The runner works through raw SQL, so these types only appear where a
//! record crosses the program boundary: the ticket it inserts, and rows
//! read back in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of `main_catalogue`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i32,
    #[serde(rename = "type")]
    pub ticket_type: i32,
    pub description: String,
    /// References `logo_type.id`
    pub logo: i32,
    /// References `paper_color.id`
    pub paper: i32,
    pub stripe: i32,
    pub date: NaiveDate,
    pub circulation: i32,
    pub rarity: i32,
    pub availability: String,
}

impl Ticket {
    /// Request parameters for the `insert_ticket` definition
    pub fn to_params(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Build a ticket from a row object returned by a select over all ten columns
    pub fn from_row(row: &serde_json::Value) -> serde_json::Result<Self> {
        Ticket::deserialize(row)
    }
}

/// One row of `logo_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoType {
    pub id: i32,
    pub description: String,
}

/// One row of `paper_color`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperColor {
    pub id: i32,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Ticket {
        Ticket {
            id: 196,
            ticket_type: 1,
            description: "New ticket".to_string(),
            logo: 2,
            paper: 3,
            stripe: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            circulation: 100000,
            rarity: 5,
            availability: "+".to_string(),
        }
    }

    #[test]
    fn test_to_params_uses_column_names() {
        let params = sample().to_params().unwrap();
        assert_eq!(
            params,
            json!({
                "id": 196, "type": 1, "description": "New ticket", "logo": 2, "paper": 3,
                "stripe": 1, "date": "2024-01-01", "circulation": 100000, "rarity": 5,
                "availability": "+"
            })
        );
    }

    #[test]
    fn test_from_row() {
        let row = json!({
            "id": 196, "type": 1, "description": "New ticket", "logo": 2, "paper": 3,
            "stripe": 1, "date": "2024-01-01", "circulation": 100000, "rarity": 5,
            "availability": "+"
        });
        assert_eq!(Ticket::from_row(&row).unwrap(), sample());
    }

    #[test]
    fn test_lookup_records_deserialize() {
        let logo: LogoType = serde_json::from_value(json!({"id": 2, "description": "Eagle"})).unwrap();
        let paper: PaperColor =
            serde_json::from_value(json!({"id": 3, "description": "Green"})).unwrap();
        assert_eq!(logo.description, "Eagle");
        assert_eq!(paper.id, 3);
    }
}
