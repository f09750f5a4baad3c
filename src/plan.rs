//! The fixed demonstration sequence run against the ticket catalogue.

use crate::model::Ticket;
use chrono::NaiveDate;
use serde_json::json;

/// Tickets issued after this date are listed first
pub const ISSUED_AFTER: &str = "2006-01-01";
/// Type code listed by the second step
pub const LISTED_TICKET_TYPE: i32 = 2;
/// Ticket whose circulation gets updated
pub const UPDATED_TICKET_ID: i32 = 1;
pub const UPDATED_CIRCULATION: i32 = 200_000;
/// Ticket that gets deleted
pub const DELETED_TICKET_ID: i32 = 10;
/// Types averaging less than this circulation are listed last
pub const MAX_AVERAGE_CIRCULATION: f64 = 100_000.0;

/// The ticket added by the insert step
pub fn new_ticket() -> Ticket {
    Ticket {
        id: 196,
        ticket_type: 1,
        description: "New ticket".to_string(),
        logo: 2,
        paper: 3,
        stripe: 1,
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        circulation: 100_000,
        rarity: 5,
        availability: "+".to_string(),
    }
}

/// Whether a step prints rows or an affected-row outcome
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Read,
    Write {
        success: &'static str,
        failure: &'static str,
    },
}

/// One statement of the sequence: which definition to run, with what, and how to report it
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub query_name: &'static str,
    pub heading: &'static str,
    pub params: serde_json::Value,
    pub kind: StepKind,
}

impl Step {
    fn read(query_name: &'static str, heading: &'static str, params: serde_json::Value) -> Self {
        Step {
            query_name,
            heading,
            params,
            kind: StepKind::Read,
        }
    }

    fn write(
        query_name: &'static str,
        heading: &'static str,
        params: serde_json::Value,
        success: &'static str,
        failure: &'static str,
    ) -> Self {
        Step {
            query_name,
            heading,
            params,
            kind: StepKind::Write { success, failure },
        }
    }
}

/// The ten catalogue steps, in the order they run
pub fn catalogue_plan() -> serde_json::Result<Vec<Step>> {
    Ok(vec![
        Step::read(
            "tickets_issued_after",
            "Tickets issued after a given date",
            json!({ "since": ISSUED_AFTER }),
        ),
        Step::read(
            "tickets_of_type",
            "Tickets of a given type",
            json!({ "type": LISTED_TICKET_TYPE }),
        ),
        Step::read("count_by_type", "Number of tickets of each type", json!({})),
        Step::read(
            "distinct_paper_stripe",
            "Distinct paper colour and magnetic stripe combinations",
            json!({}),
        ),
        Step::read(
            "tickets_with_logo",
            "Tickets with their logo types",
            json!({}),
        ),
        Step::read(
            "tickets_with_paper",
            "Tickets with their paper colours",
            json!({}),
        ),
        Step::write(
            "insert_ticket",
            "Adding a new ticket to the catalogue",
            new_ticket().to_params()?,
            "New ticket added successfully.",
            "No ticket was added.",
        ),
        Step::write(
            "update_circulation",
            "Updating ticket circulation by ID",
            json!({ "id": UPDATED_TICKET_ID, "circulation": UPDATED_CIRCULATION }),
            "Ticket circulation updated successfully.",
            "No ticket with that ID; circulation unchanged.",
        ),
        Step::write(
            "delete_ticket",
            "Deleting a ticket by ID",
            json!({ "id": DELETED_TICKET_ID }),
            "Ticket deleted successfully.",
            "No ticket with that ID; nothing deleted.",
        ),
        Step::read(
            "types_below_average_circulation",
            "Ticket types with average circulation below 100000",
            json!({ "max_average": MAX_AVERAGE_CIRCULATION }),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryDefinitions;

    #[test]
    fn test_plan_order_and_kinds() {
        let plan = catalogue_plan().unwrap();
        let names: Vec<&str> = plan.iter().map(|s| s.query_name).collect();
        assert_eq!(
            names,
            vec![
                "tickets_issued_after",
                "tickets_of_type",
                "count_by_type",
                "distinct_paper_stripe",
                "tickets_with_logo",
                "tickets_with_paper",
                "insert_ticket",
                "update_circulation",
                "delete_ticket",
                "types_below_average_circulation",
            ]
        );
        let writes = plan
            .iter()
            .filter(|s| matches!(s.kind, StepKind::Write { .. }))
            .count();
        assert_eq!(writes, 3);
    }

    #[test]
    fn test_plan_kinds_match_definitions() {
        let queries = QueryDefinitions::catalogue().unwrap();
        for step in catalogue_plan().unwrap() {
            let def = queries.get(step.query_name).unwrap();
            assert_eq!(
                def.is_read(),
                step.kind == StepKind::Read,
                "step {} disagrees with its definition",
                step.query_name
            );
            for param in &def.parameters {
                assert!(
                    step.params.get(&param.name).is_some(),
                    "step {} lacks parameter {}",
                    step.query_name,
                    param.name
                );
            }
        }
    }

    #[test]
    fn test_insert_step_binds_new_ticket() {
        let plan = catalogue_plan().unwrap();
        let insert = plan.iter().find(|s| s.query_name == "insert_ticket").unwrap();
        assert_eq!(insert.params["id"], 196);
        assert_eq!(insert.params["date"], "2024-01-01");
        assert_eq!(insert.params["availability"], "+");
    }
}
