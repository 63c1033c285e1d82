//! CRM lookup tools — read-only helpers the LLM may call mid-turn.
//!
//! They answer from a small built-in directory of HCPs and product talking
//! points. Their output goes back to the model as a tool result; nothing
//! here touches the interaction form.

use serde_json::{Value, json};

pub(crate) const SEARCH_HCP: &str = "search_hcp";
pub(crate) const TALKING_POINTS: &str = "get_product_talking_points";
pub(crate) const SCHEDULE_FOLLOW_UP: &str = "schedule_follow_up";

struct Hcp {
    id: u32,
    name: &'static str,
    specialty: &'static str,
    hospital: &'static str,
}

const HCPS: [Hcp; 2] = [
    Hcp {
        id: 1,
        name: "Dr. Sarah Smith",
        specialty: "Cardiology",
        hospital: "City General",
    },
    Hcp {
        id: 2,
        name: "Dr. John Doe",
        specialty: "Oncology",
        hospital: "Westside Clinic",
    },
];

const PRODUCTS: [(&str, &str); 2] = [
    (
        "CardioFix",
        "CardioFix reduces systolic BP by 15% within 2 weeks. Phase 3 trials showed 98% tolerance.",
    ),
    (
        "OncoCure",
        "OncoCure is the first-line treatment for Stage 2. Primary benefit is reduced nausea.",
    ),
];

/// Whether `name` is one of the lookup tools (as opposed to a form tool).
pub(crate) fn is_lookup(name: &str) -> bool {
    matches!(name, SEARCH_HCP | TALKING_POINTS | SCHEDULE_FOLLOW_UP)
}

/// Run a lookup tool. The error string is sent back to the model as is.
pub(crate) fn execute(name: &str, args: &Value) -> Result<String, String> {
    match name {
        SEARCH_HCP => Ok(search_hcp(required(args, "name")?)),
        TALKING_POINTS => Ok(talking_points(required(args, "product_name")?)),
        SCHEDULE_FOLLOW_UP => Ok(format!(
            "Calendar Event Created: '{}' with {} on {}.",
            required(args, "action")?,
            required(args, "hcp_name")?,
            required(args, "date")?,
        )),
        other => Err(format!("Unknown tool '{other}'")),
    }
}

fn required<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args[key]
        .as_str()
        .ok_or_else(|| format!("Missing '{key}' argument"))
}

fn search_hcp(query: &str) -> String {
    let needle = query.to_lowercase();
    let found: Vec<String> = HCPS
        .iter()
        .filter(|hcp| hcp.name.to_lowercase().contains(&needle))
        .map(|hcp| {
            format!(
                "#{} {} ({}, {})",
                hcp.id, hcp.name, hcp.specialty, hcp.hospital
            )
        })
        .collect();

    if found.is_empty() {
        format!("No HCP found matching '{query}'.")
    } else {
        format!("Found HCPs: {}", found.join("; "))
    }
}

fn talking_points(product: &str) -> String {
    PRODUCTS
        .iter()
        .find(|(name, _)| *name == product)
        .map(|(_, points)| points.to_string())
        .unwrap_or_else(|| {
            let names: Vec<&str> = PRODUCTS.iter().map(|(name, _)| *name).collect();
            format!("Product data not found. Available: {}.", names.join(", "))
        })
}

/// Function definitions for the three lookup tools.
pub(crate) fn definitions() -> [Value; 3] {
    [
        json!({
            "type": "function",
            "function": {
                "name": SEARCH_HCP,
                "description": "Search for a healthcare professional by name to get their details. Useful for validating names before logging.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Full or partial HCP name" }
                    },
                    "required": ["name"]
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": TALKING_POINTS,
                "description": "Retrieve approved talking points and efficacy data for a product.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "product_name": { "type": "string" }
                    },
                    "required": ["product_name"]
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": SCHEDULE_FOLLOW_UP,
                "description": "Schedule a follow-up task or meeting in the calendar.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "hcp_name": { "type": "string" },
                        "action": { "type": "string" },
                        "date": { "type": "string", "description": "YYYY-MM-DD" }
                    },
                    "required": ["hcp_name", "action", "date"]
                }
            }
        }),
    ]
}
