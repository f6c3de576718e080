/// JSON schema definitions sent to the model as a response constraint.
pub mod policy {
    use serde_json::{Value, json};

    use crate::analysis::{ClauseType, RiskLevel};
    use crate::config::HardenerConfig;

    fn evidence_quotes(max: usize) -> Value {
        json!({
            "type": "array",
            "maxItems": max,
            "items": { "type": "string" }
        })
    }

    fn evidence_item(fields: &[&str], max_quotes: usize) -> Value {
        let mut properties = serde_json::Map::new();
        for field in fields {
            properties.insert((*field).to_string(), json!({ "type": "string" }));
        }
        properties.insert("evidence_quotes".to_string(), evidence_quotes(max_quotes));

        let mut required: Vec<&str> = fields.to_vec();
        required.push("evidence_quotes");

        json!({
            "type": "object",
            "additionalProperties": false,
            "required": required,
            "properties": properties
        })
    }

    /// Schema for the risk report the model must return.
    pub fn analysis_schema(limits: &HardenerConfig) -> Value {
        let clause_types: Vec<&str> = ClauseType::ALL.iter().map(|t| t.as_str()).collect();
        let levels: Vec<&str> = RiskLevel::BANDS.iter().rev().map(|(_, l)| l.as_str()).collect();

        let mut red_flag = evidence_item(&["title", "why_it_matters"], limits.max_evidence_quotes);
        red_flag["required"] = json!(["clause_type", "title", "why_it_matters", "evidence_quotes"]);
        red_flag["properties"]["clause_type"] = json!({ "type": "string", "enum": clause_types });

        json!({
            "type": "object",
            "additionalProperties": false,
            "required": [
                "Risk_Score",
                "Risk_Level",
                "The_Gist",
                "Red_Flags",
                "Data_Rights",
                "The_Escape",
                "Confidence",
                "Disclaimers"
            ],
            "properties": {
                "Risk_Score": { "type": "integer", "minimum": 0, "maximum": 100 },
                "Risk_Level": { "type": "string", "enum": levels },
                "The_Gist": { "type": "string", "maxLength": limits.max_gist_chars },
                "Red_Flags": {
                    "type": "array",
                    "maxItems": limits.max_red_flags,
                    "items": red_flag
                },
                "Data_Rights": {
                    "type": "array",
                    "items": evidence_item(&["right", "details"], limits.max_evidence_quotes)
                },
                "The_Escape": {
                    "type": "array",
                    "items": evidence_item(&["step", "details"], limits.max_evidence_quotes)
                },
                "Confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                "Disclaimers": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": limits.max_disclaimers,
                    "items": { "type": "string" }
                }
            }
        })
    }
}
