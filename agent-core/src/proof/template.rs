use regex::{Captures, Regex};

use rst_common::standard::serde_json::{self, Map, Value};

use super::request::ProofRequest;
use super::types::ProofError;

const PLACEHOLDER: &str = r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}";

/// fragment is what a value becomes inside the template text, strings are escaped without
/// their quotes so placeholders can sit inside JSON strings
fn fragment(value: &Value) -> String {
    match value {
        Value::String(text) => {
            let quoted = Value::String(text.to_owned()).to_string();
            quoted[1..quoted.len() - 1].to_string()
        }
        other => other.to_string(),
    }
}

/// render fills every `{{name}}` placeholder with its value and parses the outcome as a
/// proof request
pub fn render(template: &str, values: &Map<String, Value>) -> Result<ProofRequest, ProofError> {
    let placeholder =
        Regex::new(PLACEHOLDER).map_err(|err| ProofError::TemplateError(err.to_string()))?;

    let mut missing: Vec<String> = placeholder
        .captures_iter(template)
        .map(|captures| captures[1].to_string())
        .filter(|name| !values.contains_key(name))
        .collect();
    missing.sort();
    missing.dedup();

    if !missing.is_empty() {
        return Err(ProofError::TemplateError(format!(
            "missing template values: {}",
            missing.join(", ")
        )));
    }

    let rendered = placeholder.replace_all(template, |captures: &Captures| {
        values.get(&captures[1]).map(fragment).unwrap_or_default()
    });

    serde_json::from_str(&rendered).map_err(|err| ProofError::TemplateError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;

    const TEMPLATE: &str = r#"{
        "name": "{{ name }}",
        "version": "1.0",
        "requested_attributes": {
            "attr_0": {"name": "lastname", "restrictions": [{"cred_def_id": "{{definition}}"}]}
        },
        "requested_predicates": {
            "predicate_0": {"name": "age", "p_type": ">=", "p_value": {{minimum}}}
        }
    }"#;

    fn values() -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("name".to_string(), json!("age \"check\""));
        values.insert("definition".to_string(), json!("def-1"));
        values.insert("minimum".to_string(), json!(21));
        values
    }

    #[test]
    fn test_render() {
        let request = render(TEMPLATE, &values()).unwrap();
        assert_eq!(request.name, "age \"check\"");
        assert_eq!(
            request.requested_attributes["attr_0"].restrictions[0].cred_def_id,
            Some("def-1".to_string())
        );
        assert_eq!(request.requested_predicates["predicate_0"].p_value, 21);
        assert!(request.nonce.is_empty())
    }

    #[test]
    fn test_render_missing_values() {
        let mut values = values();
        values.remove("minimum");

        let result = render(TEMPLATE, &values);
        assert_eq!(
            result.unwrap_err(),
            ProofError::TemplateError("missing template values: minimum".to_string())
        )
    }

    #[test]
    fn test_render_invalid_request() {
        let result = render("{\"name\": {{name}}}", &values());
        assert!(matches!(result.unwrap_err(), ProofError::TemplateError(_)))
    }
}
