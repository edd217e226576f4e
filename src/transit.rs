//! Jeepney ride suggestions from a text-generation provider.
//!
//! The client embeds both trip endpoints and the whole transit catalog in a
//! single request, asks for strict JSON, and validates the shape of what
//! comes back. Whether the suggested rides make geographic sense is left to
//! the model; only the structure is checked here.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CatalogError, SuggestionError};
use crate::geo::GeoPoint;
use crate::traits::TextGenerator;
use crate::waypoints::{Waypoint, WaypointPair};

/// Instruction sent ahead of every request.
pub const DEFAULT_INSTRUCTION: &str = "You are a commuting assistant for jeepney riders. \
Using only the routes in Jeepney_Routes, describe how to travel from User_Current_Location \
to Destination_Location. Answer with a single JSON object of the form \
{\"route_summary\": string, \"steps\": [{\"from\": string, \"jeepney_id\": string, \"to\": string}], \
\"alternatives\": [{\"from\": string, \"jeepney_id\": string, \"to\": string}]}.";

/// Static catalog of known transit routes, loaded once at startup.
///
/// Treated as an opaque document: it is forwarded verbatim to the provider
/// and never indexed here.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitCatalog {
    document: Value,
}

impl TransitCatalog {
    pub fn from_value(document: Value) -> Self {
        Self { document }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Ok(Self::from_value(serde_json::from_str(json)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn as_value(&self) -> &Value {
        &self.document
    }
}

/// One trip endpoint as the caller knows it. Coordinates are optional so a
/// half-filled endpoint can be reported precisely; zero is a valid value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripEndpoint {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub label: Option<String>,
}

impl TripEndpoint {
    pub fn at(point: GeoPoint) -> Self {
        Self {
            latitude: Some(point.latitude()),
            longitude: Some(point.longitude()),
            label: None,
        }
    }

    #[must_use]
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<&Waypoint> for TripEndpoint {
    fn from(waypoint: &Waypoint) -> Self {
        Self {
            latitude: Some(waypoint.point().latitude()),
            longitude: Some(waypoint.point().longitude()),
            label: waypoint.label().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitStep {
    pub from: String,
    #[serde(rename = "jeepneyId")]
    pub jeepney_id: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitSuggestion {
    pub summary: String,
    pub steps: Vec<TransitStep>,
    pub alternatives: Vec<TransitStep>,
}

pub struct TransitSuggestionClient {
    generator: Arc<dyn TextGenerator>,
    catalog: Arc<TransitCatalog>,
    instruction: String,
}

impl std::fmt::Debug for TransitSuggestionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitSuggestionClient")
            .field("generator", &self.generator.name())
            .finish_non_exhaustive()
    }
}

impl TransitSuggestionClient {
    pub fn new(generator: Arc<dyn TextGenerator>, catalog: Arc<TransitCatalog>) -> Self {
        Self {
            generator,
            catalog,
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }

    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Requests a ride suggestion between `from` and `to`.
    ///
    /// Both endpoints are checked before any request is made.
    pub fn suggest(
        &self,
        from: Option<&TripEndpoint>,
        to: Option<&TripEndpoint>,
    ) -> Result<TransitSuggestion, SuggestionError> {
        let (from, from_point) = require(from, "from")?;
        let (to, to_point) = require(to, "to")?;

        let message = self.user_message(from, from_point, to, to_point);
        debug!(
            generator = self.generator.name(),
            message_len = message.len(),
            "requesting transit suggestion"
        );

        let raw = self
            .generator
            .generate_json(&self.instruction, &message)
            .inspect_err(|err| {
                warn!(
                    generator = self.generator.name(),
                    status = ?err.http_status(),
                    error = %err,
                    "transit suggestion request failed"
                );
            })?;

        parse_suggestion(&raw)
    }

    pub fn suggest_for(&self, pair: &WaypointPair) -> Result<TransitSuggestion, SuggestionError> {
        let from = pair.from.as_ref().map(TripEndpoint::from);
        let to = pair.to.as_ref().map(TripEndpoint::from);
        self.suggest(from.as_ref(), to.as_ref())
    }

    fn user_message(
        &self,
        from: &TripEndpoint,
        from_point: GeoPoint,
        to: &TripEndpoint,
        to_point: GeoPoint,
    ) -> String {
        let mut message = String::new();
        message.push_str(&endpoint_line("User_Current_Location", from, from_point));
        message.push('\n');
        message.push_str(&endpoint_line("Destination_Location", to, to_point));
        message.push_str("\nJeepney_Routes: ");
        message.push_str(&self.catalog.as_value().to_string());
        message
    }
}

fn require<'a>(
    endpoint: Option<&'a TripEndpoint>,
    role: &'static str,
) -> Result<(&'a TripEndpoint, GeoPoint), SuggestionError> {
    let endpoint = endpoint.ok_or(SuggestionError::MissingWaypoint(role))?;
    let (Some(latitude), Some(longitude)) = (endpoint.latitude, endpoint.longitude) else {
        return Err(SuggestionError::MissingWaypoint(role));
    };
    let point = GeoPoint::new(latitude, longitude)
        .map_err(|_| SuggestionError::InvalidCoordinate { latitude, longitude })?;
    Ok((endpoint, point))
}

fn endpoint_line(name: &str, endpoint: &TripEndpoint, point: GeoPoint) -> String {
    match endpoint.label.as_deref() {
        Some(label) => format!(
            "{name}: {}, {} ({label})",
            point.latitude(),
            point.longitude()
        ),
        None => format!("{name}: {}, {}", point.latitude(), point.longitude()),
    }
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    route_summary: Option<Value>,
    summary: Option<Value>,
    steps: Option<Value>,
    alternatives: Option<Value>,
}

/// Keys accepted for a step's route identifier, most specific first.
const ROUTE_ID_KEYS: [&str; 3] = ["jeepney_id", "jeepneyId", "route"];

/// Validates a provider answer into a [`TransitSuggestion`].
///
/// `route_summary` and a non-empty `steps` list are required and every step
/// must be complete. `alternatives` is optional; entries that are not
/// complete steps are dropped.
pub fn parse_suggestion(raw: &str) -> Result<TransitSuggestion, SuggestionError> {
    let body: RawSuggestion = serde_json::from_str(strip_code_fence(raw))
        .map_err(|err| SuggestionError::MalformedResponse(err.to_string()))?;

    let summary = [&body.route_summary, &body.summary]
        .into_iter()
        .find_map(|value| value.as_ref().and_then(text))
        .ok_or_else(|| SuggestionError::MalformedResponse("missing route_summary".to_string()))?;

    let steps = match body.steps {
        Some(Value::Array(steps)) => steps,
        Some(Value::Null) | None => {
            return Err(SuggestionError::MalformedResponse("missing steps".to_string()));
        }
        Some(_) => {
            return Err(SuggestionError::MalformedResponse(
                "steps is not a list".to_string(),
            ));
        }
    };
    if steps.is_empty() {
        return Err(SuggestionError::MalformedResponse("steps is empty".to_string()));
    }
    let steps = steps
        .iter()
        .enumerate()
        .map(|(i, step)| validate_step(step).map_err(|field| {
            SuggestionError::MalformedResponse(format!("step {i} is missing {field}"))
        }))
        .collect::<Result<Vec<_>, _>>()?;

    let alternatives = match body.alternatives {
        Some(Value::Array(alternatives)) => alternatives,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(kind = json_kind(&other), "ignoring alternatives that are not a list");
            Vec::new()
        }
    };
    let alternatives = alternatives
        .iter()
        .enumerate()
        .filter_map(|(i, step)| match validate_step(step) {
            Ok(step) => Some(step),
            Err(field) => {
                warn!(index = i, field, "dropping incomplete alternative");
                None
            }
        })
        .collect();

    Ok(TransitSuggestion {
        summary,
        steps,
        alternatives,
    })
}

/// A step is an object with non-empty `from`, route identifier and `to`.
fn validate_step(step: &Value) -> Result<TransitStep, &'static str> {
    let field = |key: &str| step.get(key).and_then(text);
    Ok(TransitStep {
        from: field("from").ok_or("from")?,
        jeepney_id: ROUTE_ID_KEYS
            .iter()
            .find_map(|key| field(*key))
            .ok_or("jeepneyId")?,
        to: field("to").ok_or("to")?,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Non-empty string or number, as text.
fn text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Models sometimes wrap JSON mode output in a Markdown fence anyway.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_suggestion() {
        let suggestion = parse_suggestion(
            r#"{
                "route_summary": "Ride 04L to Colon then walk.",
                "steps": [{"from": "Fuente Osmeña", "jeepney_id": "04L", "to": "Colon"}],
                "alternatives": [{"from": "Fuente Osmeña", "jeepneyId": "12G", "to": "Colon"}]
            }"#,
        )
        .unwrap();

        assert_eq!(suggestion.summary, "Ride 04L to Colon then walk.");
        assert_eq!(suggestion.steps.len(), 1);
        assert_eq!(suggestion.steps[0].jeepney_id, "04L");
        assert_eq!(suggestion.alternatives[0].jeepney_id, "12G");
    }

    #[test]
    fn test_parse_accepts_fenced_json_and_numeric_ids() {
        let suggestion = parse_suggestion(
            "```json\n{\"route_summary\": \"ok\", \"steps\": [{\"from\": \"A\", \"route\": 13, \"to\": \"B\"}]}\n```",
        )
        .unwrap();
        assert_eq!(suggestion.steps[0].jeepney_id, "13");
        assert!(suggestion.alternatives.is_empty());
    }

    #[test]
    fn test_missing_steps_is_malformed() {
        let err = parse_suggestion(r#"{"route_summary": "x"}"#).unwrap_err();
        assert_eq!(err, SuggestionError::MalformedResponse("missing steps".to_string()));
    }

    #[test]
    fn test_missing_summary_is_malformed() {
        let err = parse_suggestion(r#"{"steps": [{"from": "A", "jeepney_id": "1", "to": "B"}]}"#)
            .unwrap_err();
        assert_eq!(
            err,
            SuggestionError::MalformedResponse("missing route_summary".to_string())
        );
    }

    #[test]
    fn test_blank_step_field_is_malformed() {
        let err = parse_suggestion(
            r#"{"route_summary": "x", "steps": [{"from": "A", "jeepney_id": " ", "to": "B"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("step 0 is missing jeepneyId"));
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = parse_suggestion("Take the 04L jeepney.").unwrap_err();
        assert!(matches!(err, SuggestionError::MalformedResponse(_)));
    }

    #[test]
    fn test_incomplete_alternatives_are_dropped() {
        let suggestion = parse_suggestion(
            r#"{"route_summary": "x",
                "steps": [{"from": "A", "jeepney_id": "1", "to": "B"}],
                "alternatives": [{"from": "A", "to": "B"}, {"from": "A", "jeepney_id": "2", "to": "B"}]}"#,
        )
        .unwrap();
        assert_eq!(suggestion.alternatives.len(), 1);
        assert_eq!(suggestion.alternatives[0].jeepney_id, "2");
    }

    #[test]
    fn test_null_alternatives_are_empty() {
        let suggestion = parse_suggestion(
            r#"{"route_summary": "x",
                "steps": [{"from": "A", "jeepney_id": "1", "to": "B"}],
                "alternatives": null}"#,
        )
        .unwrap();
        assert!(suggestion.alternatives.is_empty());
    }

    #[test]
    fn test_non_object_alternatives_are_dropped() {
        let suggestion = parse_suggestion(
            r#"{"route_summary": "x",
                "steps": [{"from": "A", "jeepney_id": "1", "to": "B"}],
                "alternatives": ["take 04L", 17, {"from": "C", "jeepneyId": "12G", "to": "D"}]}"#,
        )
        .unwrap();
        assert_eq!(suggestion.alternatives.len(), 1);
        assert_eq!(suggestion.alternatives[0].jeepney_id, "12G");

        let suggestion = parse_suggestion(
            r#"{"route_summary": "x",
                "steps": [{"from": "A", "jeepney_id": "1", "to": "B"}],
                "alternatives": "none"}"#,
        )
        .unwrap();
        assert!(suggestion.alternatives.is_empty());
    }

    #[test]
    fn test_non_object_step_is_malformed() {
        let err = parse_suggestion(r#"{"route_summary": "x", "steps": ["take 04L"]}"#).unwrap_err();
        assert!(err.to_string().contains("step 0 is missing from"));
    }

    #[test]
    fn test_both_summary_keys_prefer_route_summary() {
        let suggestion = parse_suggestion(
            r#"{"summary": "short", "route_summary": "Ride 17B to Ayala",
                "steps": [{"from": "A", "jeepney_id": "17B", "jeepneyId": "04L", "to": "B"}]}"#,
        )
        .unwrap();
        assert_eq!(suggestion.summary, "Ride 17B to Ayala");
        assert_eq!(suggestion.steps[0].jeepney_id, "17B");

        let suggestion = parse_suggestion(
            r#"{"summary": "short", "steps": [{"from": "A", "route": "04L", "to": "B"}]}"#,
        )
        .unwrap();
        assert_eq!(suggestion.summary, "short");
    }

    #[test]
    fn test_require_treats_zero_as_present() {
        let endpoint = TripEndpoint {
            latitude: Some(0.0),
            longitude: Some(0.0),
            label: None,
        };
        let (_, point) = require(Some(&endpoint), "from").unwrap();
        assert_eq!(point, GeoPoint::new(0.0, 0.0).unwrap());
    }

    #[test]
    fn test_require_missing_longitude() {
        let endpoint = TripEndpoint {
            latitude: Some(10.3173),
            longitude: None,
            label: None,
        };
        assert_eq!(
            require(Some(&endpoint), "to").unwrap_err(),
            SuggestionError::MissingWaypoint("to")
        );
    }

    #[test]
    fn test_endpoint_line() {
        let point = GeoPoint::new(10.3173, 123.9057).unwrap();
        let line = endpoint_line("User_Current_Location", &TripEndpoint::at(point), point);
        assert_eq!(line, "User_Current_Location: 10.3173, 123.9057");
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog = TransitCatalog::from_json_str(r#"{"routes": [{"id": "04L"}]}"#).unwrap();
        assert_eq!(catalog.as_value()["routes"][0]["id"], "04L");
        assert!(TransitCatalog::from_json_str("not json").is_err());
    }
}
