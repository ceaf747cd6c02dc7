use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::ActionPayload;

/// One way of recovering a JSON object from raw model output.
///
/// Strategies are stateless; running one twice on the same text yields the
/// same result.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, raw: &str) -> Option<Map<String, Value>>;
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The whole response is the JSON object.
pub struct ExactJson;

impl ExtractionStrategy for ExactJson {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn extract(&self, raw: &str) -> Option<Map<String, Value>> {
        parse_object(raw.trim())
            .map_err(|e| debug!("Exact JSON parse failed: {e}"))
            .ok()
    }
}

/// The object sits between the first `{` and the last `}`, e.g. after a
/// sentence of prose the model added despite instructions.
pub struct BraceBounded;

impl ExtractionStrategy for BraceBounded {
    fn name(&self) -> &'static str {
        "brace_bounded"
    }

    fn extract(&self, raw: &str) -> Option<Map<String, Value>> {
        let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
            debug!("No braces found in model response");
            return None;
        };
        if end < start {
            return None;
        }

        parse_object(&raw[start..=end])
            .map_err(|e| debug!("Brace-bounded JSON parse failed: {e}"))
            .ok()
    }
}

/// The object is wrapped in a fenced code block (```json ... ```).
pub struct CodeFence;

impl ExtractionStrategy for CodeFence {
    fn name(&self) -> &'static str {
        "code_fence"
    }

    fn extract(&self, raw: &str) -> Option<Map<String, Value>> {
        let mut rest = raw;
        while let Some(open) = rest.find("```") {
            let after_open = &rest[open + 3..];
            // An alphanumeric rest of line is an info string (`json`, `JSON`);
            // anything else means the body starts right after the fence.
            let body_start = match after_open.find('\n') {
                Some(line_end)
                    if after_open[..line_end]
                        .trim()
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric()) =>
                {
                    line_end + 1
                }
                _ => 0,
            };
            let body = &after_open[body_start..];
            let Some(close) = body.find("```") else {
                return None;
            };

            if let Ok(map) = parse_object(body[..close].trim()) {
                return Some(map);
            }
            rest = &body[close + 3..];
        }
        None
    }
}

/// Ordered chain of [`ExtractionStrategy`]s; the first success wins.
pub struct ResponseExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ResponseExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn ExtractionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Recover a structured payload from raw model output, or `None` when no
    /// strategy finds a JSON object.
    pub fn extract(&self, raw: &str) -> Option<ActionPayload> {
        for strategy in &self.strategies {
            if let Some(object) = strategy.extract(raw) {
                debug!("Extracted model payload with '{}' strategy", strategy.name());
                return Some(ActionPayload::from_object(&object));
            }
        }

        warn!("Could not extract a JSON payload from model response: {raw}");
        None
    }
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactJson),
            Box::new(BraceBounded),
            Box::new(CodeFence),
        ])
    }
}
