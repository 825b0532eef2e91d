//! Webhook alert payload and its validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One detection-search result row as delivered by the webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookAlert {
    /// Search ID shared by every row of one search
    pub sid: String,
    pub search_name: String,
    pub search_query: String,
    pub description: String,
    pub severity: String,
    pub kill_chain: String,
    pub mitre_tactics: Vec<String>,
    pub mitre_techniques: Vec<String>,
    /// Row index, unique within `sid`
    pub row_number: i64,
    /// The result row itself
    pub row_data: Map<String, Value>,
}

impl WebhookAlert {
    /// Check the invariants serde can't express
    pub fn validate(&self) -> Result<()> {
        let sid = self.sid.trim();
        if sid.is_empty() {
            return Err(Error::validation("sid must not be empty"));
        }
        // The SID names a directory under the data dir.
        if sid == "." || sid == ".." || self.sid.contains(['/', '\\']) {
            return Err(Error::validation(format!(
                "sid {:?} is not a valid directory name",
                self.sid
            )));
        }
        Ok(())
    }
}

/// Parse a webhook body holding either one alert or an array of alerts
///
/// The whole batch is rejected if any element is invalid.
pub fn parse_alert_batch(body: Value) -> Result<Vec<WebhookAlert>> {
    let alerts = match body {
        Value::Array(values) => {
            if values.is_empty() {
                return Err(Error::validation("empty alert batch"));
            }
            values
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    serde_json::from_value::<WebhookAlert>(value)
                        .map_err(|e| Error::validation(format!("item {}: {}", index, e)))
                })
                .collect::<Result<Vec<_>>>()?
        }
        Value::Object(_) => vec![serde_json::from_value::<WebhookAlert>(body)
            .map_err(|e| Error::validation(e.to_string()))?],
        other => {
            return Err(Error::validation(format!(
                "expected an alert object or an array of alerts, got {}",
                json_type_name(&other)
            )))
        }
    };

    for (index, alert) in alerts.iter().enumerate() {
        alert.validate().map_err(|e| match e {
            Error::Validation(msg) if alerts.len() > 1 => {
                Error::validation(format!("item {}: {}", index, msg))
            }
            other => other,
        })?;
    }

    Ok(alerts)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
