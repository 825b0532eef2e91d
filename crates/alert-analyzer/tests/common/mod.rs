#![allow(dead_code)]

use alert_analyzer::WebhookAlert;
use serde_json::{json, Value};
use std::time::Duration;

pub fn alert_json(sid: &str, row: i64) -> Value {
    json!({
        "sid": sid,
        "search_name": "Suspicious PowerShell",
        "search_query": "index=win EventCode=4104",
        "description": "Encoded command line",
        "severity": "high",
        "kill_chain": "execution",
        "mitre_tactics": ["TA0002"],
        "mitre_techniques": ["T1059.001"],
        "row_number": row,
        "row_data": {"host": format!("ws-{}", row), "user": "svc_backup"}
    })
}

pub fn alert(sid: &str, row: i64) -> WebhookAlert {
    serde_json::from_value(alert_json(sid, row)).unwrap()
}

/// Poll `condition` every 10ms until it holds, panicking after 5s
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
