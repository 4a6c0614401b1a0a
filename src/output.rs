//! Output formatting and control utilities.
//!
//! CHANGELOG:
//! - 10/15/2026 - Batch report rendering and stderr progress lines
//! - 10/12/2026 - Initial implementation

use serde::Serialize;
use serde_json::{json, Value};

use crate::batch::BatchReport;
use crate::contacts::RecipientIdentity;
use crate::delivery::{DeliveryEvent, DeliveryObserver, TracingObserver};

/// Output control settings from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct OutputControls {
    pub json: bool,
    pub compact: bool,
    pub fields: Option<String>,
    pub max_text_chars: Option<u32>,
}

impl OutputControls {
    /// Emit data according to output controls.
    pub fn emit<T: Serialize>(&self, data: &T) -> String {
        let value = serde_json::to_value(data).unwrap_or(json!(null));

        let filtered = match self.fields {
            Some(ref fields) => filter_fields(&value, fields),
            None => value,
        };

        let truncated = match self.max_text_chars {
            Some(max_chars) => truncate_text_fields(&filtered, max_chars as usize),
            None => filtered,
        };

        if self.compact {
            serde_json::to_string(&truncated).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string_pretty(&truncated).unwrap_or_else(|_| "{}".to_string())
        }
    }

    /// Print data to stdout according to output controls.
    pub fn print<T: Serialize>(&self, data: &T) {
        println!("{}", self.emit(data));
    }

    /// Print a batch report: JSON when requested, otherwise one line per contact.
    pub fn print_report(&self, report: &BatchReport) {
        if self.json {
            self.print(report);
            return;
        }

        for outcome in &report.results {
            match &outcome.error {
                Some(error) => println!("{:<16} {}  ({})", outcome.status(), outcome.contact, error),
                None => println!("{:<16} {}", outcome.status(), outcome.contact),
            }
        }
        println!(
            "\nsent: {} (skipped {}), failed: {}",
            report.sent, report.skipped, report.failed
        );
        if let Some(reason) = &report.disconnected {
            println!("stopped early: session disconnected ({})", reason);
        }
    }
}

/// Filter JSON value to only include specified fields.
///
/// Applies to every object in arrays, and to the outcomes nested in a report.
fn filter_fields(value: &Value, fields: &str) -> Value {
    let field_list: Vec<&str> = fields.split(',').map(|s| s.trim()).collect();

    match value {
        Value::Array(arr) => Value::Array(arr.iter().map(|v| filter_fields(v, fields)).collect()),
        Value::Object(map) if map.contains_key("results") => {
            let mut out = map.clone();
            if let Some(results) = map.get("results") {
                out.insert("results".to_string(), filter_fields(results, fields));
            }
            Value::Object(out)
        }
        Value::Object(map) => {
            let mut filtered = serde_json::Map::new();
            for field in &field_list {
                if let Some(v) = map.get(*field) {
                    filtered.insert(field.to_string(), v.clone());
                }
            }
            Value::Object(filtered)
        }
        _ => value.clone(),
    }
}

/// Truncate string fields in JSON value.
fn truncate_text_fields(value: &Value, max_chars: usize) -> Value {
    match value {
        Value::String(s) => match s.char_indices().nth(max_chars) {
            Some((idx, _)) => Value::String(format!("{}...", &s[..idx])),
            None => value.clone(),
        },
        Value::Array(arr) => {
            Value::Array(arr.iter().map(|v| truncate_text_fields(v, max_chars)).collect())
        }
        Value::Object(map) => {
            let mut truncated = serde_json::Map::new();
            for (k, v) in map {
                truncated.insert(k.clone(), truncate_text_fields(v, max_chars));
            }
            Value::Object(truncated)
        }
        _ => value.clone(),
    }
}

/// Format error as JSON.
pub fn format_error(error: &str) -> String {
    serde_json::to_string(&json!({
        "error": error,
        "success": false
    }))
    .unwrap_or_else(|_| format!(r#"{{"error":"{}"}}"#, error))
}

/// Progress lines on stderr so stdout stays machine-readable.
///
/// Without `verbose`, delivery steps go to the log instead of the terminal.
pub struct ProgressPrinter {
    pub verbose: bool,
}

impl DeliveryObserver for ProgressPrinter {
    fn on_step(&self, contact: &RecipientIdentity, event: &DeliveryEvent) {
        if !self.verbose {
            TracingObserver.on_step(contact, event);
            return;
        }
        match event {
            DeliveryEvent::SendFailed { attempt, reason } => {
                eprintln!("  {} attempt {}: send failed: {}", contact, attempt + 1, reason)
            }
            DeliveryEvent::Mismatch { attempt, reason, .. } => {
                eprintln!("  {} attempt {}: {}", contact, attempt + 1, reason)
            }
            DeliveryEvent::AliasFallback { alias, .. } => {
                eprintln!("  {} -> {}", contact, alias)
            }
            DeliveryEvent::AlreadySent => eprintln!("  {} already has this message", contact),
            _ => {}
        }
    }

    fn on_progress(&self, current: usize, total: usize, contact: &RecipientIdentity) {
        eprintln!("[{}/{}] {}", current, total, contact);
    }
}
