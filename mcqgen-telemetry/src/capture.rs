use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{Level, Subscriber};
use tracing_subscriber::{Layer, layer::Context};

/// A log event recorded by [`CaptureLayer`].
#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    /// The event's `message` field, empty when the event had none.
    pub message: String,
    pub fields: HashMap<String, serde_json::Value>,
}

impl CapturedEvent {
    /// String value of a field, if present and recorded as a string.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// Shared storage for captured events.
#[derive(Debug, Clone, Default)]
pub struct EventCapture {
    events: Arc<RwLock<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer that appends every event to this capture.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer { capture: self.clone() }
    }

    /// All events captured so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.read().map(|events| events.clone()).unwrap_or_default()
    }

    /// Events at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        let level = level.to_string();
        self.events().into_iter().filter(|e| e.level == level).collect()
    }

    fn push(&self, event: CapturedEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

/// A tracing layer that records events in memory.
pub struct CaptureLayer {
    capture: EventCapture,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;

        let message = match fields.remove("message") {
            Some(serde_json::Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let metadata = event.metadata();
        self.capture.push(CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
        });
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn captures_message_level_and_fields() {
        let capture = EventCapture::new();
        let subscriber = tracing_subscriber::registry().with(capture.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(provider = "Gemini", chunk_count = 3u64, "fallback used");
            tracing::info!("done");
        });

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, "WARN");
        assert_eq!(events[0].message, "fallback used");
        assert_eq!(events[0].field_str("provider"), Some("Gemini"));
        assert_eq!(events[0].fields.get("chunk_count"), Some(&serde_json::json!(3)));
        assert_eq!(capture.at_level(Level::INFO).len(), 1);
    }
}
