//! Tracing setup and the gateway event layer.
//!
//! [`GatewayEventLayer`] forwards gateway log events (those tagged with a
//! component prefix such as `[AiGateway]`) to a channel so a diagnostics
//! panel can show them live.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "mentor=info";

const GATEWAY_PREFIXES: &[&str] = &[
    "[AiGateway]",
    "[Persistence]",
    "[Mirror]",
    "[Auth]",
    "[Config]",
    "[Bootstrap]",
];

/// A gateway log event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GatewayEvent {
    /// Component prefix without brackets, e.g. `AiGateway`.
    pub component: String,
    pub target: String,
    pub level: String,
    pub message: String,
    pub fields: HashMap<String, Value>,
    pub timestamp: String,
}

/// Returns the component of a prefixed message (`"[Auth] ..."` gives `Auth`).
pub fn component_of(message: &str) -> Option<&str> {
    GATEWAY_PREFIXES
        .iter()
        .find(|prefix| message.starts_with(*prefix))
        .map(|prefix| prefix.trim_start_matches('[').trim_end_matches(']'))
}

pub struct GatewayEventLayer {
    sender: mpsc::UnboundedSender<GatewayEvent>,
}

impl GatewayEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<GatewayEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for GatewayEventLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let message = fields
            .remove("message")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let Some(component) = component_of(&message) else {
            return;
        };

        let gateway_event = GatewayEvent {
            component: component.to_string(),
            target: event.metadata().target().to_string(),
            level: event.metadata().level().to_string(),
            message: message.clone(),
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // A closed receiver only means nobody is watching.
        let _ = self.sender.send(gateway_event);
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(format!("{:?}", value)));
    }
}

/// Installs the global subscriber: `RUST_LOG` (or [`DEFAULT_FILTER`]), a fmt
/// layer, and the gateway event layer when `events` is given.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(events: Option<mpsc::UnboundedSender<GatewayEvent>>) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(events.map(GatewayEventLayer::new))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;

    #[test]
    fn test_component_of() {
        assert_eq!(component_of("[AiGateway] Cleared 2 cached responses"), Some("AiGateway"));
        assert_eq!(component_of("[Mirror] stored"), Some("Mirror"));
        assert_eq!(component_of("plain message"), None);
    }

    #[test]
    fn test_layer_forwards_only_gateway_events() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let subscriber = Registry::default().with(GatewayEventLayer::new(sender));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(attempt = 2u64, "[AiGateway] retrying");
            tracing::info!("unrelated");
            tracing::warn!("[Auth] Signed out");
        });

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.component, "AiGateway");
        assert_eq!(first.level, "INFO");
        assert_eq!(first.message, "[AiGateway] retrying");
        assert_eq!(first.fields.get("attempt"), Some(&serde_json::json!(2)));

        let second = receiver.try_recv().unwrap();
        assert_eq!(second.component, "Auth");
        assert!(receiver.try_recv().is_err());
    }
}
