pub mod alert_bus;

pub use alert_bus::{run_notifier, Alert, AlertBus, AlertKind};
