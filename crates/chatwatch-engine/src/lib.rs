pub mod backend;
pub mod config;
pub mod control;
pub mod detector;
pub mod extraction;
pub mod monitor;
pub mod notifier;
pub mod resolution;
pub mod session;
pub mod snapshot;
pub mod state;

pub use chatwatch_common::error;
pub use chatwatch_common::protocol;

pub use backend::{Backend, BackendError, NavigationResult};
pub use control::{ControlError, MonitorController, MonitorFactory};
pub use monitor::{Monitor, MonitorError, MonitorSettings, MonitorState, TickOutcome};
pub use notifier::{NotificationEvent, Notifier, NotifyError};
pub use snapshot::{ConversationSnapshot, TOP_N};
