mod health;
mod max_current;
mod metrics;
mod mode;
mod status;
mod ui;

pub use health::health_handler;
pub use max_current::set_max_current;
pub use metrics::metrics_handler;
pub use mode::{minpv, pv, set_mode, start, stop};
pub use status::{cooldown_handler, status_handler};
pub use ui::ui_handler;
