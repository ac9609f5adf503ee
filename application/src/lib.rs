#[cfg(any(feature = "adapters", feature = "axum", feature = "sqlx"))]
compile_error!("application must not depend on adapters/framework crates");

pub mod batch_tracker;
pub mod change_filter;
pub mod dispatch;
pub mod error;
pub mod guard_config;
pub mod infrastructure_config;
pub mod ingress;
pub mod lockout;
pub mod orchestrator;
pub mod pattern;
pub mod planner;
pub mod ports;
pub mod preview;
pub mod repair;
pub mod slaves;
