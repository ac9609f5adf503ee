pub mod batch;
pub mod change;
pub mod color;
pub mod coords;
pub mod error;
pub mod guard_config;
pub mod lockout;
pub mod project;
pub mod repair;
pub mod session;
pub mod worker;
