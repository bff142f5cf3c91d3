//! Hiring-pulse engine: funnel analytics, sourcing allocation, outreach trends and the
//! rule-driven recommendations built on them.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
