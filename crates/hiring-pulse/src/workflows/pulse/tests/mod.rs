mod allocation;
mod common;
mod funnel;
mod trend;
