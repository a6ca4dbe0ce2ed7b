pub mod event;
pub mod mood;
pub mod reactor;
pub mod telemetry;
