pub mod healthcheck;
pub mod location;
