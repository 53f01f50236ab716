pub mod callapi;
pub mod logger;
pub mod prometheus;
