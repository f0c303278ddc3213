pub mod plan;
pub mod plugins;
pub mod routes;
pub mod start;
