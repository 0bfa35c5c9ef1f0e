pub mod aggregation_steps;
pub mod distribution_steps;
pub mod http_steps;
pub mod persistence_steps;
