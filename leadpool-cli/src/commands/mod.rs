pub mod check_config;
pub mod import;
pub mod recompute;
pub mod serve;
