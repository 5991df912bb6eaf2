pub mod config;
pub mod device;
pub mod monitor;
pub mod output;
pub mod power_supply_info;
