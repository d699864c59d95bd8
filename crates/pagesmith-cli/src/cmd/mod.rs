pub mod config;
pub mod generate;
pub mod notify;
pub mod serve;
pub mod verify;
