pub mod config;
pub mod desk;

pub use config::DeskSettings;
pub use desk::run;
