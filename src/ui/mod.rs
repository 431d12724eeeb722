pub mod commands;
mod executer;
pub mod notify;
pub mod panels;
pub mod popups;
pub mod traits;

pub use executer::run;
