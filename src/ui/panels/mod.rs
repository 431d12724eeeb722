pub mod contact_form;
pub mod dashboard;
pub mod login;
pub mod logs;

pub use contact_form::ContactFormPanel;
pub use dashboard::DashboardPanel;
pub use login::LoginPanel;
pub use logs::LogsPanel;
