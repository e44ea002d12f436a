//! HTTP presentation layer

pub mod page;
pub mod server;

pub use page::PageSettings;
pub use server::DashboardServer;
