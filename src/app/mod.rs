// Process wiring: one HTTP server plus the periodic jobs of the chosen role.

pub mod app;
pub mod directory;
pub mod server;
pub mod site;

pub use app::{App, Role};
pub use directory::DirectoryRole;
pub use server::AppServer;
pub use site::SiteRole;
