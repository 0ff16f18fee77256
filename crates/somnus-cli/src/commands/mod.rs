pub mod config;
pub mod headless;
pub mod history;
pub mod session;
