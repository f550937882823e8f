pub mod config;
pub mod demo;
pub mod session;
pub mod workspace_file;

pub use config::*;
pub use demo::*;
pub use session::*;
pub use workspace_file::*;
