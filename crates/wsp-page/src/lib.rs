pub mod record;
pub mod record_list;
pub mod watch;

pub use record::*;
pub use record_list::*;
pub use watch::*;
