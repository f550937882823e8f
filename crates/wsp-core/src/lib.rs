pub mod error;
pub mod ids;
pub mod model;
pub mod types;
pub mod util;

pub use error::*;
pub use ids::*;
pub use model::*;
pub use types::*;
pub use util::*;
