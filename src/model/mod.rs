pub mod config;
pub mod list;
pub mod registry;
pub mod task;
pub mod visibility;

pub use config::*;
pub use list::*;
pub use registry::*;
pub use task::*;
pub use visibility::*;
