pub mod config_io;
pub mod recovery;
pub mod snapshot;
pub mod store;
