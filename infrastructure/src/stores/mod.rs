//! [`ConnectionStore`](toolgate_application::ConnectionStore) adapters.

mod json_file;
mod memory;

pub use json_file::JsonFileConnectionStore;
pub use memory::InMemoryConnectionStore;
