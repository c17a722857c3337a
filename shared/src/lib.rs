//! Wire protocol, table configuration and vector math shared by the
//! pocket-tables server and its clients.

pub mod config;
pub mod protocol;
pub mod vec2;
