pub mod cache;
pub mod http;
pub mod markets;
pub mod sink;
pub mod sqlite;
