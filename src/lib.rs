pub mod catalog;
pub mod cluster;
pub mod config;
pub mod datum;
pub mod db;
pub mod error;
pub mod kv;
pub mod protocol;
pub mod router;
pub mod rpc;
pub mod server;
pub mod sql;
