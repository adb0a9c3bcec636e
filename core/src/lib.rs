pub extern crate mueue;

pub mod config;
pub mod error;
pub mod identity;
pub mod network;
pub mod presence;
pub mod storage;
pub mod util;
