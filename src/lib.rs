// src/lib.rs

pub mod catalog;
pub mod coerce;
pub mod commit;
pub mod mapping;
pub mod parse;
pub mod resolve;
pub mod session;
pub mod store;
pub mod validate;
