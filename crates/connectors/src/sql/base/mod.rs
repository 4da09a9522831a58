pub mod adapter;
pub mod classify;
pub mod error;
pub mod requests;
pub mod row;
