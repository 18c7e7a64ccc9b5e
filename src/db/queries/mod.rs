//! Database queries

pub mod contact;
pub mod organization;
