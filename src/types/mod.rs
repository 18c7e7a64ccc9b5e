//! Type definitions

pub mod contact;
pub mod import;
pub mod mapping;
pub mod messages;
pub mod organization;
pub mod table;

pub use contact::*;
pub use import::*;
pub use mapping::*;
pub use messages::*;
pub use organization::*;
pub use table::*;
