pub mod alliances;
pub mod errors;
pub mod ledger;
pub mod missions;
pub mod rewards;
pub mod schema;

pub use errors::{Error, Result};
pub use missions::*;
