pub mod perk;
pub mod user;

pub use perk::*;
pub use user::*;
