//! Domain types

pub mod listing;
pub mod remote;
pub mod sync;
pub mod update;
pub mod user;

pub use listing::*;
pub use remote::*;
pub use sync::*;
pub use update::*;
pub use user::*;
