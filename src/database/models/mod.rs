pub mod place;
pub mod user;

pub use place::{Coordinates, Place};
pub use user::User;
