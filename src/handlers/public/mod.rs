// Public handlers: no authentication required
pub mod places;
pub mod users;
