// Protected handlers: every route here sits behind jwt_auth_middleware
pub mod places;
