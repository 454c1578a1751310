pub mod correlation;
pub mod internal_auth;
