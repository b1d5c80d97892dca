pub mod access;
pub mod auth;
pub mod church;
pub mod membership;
