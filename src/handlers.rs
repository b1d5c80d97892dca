pub mod auth;
pub mod church;
pub mod members;
pub mod rbac;
