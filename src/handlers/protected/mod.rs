// handlers/protected/mod.rs - endpoints behind jwt_auth_middleware
pub mod auth;
pub mod catalog;
pub mod clients;
pub mod content;
pub mod cra;
pub mod db;
pub mod invitations;
pub mod users;
