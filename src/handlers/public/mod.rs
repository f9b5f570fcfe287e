// handlers/public/mod.rs - endpoints reachable without a JWT
//
// Marketing site reads and submissions, token acquisition, and the
// token-carrying links sent by email (OTP, password reset, invitation,
// CRA validation).
pub mod auth;
pub mod catalog;
pub mod cra;
pub mod health;
pub mod invitations;
pub mod otp;
pub mod submissions;
