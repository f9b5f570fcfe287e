// handlers/mod.rs - two security tiers
//
// Public (no token) → Protected (JWT, then per-route role allow-list).
// Role checks for protected groups live in the router; handlers only apply
// ownership rules on top.
pub mod public;
pub mod protected;
