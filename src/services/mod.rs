pub mod accounts;
pub mod cra_validation;
pub mod email;
pub mod invitations;
pub mod otp;
pub mod password_reset;
pub mod pdf;
pub mod tokens;

pub use email::{mailer_from_config, EmailMessage, Mailer};
