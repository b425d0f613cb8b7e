//! Delivery layer: renders the daily letter and hands it to a transport
//! (SMTP, or an outbox directory for dry runs).

mod error;
mod outbox;
mod render;
mod smtp;

pub use error::MailError;
pub use outbox::{Deliver, Message, Outbox, Sender};
pub use render::{Letter, render_message};
pub use smtp::SmtpDeliver;
