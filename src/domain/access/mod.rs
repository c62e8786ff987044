//! Access decisions: attempt records and visitor QR codes.

mod attempt;
mod qr;

pub use attempt::{AccessAttempt, AccessMethod, Direction, NewAccessAttempt, VisitorInfo};
pub use qr::{QrCode, EXPIRES_HOURS_RANGE, MAX_USES_RANGE};
