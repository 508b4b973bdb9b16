//! Route handlers behind [`handle_command`](crate::handle_command).
//!
//! Each handler parses its own request fields, drives the controller, and
//! renders a JSON body. Failures render as `{"status": <code>, "error": ...}`.

pub mod qr;
pub mod session;
pub mod url;
pub mod util;
