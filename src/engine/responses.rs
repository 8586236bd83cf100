//! FTP Response handling
//!
//! Defines FTP response codes and formatting.

/// Standard FTP response codes
pub const OK: u16 = 200;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const LOGIN_SUCCESS: u16 = 230;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const SERVICE_UNAVAILABLE: u16 = 421;
pub const SYNTAX_ERROR: u16 = 500;
pub const NOT_IMPLEMENTED: u16 = 502;
pub const BAD_SEQUENCE: u16 = 503;
pub const NOT_LOGGED_IN: u16 = 530;

/// Format an FTP response message.
///
/// Multi-line messages use `NNN-` on every line but the last.
pub fn format_response(code: u16, message: &str) -> String {
    let lines: Vec<&str> = message.lines().collect();
    match lines.split_last() {
        Some((last, rest)) => {
            let mut out = String::new();
            for line in rest {
                out.push_str(&format!("{}-{}\r\n", code, line));
            }
            out.push_str(&format!("{} {}\r\n", code, last));
            out
        }
        None => format!("{} \r\n", code),
    }
}
