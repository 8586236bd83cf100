//! Control connection commands
//!
//! Only the commands needed to log in and out are recognized. Everything else
//! is kept as `UNKNOWN` with its verb so the session can answer it.

/// An FTP command parsed from a control connection line.
#[derive(Debug, PartialEq)]
pub enum Command {
    USER(String),
    PASS(String),
    QUIT,
    NOOP,
    UNKNOWN(String),
}

impl Command {
    /// Line suitable for logs; never contains a password.
    pub fn redacted(&self) -> String {
        match self {
            Command::USER(name) => format!("USER {}", name),
            Command::PASS(_) => "PASS ******".to_string(),
            Command::QUIT => "QUIT".to_string(),
            Command::NOOP => "NOOP".to_string(),
            Command::UNKNOWN(verb) => verb.clone(),
        }
    }
}

/// Parses a raw command line received from a client.
///
/// `PASS` may carry an empty argument, anonymous clients often send one.
pub fn parse_command(raw: &str) -> Command {
    let trimmed = raw.trim_end_matches(['\r', '\n']).trim_start();
    let mut parts = trimmed.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
    let arg = parts.next().unwrap_or("");

    match cmd.as_str() {
        "USER" if !arg.trim().is_empty() => Command::USER(arg.trim().to_string()),
        "PASS" => Command::PASS(arg.to_string()),
        "QUIT" => Command::QUIT,
        "NOOP" => Command::NOOP,
        _ => Command::UNKNOWN(cmd),
    }
}
