//! Output helpers honoring the global --json/--quiet/--verbose flags.
//!
//! The flags are carried in environment variables so every module can check
//! them without threading a config struct through the call tree.

use serde::Serialize;

/// True when `--json` was passed.
pub fn is_json() -> bool {
    std::env::var("RECON_JSON").is_ok()
}

/// True when `--quiet` was passed.
pub fn is_quiet() -> bool {
    std::env::var("RECON_QUIET").is_ok()
}

/// True when `--no-color` was passed or NO_COLOR is set.
pub fn no_color() -> bool {
    std::env::var("RECON_NO_COLOR").is_ok() || std::env::var("NO_COLOR").is_ok()
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

/// Terminal status symbols, degrading to ASCII when colors are off.
pub struct Style {
    color: bool,
}

impl Style {
    pub fn new() -> Self {
        Self { color: !no_color() }
    }

    pub fn ok_sym(&self) -> &'static str {
        if self.color {
            "\x1b[32m✓\x1b[0m"
        } else {
            "[OK]"
        }
    }

    pub fn warn_sym(&self) -> &'static str {
        if self.color {
            "\x1b[33m!\x1b[0m"
        } else {
            "[!!]"
        }
    }

    pub fn fail_sym(&self) -> &'static str {
        if self.color {
            "\x1b[31m✗\x1b[0m"
        } else {
            "[XX]"
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}
