//! Display formatting shared by the terminal and browser surfaces.

use std::fmt;

use crate::config::schema::HostingConfig;

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// `1.5GB` above one GiB, whole `MB` otherwise.
pub fn format_bytes(bytes: u64) -> String {
    let gb = bytes as f64 / GIB;
    if gb > 1.0 {
        format!("{gb:.1}GB")
    } else {
        format!("{}MB", (bytes as f64 / MIB).round() as u64)
    }
}

pub fn format_cores(cores: u32) -> String {
    if cores == 1 {
        "1 core".to_string()
    } else {
        format!("{cores} cores")
    }
}

/// `42.0K`
pub fn format_io(ops: u64) -> String {
    format!("{:.1}K", ops as f64 / 1000.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoLevel {
    Low,
    Medium,
    High,
}

impl IoLevel {
    pub fn from_ops(ops: u64) -> Self {
        match ops {
            0..50_000 => Self::Low,
            50_000..100_000 => Self::Medium,
            _ => Self::High,
        }
    }
}

impl fmt::Display for IoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// SSH port of a container: the configured prefix followed by its id.
pub fn ssh_port(hosting: &HostingConfig, id: u32) -> String {
    format!("{}{id}", hosting.ssh_port_prefix)
}

/// `<name>.<domain>:<port>`
pub fn container_address(hosting: &HostingConfig, name: &str, id: u32) -> String {
    format!("{name}.{}:{}", hosting.domain, ssh_port(hosting, id))
}

/// `ssh root@<name>.<domain> -p <port>`
pub fn ssh_command(hosting: &HostingConfig, name: &str, id: u32) -> String {
    format!("ssh root@{name}.{} -p {}", hosting.domain, ssh_port(hosting, id))
}

pub fn telegram_link(hosting: &HostingConfig, passcode: &str) -> String {
    format!("https://t.me/{}?start={passcode}", hosting.telegram_bot)
}

/// Password as shown before the user reveals it.
pub fn mask_password(password: &str, revealed: bool) -> String {
    if revealed {
        password.to_string()
    } else {
        "•".repeat(password.chars().count().max(8))
    }
}

/// Percentage with no decimals, for bars and labels.
pub fn format_pct(pct: f64) -> String {
    format!("{pct:.0}%")
}

/// Fixed-width text bar, e.g. `[#####-----]`.
pub fn text_bar(pct: f64, width: usize) -> String {
    let filled = ((pct.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
