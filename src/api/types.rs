//! Request and response bodies exchanged with the hosting API.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /api/v1/auth/signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// `GET /api/v1/user/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub total_containers: u32,
    pub registration_date: String,
    #[serde(default)]
    pub is_superuser: bool,
    /// One-time passcode for Telegram linking; absent once linked.
    #[serde(default)]
    pub tg_passcode: Option<String>,
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// Power state reported by the server. The panel never derives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
}

impl ContainerStatus {
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Element of `GET /api/v1/proxmox/container` (the caller's own containers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: u32,
    pub name: String,
    pub status: ContainerStatus,
}

/// Element of `GET /api/v1/proxmox/container/all` (admin listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: u32,
    pub name: String,
    pub owner_username: String,
    pub rom_bytes: u64,
    pub ram_bytes: u64,
    pub cpu_cores: u32,
    pub status: ContainerStatus,
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// `GET /api/v1/proxmox/container/telemetry/{id}`: one polled reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub container: ContainerSummary,
    pub user: Credentials,
    pub cpu: CpuReading,
    pub ram: MemoryReading,
    pub rom: StorageReading,
    pub io: IoReading,
    pub network: NetworkReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuReading {
    pub cpu_cores: u32,
    /// Idle fraction in `0.0..=1.0`.
    pub free_cpu: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub ram_bytes: u64,
    pub free_ram_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageReading {
    pub rom_bytes: u64,
    pub free_rom_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoReading {
    pub io_operations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkReading {
    pub incoming_total_bytes: u64,
    pub outgoing_total_bytes: u64,
    pub incoming_current_bytes: u64,
    pub outgoing_current_bytes: u64,
}

impl Telemetry {
    /// CPU usage in percent, clamped to `0..=100`.
    pub fn cpu_usage_pct(&self) -> f64 {
        clamp_pct((1.0 - self.cpu.free_cpu) * 100.0)
    }

    /// Used RAM, expressed as allocated minus free.
    pub fn ram_used(&self) -> u64 {
        self.ram.ram_bytes.saturating_sub(self.ram.free_ram_bytes)
    }

    pub fn ram_usage_pct(&self) -> f64 {
        usage_pct(self.ram_used(), self.ram.ram_bytes)
    }

    /// Used storage, expressed as allocated minus free.
    pub fn rom_used(&self) -> u64 {
        self.rom.rom_bytes.saturating_sub(self.rom.free_rom_bytes)
    }

    pub fn rom_usage_pct(&self) -> f64 {
        usage_pct(self.rom_used(), self.rom.rom_bytes)
    }
}

/// `used / total` in percent, clamped; zero when nothing is allocated.
pub fn usage_pct(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    clamp_pct(used as f64 / total as f64 * 100.0)
}

fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/proxmox/container/ticket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub rom_bytes: u64,
    pub ram_bytes: u64,
    pub cpu_cores: u32,
    pub host_name: String,
}

/// Element of `GET /api/v1/proxmox/container/ticket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    pub name: String,
    pub owner_id: String,
    pub closed: bool,
    pub rom_bytes: u64,
    pub ram_bytes: u64,
    pub cpu_cores: u32,
    #[serde(default)]
    pub last_modified: Option<String>,
    pub owner_username: String,
}
