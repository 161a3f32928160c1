//! Scripted [`PanelApi`] for view-model tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::types::{
    Container, ContainerStatus, ContainerSummary, CpuReading, Credentials, IoReading,
    MemoryReading, NetworkReading, NewTicket, StorageReading, Telemetry, Ticket, UserProfile,
};
use super::{ApiError, PanelApi};
use crate::actions::ContainerAction;

type Script<T> = RefCell<VecDeque<Result<T, ApiError>>>;

/// Each endpoint pops its next scripted response; an empty script answers
/// with a network error. Every call is appended to `calls`.
#[derive(Default)]
pub struct FakeApi {
    pub profiles: Script<UserProfile>,
    pub owned: Script<Vec<ContainerSummary>>,
    pub all: Script<Vec<Container>>,
    pub telemetry: Script<Telemetry>,
    pub actions: Script<()>,
    pub creates: Script<()>,
    pub ticket_lists: Script<Vec<Ticket>>,
    pub approvals: Script<()>,
    pub rejections: Script<()>,
    pub calls: RefCell<Vec<String>>,
    pub created: RefCell<Vec<NewTicket>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T>(script: &Script<T>, response: Result<T, ApiError>) {
        script.borrow_mut().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn log(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

fn next<T>(script: &Script<T>) -> Result<T, ApiError> {
    script
        .borrow_mut()
        .pop_front()
        .unwrap_or_else(|| Err(ApiError::Network("no scripted response".to_string())))
}

impl PanelApi for FakeApi {
    fn profile(&self) -> Result<UserProfile, ApiError> {
        self.log("profile".to_string());
        next(&self.profiles)
    }

    fn my_containers(&self) -> Result<Vec<ContainerSummary>, ApiError> {
        self.log("my_containers".to_string());
        next(&self.owned)
    }

    fn all_containers(&self) -> Result<Vec<Container>, ApiError> {
        self.log("all_containers".to_string());
        next(&self.all)
    }

    fn telemetry(&self, vmid: u32) -> Result<Telemetry, ApiError> {
        self.log(format!("telemetry {vmid}"));
        next(&self.telemetry)
    }

    fn container_action(&self, action: ContainerAction, vmid: u32) -> Result<(), ApiError> {
        self.log(format!("{action} {vmid}"));
        next(&self.actions)
    }

    fn create_ticket(&self, ticket: &NewTicket) -> Result<(), ApiError> {
        self.log(format!("create {}", ticket.host_name));
        self.created.borrow_mut().push(ticket.clone());
        next(&self.creates)
    }

    fn tickets(&self) -> Result<Vec<Ticket>, ApiError> {
        self.log("tickets".to_string());
        next(&self.ticket_lists)
    }

    fn approve_ticket(&self, ticket_id: &str) -> Result<(), ApiError> {
        self.log(format!("approve {ticket_id}"));
        next(&self.approvals)
    }

    fn reject_ticket(&self, ticket_id: &str) -> Result<(), ApiError> {
        self.log(format!("reject {ticket_id}"));
        next(&self.rejections)
    }
}

// ---------------------------------------------------------------------------
// Sample data
// ---------------------------------------------------------------------------

pub fn summary(id: u32, name: &str, status: ContainerStatus) -> ContainerSummary {
    ContainerSummary {
        id,
        name: name.to_string(),
        status,
    }
}

pub fn container(id: u32, name: &str, status: ContainerStatus, ram_gib: u64, rom_gib: u64) -> Container {
    Container {
        id,
        name: name.to_string(),
        owner_username: "ivan".to_string(),
        rom_bytes: rom_gib << 30,
        ram_bytes: ram_gib << 30,
        cpu_cores: 1,
        status,
    }
}

pub fn ticket(id: &str, closed: bool) -> Ticket {
    Ticket {
        id: id.to_string(),
        created_at: "2025-03-01T12:00:00Z".to_string(),
        updated_at: None,
        name: format!("host-{id}"),
        owner_id: "u1".to_string(),
        closed,
        rom_bytes: 4 << 30,
        ram_bytes: 1 << 30,
        cpu_cores: 1,
        last_modified: None,
        owner_username: "ivan".to_string(),
    }
}

pub fn profile(is_superuser: bool) -> UserProfile {
    UserProfile {
        email: "ivan@example.com".to_string(),
        username: "ivan".to_string(),
        full_name: "Ivan Petrovich Sidorov".to_string(),
        total_containers: 2,
        registration_date: "2025-01-15".to_string(),
        is_superuser,
        tg_passcode: Some("p4ss".to_string()),
    }
}

/// Snapshot of an 8-core container with the given idle fraction.
pub fn telemetry(free_cpu: f64) -> Telemetry {
    Telemetry {
        container: summary(101, "web-1", ContainerStatus::Running),
        user: Credentials {
            username: "root".to_string(),
            password: "hunter2".to_string(),
        },
        cpu: CpuReading {
            cpu_cores: 8,
            free_cpu,
        },
        ram: MemoryReading {
            ram_bytes: 2 << 30,
            free_ram_bytes: 1 << 30,
        },
        rom: StorageReading {
            rom_bytes: 10 << 30,
            free_rom_bytes: 6 << 30,
        },
        io: IoReading {
            io_operations: 42_000,
        },
        network: NetworkReading {
            incoming_total_bytes: 5 << 20,
            outgoing_total_bytes: 3 << 20,
            incoming_current_bytes: 2048,
            outgoing_current_bytes: 1024,
        },
    }
}
