//! Container list state with optimistic actions and delayed reconciliation.
//!
//! The same board backs the user's own list (`GET /proxmox/container`) and
//! the admin listing (`GET /proxmox/container/all`).
//!
//! Ordering: every list fetch takes a [`FetchTicket`] carrying an issue
//! sequence number. A response is applied only if it was issued after the
//! most recent local mutation and after the last applied fetch, so a slow
//! pre-action response can never overwrite an optimistic status or a newer
//! listing.

use std::time::{Duration, Instant};

use crate::activity::{ActivityKind, ActivityLog};
use crate::api::{ApiError, Container, ContainerStatus, ContainerSummary, PanelApi, types};
use crate::notify::Notification;

use super::{ContainerAction, DeleteBlocked, check_delete};

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A row the board can hold.
pub trait BoardItem: Clone {
    fn id(&self) -> u32;
    fn name(&self) -> &str;
    fn status(&self) -> ContainerStatus;
    fn set_status(&mut self, status: ContainerStatus);
    fn ram_bytes(&self) -> u64 {
        0
    }
    fn rom_bytes(&self) -> u64 {
        0
    }
    /// The listing endpoint this kind of row comes from.
    fn fetch(api: &dyn PanelApi) -> Result<Vec<Self>, ApiError>;
}

impl BoardItem for ContainerSummary {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn status(&self) -> ContainerStatus {
        self.status
    }
    fn set_status(&mut self, status: ContainerStatus) {
        self.status = status;
    }
    fn fetch(api: &dyn PanelApi) -> Result<Vec<Self>, ApiError> {
        api.my_containers()
    }
}

impl BoardItem for Container {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn status(&self) -> ContainerStatus {
        self.status
    }
    fn set_status(&mut self, status: ContainerStatus) {
        self.status = status;
    }
    fn ram_bytes(&self) -> u64 {
        self.ram_bytes
    }
    fn rom_bytes(&self) -> u64 {
        self.rom_bytes
    }
    fn fetch(api: &dyn PanelApi) -> Result<Vec<Self>, ApiError> {
        api.all_containers()
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Issue sequence of one list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// An action whose optimistic effect has been applied but whose response
/// has not been seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub action: ContainerAction,
    pub id: u32,
    previous: Option<ContainerStatus>,
}

/// Aggregates over the current list. Always derived, never cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardStats {
    pub total: usize,
    pub running: usize,
    pub ram_bytes: u64,
    pub rom_bytes: u64,
}

impl BoardStats {
    pub fn ram_pct(&self, host_ram_bytes: u64) -> f64 {
        types::usage_pct(self.ram_bytes, host_ram_bytes)
    }

    pub fn rom_pct(&self, host_storage_bytes: u64) -> f64 {
        types::usage_pct(self.rom_bytes, host_storage_bytes)
    }
}

#[derive(Debug, Clone)]
pub struct ContainerBoard<T: BoardItem> {
    items: Vec<T>,
    loaded: bool,
    expanded: Option<u32>,
    reconcile_delay: Duration,
    reconcile_at: Option<Instant>,
    issued: u64,
    applied: u64,
    mutated_at: u64,
    auth_lost: bool,
    notifications: Vec<Notification>,
    activity: ActivityLog,
}

pub type OwnedBoard = ContainerBoard<ContainerSummary>;
pub type AdminBoard = ContainerBoard<Container>;

impl<T: BoardItem> ContainerBoard<T> {
    pub fn new(reconcile_delay: Duration) -> Self {
        Self {
            items: Vec::new(),
            loaded: false,
            expanded: None,
            reconcile_delay,
            reconcile_at: None,
            issued: 0,
            applied: 0,
            mutated_at: 0,
            auth_lost: false,
            notifications: Vec::new(),
            activity: ActivityLog::disabled(),
        }
    }

    /// Record actions and reconciliations to `log`.
    pub fn with_activity_log(mut self, log: ActivityLog) -> Self {
        self.activity = log;
        self
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.items.iter().find(|c| c.id() == id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Set once any call answered 401. The owner should clear the token.
    pub fn auth_lost(&self) -> bool {
        self.auth_lost
    }

    pub fn stats(&self) -> BoardStats {
        self.items.iter().fold(BoardStats::default(), |mut acc, c| {
            acc.total += 1;
            if c.status().is_running() {
                acc.running += 1;
            }
            acc.ram_bytes += c.ram_bytes();
            acc.rom_bytes += c.rom_bytes();
            acc
        })
    }

    /// Drain pending notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // -- Expansion ----------------------------------------------------------

    pub fn expanded(&self) -> Option<u32> {
        self.expanded
    }

    /// Expand `id`, or collapse it if it is already the expanded row.
    pub fn toggle_expanded(&mut self, id: u32) {
        self.expanded = if self.expanded == Some(id) { None } else { Some(id) };
    }

    // -- Fetching -----------------------------------------------------------

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    /// Apply a fetch result. Returns `false` when the response was stale and
    /// discarded. Failures leave the list as it is.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<T>, ApiError>) -> bool {
        if ticket.0 <= self.mutated_at || ticket.0 <= self.applied {
            return false;
        }
        match result {
            Ok(items) => {
                self.applied = ticket.0;
                self.items = items;
                self.loaded = true;
                if let Some(id) = self.expanded
                    && self.get(id).is_none()
                {
                    self.expanded = None;
                }
            }
            Err(e) => self.report(&e),
        }
        true
    }

    /// Fetch and apply in one step.
    pub fn refresh(&mut self, api: &dyn PanelApi) -> bool {
        let ticket = self.begin_fetch();
        let result = T::fetch(api);
        self.apply_fetch(ticket, result)
    }

    // -- Actions ------------------------------------------------------------

    /// Apply the optimistic half of an action. Any fetch issued before this
    /// point becomes stale.
    pub fn begin_action(&mut self, action: ContainerAction, id: u32) -> PendingAction {
        self.mutated_at = self.issued;
        let mut previous = None;
        if let Some(status) = action.optimistic_status()
            && let Some(item) = self.items.iter_mut().find(|c| c.id() == id)
        {
            previous = Some(item.status());
            item.set_status(status);
        }
        PendingAction {
            action,
            id,
            previous,
        }
    }

    /// Apply the response to an action.
    ///
    /// Success schedules a reconciliation fetch `reconcile_delay` after
    /// `now`. Failure rolls back the optimistic status and refetches
    /// immediately.
    pub fn finish_action(
        &mut self,
        api: &dyn PanelApi,
        pending: PendingAction,
        result: Result<(), ApiError>,
        now: Instant,
    ) -> Result<(), ApiError> {
        self.activity.record_outcome(
            ActivityKind::ContainerAction,
            &format!("{} {}", pending.action, pending.id),
            &result,
        );

        match &result {
            Ok(()) => {
                if pending.action == ContainerAction::Delete {
                    self.items.retain(|c| c.id() != pending.id);
                    if self.expanded == Some(pending.id) {
                        self.expanded = None;
                    }
                }
                self.notifications
                    .push(Notification::success(pending.action.done_message()));
                self.reconcile_at = Some(now + self.reconcile_delay);
            }
            Err(e) => {
                if let Some(previous) = pending.previous
                    && let Some(item) = self.items.iter_mut().find(|c| c.id() == pending.id)
                {
                    item.set_status(previous);
                }
                self.report(e);
                self.refresh(api);
            }
        }
        result
    }

    /// Send one action: optimistic flip, request, then reconciliation.
    pub fn dispatch(
        &mut self,
        api: &dyn PanelApi,
        action: ContainerAction,
        id: u32,
        now: Instant,
    ) -> Result<(), ApiError> {
        let pending = self.begin_action(action, id);
        let result = api.container_action(action, id);
        self.finish_action(api, pending, result, now)
    }

    /// Delete from a detail view: the local gate must pass first.
    pub fn delete_confirmed(
        &mut self,
        api: &dyn PanelApi,
        id: u32,
        typed_name: &str,
        now: Instant,
    ) -> Result<Result<(), ApiError>, DeleteBlocked> {
        let item = self.get(id).ok_or(DeleteBlocked::NotFound(id))?;
        check_delete(item.status(), item.name(), typed_name)?;
        Ok(self.dispatch(api, ContainerAction::Delete, id, now))
    }

    // -- Reconciliation -----------------------------------------------------

    pub fn reconcile_deadline(&self) -> Option<Instant> {
        self.reconcile_at
    }

    /// Run the scheduled reconciliation if it is due. Returns whether a
    /// fetch was made.
    pub fn poll_reconcile(&mut self, api: &dyn PanelApi, now: Instant) -> bool {
        match self.reconcile_at {
            Some(at) if at <= now => {
                self.reconcile_at = None;
                let applied = self.refresh(api);
                self.activity.record(ActivityKind::Reconcile, "", applied, None);
                true
            }
            _ => false,
        }
    }

    fn report(&mut self, error: &ApiError) {
        if error.is_unauthorized() {
            self.auth_lost = true;
        }
        self.notifications.push(Notification::error(error.to_string()));
    }
}
