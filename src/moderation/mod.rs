//! Ticket moderation view.
//!
//! One fetched list, shown as two collapsible partitions split on the
//! `closed` flag. Approving (201) or rejecting a ticket removes it locally;
//! any failure leaves it in place so the action can be retried.

use crate::activity::{ActivityKind, ActivityLog};
use crate::api::{ApiError, PanelApi, Ticket};
use crate::notify::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Open,
    Closed,
}

#[derive(Debug, Clone, Default)]
pub struct TicketBoard {
    tickets: Vec<Ticket>,
    loaded: bool,
    open_expanded: bool,
    closed_expanded: bool,
    expanded_ticket: Option<String>,
    processing: Option<String>,
    notifications: Vec<Notification>,
    activity: ActivityLog,
}

impl TicketBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity_log(mut self, log: ActivityLog) -> Self {
        self.activity = log;
        self
    }

    pub fn load(&mut self, api: &dyn PanelApi) -> Result<(), ApiError> {
        match api.tickets() {
            Ok(tickets) => {
                self.tickets = tickets;
                self.loaded = true;
                let still_listed = self
                    .expanded_ticket
                    .as_deref()
                    .is_none_or(|id| self.tickets.iter().any(|t| t.id == id));
                if !still_listed {
                    self.expanded_ticket = None;
                }
                Ok(())
            }
            Err(e) => {
                self.notifications
                    .push(Notification::error(format!("could not load tickets: {e}")));
                Err(e)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn open(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.iter().filter(|t| !t.closed)
    }

    pub fn closed(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.iter().filter(|t| t.closed)
    }

    pub fn section(&self, section: Section) -> Vec<&Ticket> {
        match section {
            Section::Open => self.open().collect(),
            Section::Closed => self.closed().collect(),
        }
    }

    // -- Collapsing ---------------------------------------------------------

    pub fn toggle_section(&mut self, section: Section) {
        match section {
            Section::Open => self.open_expanded = !self.open_expanded,
            Section::Closed => self.closed_expanded = !self.closed_expanded,
        }
    }

    pub fn is_section_expanded(&self, section: Section) -> bool {
        match section {
            Section::Open => self.open_expanded,
            Section::Closed => self.closed_expanded,
        }
    }

    pub fn toggle_ticket(&mut self, id: &str) {
        if self.expanded_ticket.as_deref() == Some(id) {
            self.expanded_ticket = None;
        } else {
            self.expanded_ticket = Some(id.to_string());
        }
    }

    pub fn expanded_ticket(&self) -> Option<&str> {
        self.expanded_ticket.as_deref()
    }

    /// Ticket currently being approved or rejected; its buttons are
    /// disabled.
    pub fn processing(&self) -> Option<&str> {
        self.processing.as_deref()
    }

    // -- Moderation ---------------------------------------------------------

    /// Create the container requested by `id`.
    pub fn approve(&mut self, api: &dyn PanelApi, id: &str) -> Result<(), ApiError> {
        let name = self.get(id).map(|t| t.name.clone()).unwrap_or_else(|| id.to_string());
        self.processing = Some(id.to_string());
        let result = api.approve_ticket(id);
        self.processing = None;
        self.activity.record_outcome(ActivityKind::TicketApproved, id, &result);

        match &result {
            Ok(()) => {
                self.remove(id);
                self.notifications
                    .push(Notification::success(format!("container {name} created")));
            }
            Err(e) => self
                .notifications
                .push(Notification::error(format!("could not create container: {e}"))),
        }
        result
    }

    /// Delete the ticket `id`.
    pub fn reject(&mut self, api: &dyn PanelApi, id: &str) -> Result<(), ApiError> {
        self.processing = Some(id.to_string());
        let result = api.reject_ticket(id);
        self.processing = None;
        self.activity.record_outcome(ActivityKind::TicketRejected, id, &result);

        match &result {
            Ok(()) => {
                self.remove(id);
                self.notifications.push(Notification::success("ticket rejected"));
            }
            Err(e) => self
                .notifications
                .push(Notification::error(format!("could not reject ticket: {e}"))),
        }
        result
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn remove(&mut self, id: &str) {
        self.tickets.retain(|t| t.id != id);
        if self.expanded_ticket.as_deref() == Some(id) {
            self.expanded_ticket = None;
        }
    }
}
