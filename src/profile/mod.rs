//! Profile view: account details, the user's containers and Telegram
//! linking.

use chrono::{DateTime, NaiveDate};

use crate::api::{ContainerSummary, PanelApi, UserProfile};
use crate::config::schema::HostingConfig;
use crate::utils::format;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelegramState {
    /// Not linked yet; open this deep link to link the account.
    Pending(String),
    Linked,
}

/// One line of "my containers".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRow {
    pub id: u32,
    pub name: String,
    pub address: String,
    pub running: bool,
}

impl ContainerRow {
    pub fn status_text(&self) -> &'static str {
        if self.running { "Active" } else { "Stopped" }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileView {
    pub profile: Option<UserProfile>,
    pub containers: Vec<ContainerSummary>,
    pub error: Option<String>,
    auth_lost: bool,
}

impl ProfileView {
    /// Profile first, then the container list. A failed profile call skips
    /// the list; a 401 marks the session as lost.
    pub fn load(api: &dyn PanelApi) -> Self {
        let mut view = Self::default();

        match api.profile() {
            Ok(profile) => view.profile = Some(profile),
            Err(e) => {
                view.auth_lost = e.is_unauthorized();
                view.error = Some(format!("could not load profile: {e}"));
                return view;
            }
        }

        match api.my_containers() {
            Ok(containers) => view.containers = containers,
            Err(e) => {
                view.auth_lost = e.is_unauthorized();
                view.error = Some(format!("could not load containers: {e}"));
            }
        }
        view
    }

    /// The caller should clear the stored token.
    pub fn auth_lost(&self) -> bool {
        self.auth_lost
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| p.is_superuser)
    }

    pub fn telegram(&self, hosting: &HostingConfig) -> Option<TelegramState> {
        let profile = self.profile.as_ref()?;
        Some(match profile.tg_passcode.as_deref() {
            Some(code) if !code.is_empty() => {
                TelegramState::Pending(format::telegram_link(hosting, code))
            }
            _ => TelegramState::Linked,
        })
    }

    pub fn rows(&self, hosting: &HostingConfig) -> Vec<ContainerRow> {
        self.containers
            .iter()
            .map(|c| ContainerRow {
                id: c.id,
                name: c.name.clone(),
                address: format::container_address(hosting, &c.name, c.id),
                running: c.status.is_running(),
            })
            .collect()
    }
}

/// `2025-01-15` or an RFC 3339 timestamp → `January 15, 2025`. Anything
/// else is shown as sent.
pub fn format_registration_date(raw: &str) -> String {
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| {
            raw.get(..10)
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        });
    match date {
        Some(date) => date.format("%B %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ContainerStatus};
    use crate::api::fake::{self, FakeApi};

    #[test]
    fn loads_profile_then_containers() {
        let api = FakeApi::new();
        FakeApi::push(&api.profiles, Ok(fake::profile(false)));
        FakeApi::push(
            &api.owned,
            Ok(vec![fake::summary(101, "web-1", ContainerStatus::Running)]),
        );
        let view = ProfileView::load(&api);
        assert_eq!(api.calls(), vec!["profile", "my_containers"]);
        assert!(view.error.is_none());

        let rows = view.rows(&HostingConfig::default());
        assert_eq!(rows[0].address, "web-1.nv-server.online:22101");
        assert_eq!(rows[0].status_text(), "Active");
    }

    #[test]
    fn unauthorized_profile_skips_containers() {
        let api = FakeApi::new();
        FakeApi::push(&api.profiles, Err(ApiError::Unauthorized));
        let view = ProfileView::load(&api);
        assert!(view.auth_lost());
        assert_eq!(api.calls(), vec!["profile"]);
        assert!(view.profile.is_none());
    }

    #[test]
    fn telegram_link_until_linked() {
        let api = FakeApi::new();
        FakeApi::push(&api.profiles, Ok(fake::profile(true)));
        FakeApi::push(&api.owned, Ok(vec![]));
        let mut view = ProfileView::load(&api);
        let hosting = HostingConfig::default();
        assert_eq!(
            view.telegram(&hosting),
            Some(TelegramState::Pending(
                "https://t.me/nvcloud_bot?start=p4ss".to_string()
            ))
        );
        assert!(view.is_admin());

        if let Some(profile) = view.profile.as_mut() {
            profile.tg_passcode = None;
        }
        assert_eq!(view.telegram(&hosting), Some(TelegramState::Linked));
    }

    #[test]
    fn registration_dates() {
        assert_eq!(format_registration_date("2025-01-15"), "January 15, 2025");
        assert_eq!(
            format_registration_date("2024-11-03T08:15:00+00:00"),
            "November 3, 2024"
        );
        assert_eq!(
            format_registration_date("2024-11-03T08:15:00.123456"),
            "November 3, 2024"
        );
        assert_eq!(format_registration_date("yesterday"), "yesterday");
    }
}
