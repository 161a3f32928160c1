//! Telemetry view-model for one container.
//!
//! `Loading` until the first response, then `Ready` with an optional error
//! line. Every snapshot replaces the previous one wholesale; only the
//! displayed numbers carry over, animating from what is on screen to the new
//! reading. A 401 stops polling and tells the owner to drop the token.
//!
//! Fetches are fire-and-forget: [`spawn_fetch`] runs each request on its own
//! thread and sends the result down a channel, so a slow response can land
//! after a newer one. The last one to arrive wins.

pub mod schedule;
pub mod tween;

use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use crate::activity::{ActivityKind, ActivityLog};
use crate::api::{ApiError, PanelApi, Telemetry};
use crate::config::schema::TelemetryConfig;

pub use schedule::PollSchedule;
pub use tween::Tween;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Ready,
}

/// What a single response did to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Updated,
    Failed(String),
    /// 401: polling is stopped and the stored token must be cleared.
    AuthLost,
}

/// Displayed values at one instant. Counters are floored like an odometer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub cpu_pct: u64,
    pub cpu_bar: f64,
    pub ram_used: u64,
    pub ram_bar: f64,
    pub rom_used: u64,
    pub rom_bar: f64,
    pub io_ops: u64,
    pub net_in_rate: u64,
    pub net_out_rate: u64,
    pub net_in_total: u64,
    pub net_out_total: u64,
}

#[derive(Debug, Clone)]
struct Animations {
    cpu_pct: Tween,
    cpu_bar: Tween,
    ram_used: Tween,
    ram_bar: Tween,
    rom_used: Tween,
    rom_bar: Tween,
    io_ops: Tween,
    net_in_rate: Tween,
    net_out_rate: Tween,
    net_in_total: Tween,
    net_out_total: Tween,
}

/// Target values a snapshot asks the display to move to.
fn targets(t: &Telemetry) -> [f64; 11] {
    [
        t.cpu_usage_pct().round(),
        t.cpu_usage_pct(),
        t.ram_used() as f64,
        t.ram_usage_pct(),
        t.rom_used() as f64,
        t.rom_usage_pct(),
        t.io.io_operations as f64,
        t.network.incoming_current_bytes as f64,
        t.network.outgoing_current_bytes as f64,
        t.network.incoming_total_bytes as f64,
        t.network.outgoing_total_bytes as f64,
    ]
}

impl Animations {
    fn settled(t: &Telemetry, counter_cap: Duration, bar_cap: Duration, now: Instant) -> Self {
        let [cpu_pct, cpu_bar, ram_used, ram_bar, rom_used, rom_bar, io, in_rate, out_rate, in_total, out_total] =
            targets(t);
        let counter = |v| Tween::counter(v, counter_cap, now);
        let bar = |v| Tween::bar(v, bar_cap, now);
        Self {
            cpu_pct: counter(cpu_pct),
            cpu_bar: bar(cpu_bar),
            ram_used: counter(ram_used),
            ram_bar: bar(ram_bar),
            rom_used: counter(rom_used),
            rom_bar: bar(rom_bar),
            io_ops: counter(io),
            net_in_rate: counter(in_rate),
            net_out_rate: counter(out_rate),
            net_in_total: counter(in_total),
            net_out_total: counter(out_total),
        }
    }

    fn all_mut(&mut self) -> [&mut Tween; 11] {
        [
            &mut self.cpu_pct,
            &mut self.cpu_bar,
            &mut self.ram_used,
            &mut self.ram_bar,
            &mut self.rom_used,
            &mut self.rom_bar,
            &mut self.io_ops,
            &mut self.net_in_rate,
            &mut self.net_out_rate,
            &mut self.net_in_total,
            &mut self.net_out_total,
        ]
    }

    fn retarget(&mut self, t: &Telemetry, now: Instant) {
        for (tween, target) in self.all_mut().into_iter().zip(targets(t)) {
            tween.retarget(target, now);
        }
    }

    fn frame(&self, now: Instant) -> Frame {
        let floor = |tween: &Tween| tween.value_at(now).max(0.0).floor() as u64;
        let pct = |tween: &Tween| tween.value_at(now).clamp(0.0, 100.0);
        Frame {
            cpu_pct: floor(&self.cpu_pct).min(100),
            cpu_bar: pct(&self.cpu_bar),
            ram_used: floor(&self.ram_used),
            ram_bar: pct(&self.ram_bar),
            rom_used: floor(&self.rom_used),
            rom_bar: pct(&self.rom_bar),
            io_ops: floor(&self.io_ops),
            net_in_rate: floor(&self.net_in_rate),
            net_out_rate: floor(&self.net_out_rate),
            net_in_total: floor(&self.net_in_total),
            net_out_total: floor(&self.net_out_total),
        }
    }

    fn is_settled(&self, now: Instant) -> bool {
        [
            &self.cpu_pct,
            &self.cpu_bar,
            &self.ram_used,
            &self.ram_bar,
            &self.rom_used,
            &self.rom_bar,
            &self.io_ops,
            &self.net_in_rate,
            &self.net_out_rate,
            &self.net_in_total,
            &self.net_out_total,
        ]
        .iter()
        .all(|t| t.is_settled(now))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryView {
    vmid: u32,
    snapshot: Option<Telemetry>,
    animations: Option<Animations>,
    error: Option<String>,
    responded: bool,
    schedule: PollSchedule,
    counter_cap: Duration,
    bar_cap: Duration,
    password_revealed: bool,
    activity: ActivityLog,
}

impl TelemetryView {
    /// Mount the view; the first poll is due at `now`.
    pub fn new(vmid: u32, config: &TelemetryConfig, now: Instant) -> Self {
        Self {
            vmid,
            snapshot: None,
            animations: None,
            error: None,
            responded: false,
            schedule: PollSchedule::start(config.poll_interval(), now),
            counter_cap: Duration::from_millis(config.counter_max_ms),
            bar_cap: Duration::from_millis(config.bar_max_ms),
            password_revealed: false,
            activity: ActivityLog::disabled(),
        }
    }

    pub fn with_activity_log(mut self, log: ActivityLog) -> Self {
        self.activity = log;
        self
    }

    pub fn vmid(&self) -> u32 {
        self.vmid
    }

    pub fn state(&self) -> ViewState {
        if self.responded {
            ViewState::Ready
        } else {
            ViewState::Loading
        }
    }

    pub fn snapshot(&self) -> Option<&Telemetry> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.schedule.is_active()
    }

    pub fn next_poll(&self) -> Option<Instant> {
        self.schedule.next_due()
    }

    /// Whether a fetch should be issued at `now`.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        self.schedule.tick(now)
    }

    /// Unmount: stop polling.
    pub fn stop(&mut self) {
        self.schedule.cancel();
    }

    /// Merge one fetch result.
    pub fn apply(&mut self, result: Result<Telemetry, ApiError>, now: Instant) -> PollOutcome {
        self.responded = true;
        match result {
            Ok(telemetry) => {
                match &mut self.animations {
                    Some(animations) => animations.retarget(&telemetry, now),
                    None => {
                        self.animations = Some(Animations::settled(
                            &telemetry,
                            self.counter_cap,
                            self.bar_cap,
                            now,
                        ))
                    }
                }
                self.snapshot = Some(telemetry);
                self.error = None;
                PollOutcome::Updated
            }
            Err(ApiError::Unauthorized) => {
                self.schedule.cancel();
                self.error = Some(ApiError::Unauthorized.to_string());
                self.activity.record(
                    ActivityKind::TelemetryAuthLost,
                    &self.vmid.to_string(),
                    false,
                    None,
                );
                PollOutcome::AuthLost
            }
            Err(e) => {
                let message = format!("could not load container telemetry: {e}");
                self.error = Some(message.clone());
                PollOutcome::Failed(message)
            }
        }
    }

    /// Fetch and apply synchronously.
    pub fn poll_now(&mut self, api: &dyn PanelApi, now: Instant) -> PollOutcome {
        let result = api.telemetry(self.vmid);
        self.apply(result, now)
    }

    /// Displayed values at `now`, once any snapshot has arrived.
    pub fn frame(&self, now: Instant) -> Option<Frame> {
        self.animations.as_ref().map(|a| a.frame(now))
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.animations
            .as_ref()
            .is_some_and(|a| !a.is_settled(now))
    }

    pub fn toggle_password(&mut self) {
        self.password_revealed = !self.password_revealed;
    }

    pub fn password_revealed(&self) -> bool {
        self.password_revealed
    }
}

/// Issue one telemetry fetch on a background thread.
pub fn spawn_fetch<A>(api: A, vmid: u32, tx: Sender<Result<Telemetry, ApiError>>)
where
    A: PanelApi + Send + 'static,
{
    thread::spawn(move || {
        let _ = tx.send(api.telemetry(vmid));
    });
}
