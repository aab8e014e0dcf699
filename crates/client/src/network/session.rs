// Connection lifecycle as a plain state machine
//
// Every handler returns the side effects to perform; the browser glue executes them
// (socket sends, setTimeout, close). Nothing here touches web-sys, so the whole retry /
// reconnect policy is testable natively.
//
//   open -> ping after `ping_delay`, then every `ping_interval`
//   tick -> `requestInfo` when nothing is outstanding, armed with a timeout
//   timeout -> resend up to `max_retries`, then close + one reconnect
//   close -> unload the map (unless we closed it ourselves) + one reconnect
use std::cell::RefCell;
use std::collections::VecDeque;

use protocol::packets::ClientCommand;

use crate::config::NetworkSettings;

/// Number of round-trip samples averaged for interpolation pacing.
pub const RTT_SAMPLES: usize = 10;

/// A frame received from the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Text(String),
    Binary(Vec<u8>),
}

/// Transport events, translated from WebSocket / timer callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    Opened,
    Message(Incoming),
    Closed,
    Error(String),
    RequestTimeout { generation: u64 },
    ReconnectTimer,
    PingTimer { epoch: u64 },
}

/// Side effects requested by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Connect,
    Send(ClientCommand),
    /// (Re)arm the request timer; a stale generation firing later is ignored.
    ArmTimeout { generation: u64, delay_ms: u32 },
    ClearTimeout,
    Close,
    ScheduleReconnect { delay_ms: u32 },
    SchedulePing { epoch: u64, delay_ms: u32 },
    StartRenderLoop,
    LoadMap(String),
    UnloadMap,
}

/// Events waiting for the client to be free.
///
/// Callbacks can fire while the client is already borrowed (a nested dispatch, a render
/// in progress). Their events wait here and are handled in arrival order by the next
/// `drain` that finds the client free.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: RefCell<VecDeque<NetEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: NetEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Hand queued events to `handle` while `target` can be borrowed, passing each batch of
    /// actions to `execute` after the borrow ends. Events pushed by `execute` are picked up
    /// by the same loop. Returns how many events were handled.
    pub fn drain<T>(
        &self,
        target: &RefCell<T>,
        mut handle: impl FnMut(&mut T, NetEvent) -> Vec<Action>,
        mut execute: impl FnMut(Vec<Action>),
    ) -> usize {
        let mut handled = 0;
        loop {
            let Ok(mut state) = target.try_borrow_mut() else {
                return handled;
            };
            let Some(event) = self.events.borrow_mut().pop_front() else {
                return handled;
            };
            let actions = handle(&mut *state, event);
            drop(state);
            handled += 1;
            execute(actions);
        }
    }
}

/// Ring of the last round-trip times in milliseconds.
#[derive(Debug, Clone)]
pub struct RttTracker {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RttTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, rtt_ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(rtt_ms.max(0.0));
    }

    /// Mean of the stored samples, 0 when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for RttTracker {
    fn default() -> Self {
        Self::new(RTT_SAMPLES)
    }
}

#[derive(Debug)]
pub struct ConnectionManager {
    settings: NetworkSettings,
    /// A socket object exists (connecting or open).
    has_channel: bool,
    channel_open: bool,
    pending: bool,
    request_started_at: Option<f64>,
    retry_count: u32,
    /// Bumped whenever the outstanding timer becomes irrelevant.
    generation: u64,
    /// Bumped on every open; keys the ping chain of that connection.
    epoch: u64,
    pings_sent: u32,
    rtt: RttTracker,
    reconnect_scheduled: bool,
    /// Set while we are tearing down / re-establishing the channel ourselves.
    reconnecting: bool,
    render_loop_started: bool,
}

impl ConnectionManager {
    pub fn new(settings: NetworkSettings) -> Self {
        Self {
            settings,
            has_channel: false,
            channel_open: false,
            pending: false,
            request_started_at: None,
            retry_count: 0,
            generation: 0,
            epoch: 0,
            pings_sent: 0,
            rtt: RttTracker::default(),
            reconnect_scheduled: false,
            reconnecting: false,
            render_loop_started: false,
        }
    }

    pub fn set_settings(&mut self, settings: NetworkSettings) {
        self.settings = settings;
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.channel_open
    }

    #[inline]
    pub fn has_channel(&self) -> bool {
        self.has_channel
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[inline]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[inline]
    pub fn reconnect_scheduled(&self) -> bool {
        self.reconnect_scheduled
    }

    /// Average round trip over the last samples, in ms.
    #[inline]
    pub fn average_rtt(&self) -> f64 {
        self.rtt.average()
    }

    pub fn rtt(&self) -> &RttTracker {
        &self.rtt
    }

    /// Open a channel if none exists.
    pub fn connect(&mut self) -> Vec<Action> {
        if self.has_channel {
            self.reconnecting = false;
            return Vec::new();
        }
        self.has_channel = true;
        self.reconnecting = true;
        vec![Action::Connect]
    }

    pub fn on_open(&mut self) -> Vec<Action> {
        log::info!("Connection established");
        self.has_channel = true;
        self.channel_open = true;
        self.reconnecting = false;
        self.pending = false;
        self.request_started_at = None;
        self.retry_count = 0;
        self.epoch += 1;
        self.pings_sent = 0;

        let mut actions = vec![Action::SchedulePing {
            epoch: self.epoch,
            delay_ms: self.settings.ping_delay_ms,
        }];
        if !self.render_loop_started {
            self.render_loop_started = true;
            actions.push(Action::StartRenderLoop);
        }
        actions
    }

    /// Called once per display frame.
    pub fn on_tick(&mut self, now: f64) -> Vec<Action> {
        if self.channel_open && !self.pending {
            self.send_request(now)
        } else {
            Vec::new()
        }
    }

    /// Issue `requestInfo` and arm its timeout.
    pub fn send_request(&mut self, now: f64) -> Vec<Action> {
        self.pending = true;
        self.request_started_at = Some(now);
        self.generation += 1;
        vec![
            Action::ArmTimeout {
                generation: self.generation,
                delay_ms: self.settings.request_timeout_ms,
            },
            Action::Send(ClientCommand::RequestInfo),
        ]
    }

    pub fn on_timeout(&mut self, generation: u64, now: f64) -> Vec<Action> {
        if generation != self.generation || !self.pending {
            return Vec::new();
        }
        self.pending = false;
        self.request_started_at = None;

        if self.retry_count < self.settings.max_retries {
            self.retry_count += 1;
            log::warn!(
                "Request timeout, retrying ({}/{})",
                self.retry_count,
                self.settings.max_retries
            );
            return self.send_request(now);
        }

        log::error!("Maximum retries reached, reconnecting");
        self.retry_count = 0;
        self.reconnecting = true;
        self.has_channel = false;
        self.channel_open = false;
        self.generation += 1;

        let mut actions = vec![Action::Close];
        actions.extend(self.schedule_reconnect());
        actions
    }

    /// A snapshot arrived for the outstanding request.
    pub fn on_response(&mut self, now: f64) -> Vec<Action> {
        if let Some(started) = self.request_started_at.take() {
            self.rtt.push(now - started);
        }
        self.pending = false;
        self.retry_count = 0;
        self.generation += 1;
        vec![Action::ClearTimeout]
    }

    /// The frame could not be decoded: drop it and allow the next request.
    pub fn on_decode_failure(&mut self) -> Vec<Action> {
        self.release_pending()
    }

    /// The server answered `error`; the request will not be answered.
    pub fn on_server_error(&mut self) -> Vec<Action> {
        self.release_pending()
    }

    fn release_pending(&mut self) -> Vec<Action> {
        self.pending = false;
        self.request_started_at = None;
        self.generation += 1;
        vec![Action::ClearTimeout]
    }

    pub fn on_close(&mut self) -> Vec<Action> {
        log::info!("Connection closed");
        let was_reconnecting = self.reconnecting;
        self.has_channel = false;
        self.channel_open = false;
        self.pending = false;
        self.request_started_at = None;
        self.generation += 1;

        let mut actions = vec![Action::ClearTimeout];
        if !was_reconnecting {
            actions.push(Action::UnloadMap);
        }
        actions.extend(self.schedule_reconnect());
        actions
    }

    fn schedule_reconnect(&mut self) -> Vec<Action> {
        if self.reconnect_scheduled {
            return Vec::new();
        }
        self.reconnect_scheduled = true;
        vec![Action::ScheduleReconnect {
            delay_ms: self.settings.reconnect_delay_ms,
        }]
    }

    pub fn on_reconnect_timer(&mut self) -> Vec<Action> {
        self.reconnect_scheduled = false;
        self.connect()
    }

    /// Liveness ping: `ping:<avg rtt>`, then re-arm. Stale chains from older connections stop here.
    pub fn on_ping_timer(&mut self, epoch: u64) -> Vec<Action> {
        if epoch != self.epoch || !self.channel_open {
            return Vec::new();
        }
        let rtt = if self.pings_sent == 0 {
            0
        } else {
            self.rtt.average().round() as u32
        };
        self.pings_sent += 1;
        vec![
            Action::Send(ClientCommand::Ping(rtt)),
            Action::SchedulePing {
                epoch,
                delay_ms: self.settings.ping_interval_ms,
            },
        ]
    }

    /// Side channel: never touches pending / retry state.
    pub fn toggle_money_reveal(&self) -> Vec<Action> {
        if self.channel_open {
            vec![Action::Send(ClientCommand::ToggleMoneyReveal)]
        } else {
            Vec::new()
        }
    }
}
