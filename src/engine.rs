//! Watch face engine
//!
//! The host (the firmware main loop, or a test) feeds lifecycle events, sync
//! reports and icon results into the [`Engine`]. Each call answers with the
//! [`RenderCommand`]s the host has to carry out: redraw, arm or cancel the
//! tick timer, drive the sync connection, fetch an icon. Painting itself is
//! requested with [`Engine::draw`].

use chrono::{FixedOffset, NaiveDateTime, Offset, Utc};
use embedded_graphics::primitives::Rectangle;
use heapless::Vec;

use crate::{
    config::INTERACTIVE_UPDATE_RATE_MS,
    icon::{IconBitmap, IconError, IconRequest, IconSlot, IconTicket},
    state::{DisplayState, FaceShape},
    sync::{latest_weather, ConnectionState, SyncEvent, SyncListener},
    time,
    ui::{Frame, SunshineWatchface, WatchFace},
};

const MAX_RENDER_COMMANDS: usize = 8;

/// Commands produced by one event.
pub type Commands = Vec<RenderCommand, MAX_RENDER_COMMANDS>;

/// Capability to deliver one tick. Re-arming the timer or tearing the engine
/// down invalidates every token handed out before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerToken {
    generation: u32,
}

/// Work the host has to do on behalf of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderCommand {
    /// Paint a new frame
    Invalidate,
    /// Deliver `TimerFired(token)` after `delay_ms`, replacing any pending tick
    ScheduleTick { token: TimerToken, delay_ms: u64 },
    /// Drop the pending tick
    CancelTick,
    /// Open the device-sync connection
    Connect,
    /// Close the device-sync connection
    Disconnect,
    /// Start delivering data change events
    AddListener,
    /// Stop delivering data change events
    RemoveListener,
    /// Report the data items currently on the channel
    FetchSnapshot,
    /// Run an icon fetch and report the result with its ticket
    FetchIcon(IconRequest),
}

/// Host lifecycle callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Create,
    VisibilityChanged(bool),
    AmbientModeChanged(bool),
    PropertiesChanged { low_bit_ambient: bool },
    /// Coarse tick from the host, once a minute in ambient mode
    TimeTick,
    /// A tick requested with [`RenderCommand::ScheduleTick`]
    TimerFired { token: TimerToken, now_ms: u64 },
    WindowInsets(FaceShape),
    /// System time zone changed
    TimeZoneChanged(FixedOffset),
    Destroy,
}

pub(crate) fn push(commands: &mut Commands, command: RenderCommand) {
    if commands.push(command).is_err() {
        warn!("render command queue full");
    }
}

pub struct Engine<F = SunshineWatchface> {
    face: F,
    state: DisplayState,
    sync: SyncListener,
    icons: IconSlot,
    visible: bool,
    timezone_receiver: bool,
    utc_offset: FixedOffset,
    timer_generation: u32,
    armed: Option<TimerToken>,
}

impl Default for Engine<SunshineWatchface> {
    fn default() -> Self {
        Self::new(SunshineWatchface::default())
    }
}

impl<F: WatchFace> Engine<F> {
    pub fn new(face: F) -> Self {
        Self {
            face,
            state: DisplayState::default(),
            sync: SyncListener::default(),
            icons: IconSlot::default(),
            visible: false,
            timezone_receiver: false,
            utc_offset: Utc.fix(),
            timer_generation: 0,
            armed: None,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.sync.state()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Whether the interactive tick timer should run.
    pub fn timer_should_run(&self) -> bool {
        self.visible && !self.state.ambient_mode
    }

    pub fn on_lifecycle_event(&mut self, event: LifecycleEvent) -> Commands {
        let mut commands = Commands::new();

        match event {
            LifecycleEvent::Create => {
                info!("watch face created");
            }
            LifecycleEvent::VisibilityChanged(visible) => {
                debug!("visibility changed: {}", visible);
                self.visible = visible;
                if visible {
                    self.sync.connect(&mut commands);
                    self.timezone_receiver = true;
                    push(&mut commands, RenderCommand::Invalidate);
                } else {
                    self.sync.disconnect(&mut commands);
                    self.timezone_receiver = false;
                }
                self.update_timer(&mut commands);
            }
            LifecycleEvent::AmbientModeChanged(ambient) => {
                if self.state.ambient_mode != ambient {
                    debug!("ambient mode: {}", ambient);
                    self.state.ambient_mode = ambient;
                    push(&mut commands, RenderCommand::Invalidate);
                }
                self.update_timer(&mut commands);
            }
            LifecycleEvent::PropertiesChanged { low_bit_ambient } => {
                self.state.low_bit_ambient = low_bit_ambient;
            }
            LifecycleEvent::TimeTick => {
                push(&mut commands, RenderCommand::Invalidate);
            }
            LifecycleEvent::TimerFired { token, now_ms } => {
                self.on_timer(token, now_ms, &mut commands);
            }
            LifecycleEvent::WindowInsets(shape) => {
                debug!("screen shape: {}", shape);
                self.face.set_shape(shape);
                push(&mut commands, RenderCommand::Invalidate);
            }
            LifecycleEvent::TimeZoneChanged(offset) => {
                self.utc_offset = offset;
                if self.timezone_receiver {
                    push(&mut commands, RenderCommand::Invalidate);
                }
            }
            LifecycleEvent::Destroy => {
                info!("watch face destroyed");
                self.visible = false;
                self.timezone_receiver = false;
                self.disarm(&mut commands);
                self.sync.disconnect(&mut commands);
            }
        }

        commands
    }

    pub fn on_sync_event(&mut self, event: SyncEvent<'_>) -> Commands {
        let mut commands = Commands::new();
        let snapshot = matches!(event, SyncEvent::Snapshot(_));

        let Some(items) = self.sync.on_event(event, &mut commands) else {
            return commands;
        };

        let updated = match latest_weather(items) {
            Some(weather) => {
                self.state.apply_weather(&weather);
                match weather.icon {
                    Some(asset) => {
                        let request = self.icons.request(asset);
                        push(&mut commands, RenderCommand::FetchIcon(request));
                    }
                    None => self.icons.supersede(),
                }
                true
            }
            None => false,
        };

        if updated || snapshot {
            push(&mut commands, RenderCommand::Invalidate);
        }
        commands
    }

    /// Result of a [`RenderCommand::FetchIcon`]. Only the latest request can
    /// replace the icon; failures keep the current one.
    pub fn on_icon_fetched(
        &mut self,
        ticket: IconTicket,
        result: Result<IconBitmap, IconError>,
    ) -> Commands {
        let mut commands = Commands::new();

        if !self.icons.is_current(ticket) {
            debug!("icon fetch {} superseded", ticket.sequence());
            return commands;
        }

        match result {
            Ok(icon) => {
                self.state.icon = Some(icon);
                push(&mut commands, RenderCommand::Invalidate);
            }
            Err(err) => {
                warn!("icon fetch failed: {}", err);
            }
        }
        commands
    }

    /// Refresh the time fields from the wall clock, in the current zone.
    pub fn update_time(&mut self, now_utc: NaiveDateTime) {
        let local = time::to_local(now_utc, self.utc_offset);
        self.state.set_time(&local);
    }

    /// Compose the frame for `bounds`. Call [`Engine::update_time`] first.
    pub fn draw(&self, bounds: Rectangle) -> Frame<'_> {
        self.face.layout(&self.state, bounds)
    }

    fn on_timer(&mut self, token: TimerToken, now_ms: u64, commands: &mut Commands) {
        if self.armed != Some(token) {
            trace!("stale timer token {}", token.generation);
            return;
        }

        push(commands, RenderCommand::Invalidate);
        if self.timer_should_run() {
            push(
                commands,
                RenderCommand::ScheduleTick {
                    token,
                    delay_ms: time::next_tick_delay(now_ms, INTERACTIVE_UPDATE_RATE_MS),
                },
            );
        } else {
            self.armed = None;
        }
    }

    /// Restart the timer if it should run, stop it otherwise.
    fn update_timer(&mut self, commands: &mut Commands) {
        if self.timer_should_run() {
            let token = self.next_token();
            self.armed = Some(token);
            push(
                commands,
                RenderCommand::ScheduleTick { token, delay_ms: 0 },
            );
        } else {
            self.disarm(commands);
        }
    }

    fn disarm(&mut self, commands: &mut Commands) {
        // Revoke every outstanding token
        self.next_token();
        if self.armed.take().is_some() {
            push(commands, RenderCommand::CancelTick);
        }
    }

    fn next_token(&mut self) -> TimerToken {
        self.timer_generation = self.timer_generation.wrapping_add(1);
        TimerToken {
            generation: self.timer_generation,
        }
    }
}
