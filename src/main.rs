#![no_std]
#![no_main]

mod peripherals;
mod system;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Device
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pin, Pull},
    interrupt::{self, InterruptExt, Priority},
    peripherals::SPI2,
    spim,
};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel, signal::Signal};
use embassy_time::{with_timeout, Duration, Instant, Timer};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use peripherals::{backlight::Backlight, button::Button, display::Display};
use system::{
    bluetooth::{self, LinkCommand, LinkEvent, Server, UploadedAssets, LINK_CONTROL},
    config,
};

use sunshine_watchface::{
    config::ICON_FETCH_TIMEOUT_MS,
    engine::{Commands, Engine, LifecycleEvent, RenderCommand, TimerToken},
    icon::{load_icon, IconBitmap, IconError, IconRequest, IconTicket},
    sync::{asset::ASSET_CAPACITY, DataCache, SyncEvent},
    time::{self, TimeManager, TimeReference},
};

// Include current UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

/// Everything the face reacts to, apart from icon results and its timers.
pub enum HostEvent {
    Lifecycle(LifecycleEvent),
    ButtonPressed,
    ClockSet(TimeReference),
    Link(LinkEvent),
}

// Communication channels
pub static HOST_EVENTS: Channel<ThreadModeRawMutex, HostEvent, 8> = Channel::new();
static ICON_REQUEST: Signal<ThreadModeRawMutex, IconRequest> = Signal::new();
static ICON_RESULT: Signal<ThreadModeRawMutex, (IconTicket, Result<IconBitmap, IconError>)> =
    Signal::new();

/// Runtime around the engine: executes its commands on the hardware.
struct Face {
    engine: Engine,
    clock: TimeManager,
    cache: DataCache<{ config::DATA_CACHE_LEN }>,
    display: Display,
    backlight: Backlight,
    listening: bool,
    dirty: bool,
    tick: Option<(TimerToken, Instant)>,
    idle_deadline: Option<Instant>,
    ambient_deadline: Option<Instant>,
}

impl Face {
    fn lifecycle(&mut self, event: LifecycleEvent) {
        let commands = self.engine.on_lifecycle_event(event);
        self.execute(commands);
    }

    fn sync(&mut self, event: SyncEvent<'_>) {
        let commands = self.engine.on_sync_event(event);
        self.execute(commands);
    }

    fn execute(&mut self, commands: Commands) {
        for command in commands {
            match command {
                RenderCommand::Invalidate => self.dirty = true,
                RenderCommand::ScheduleTick { token, delay_ms } => {
                    self.tick = Some((token, Instant::now() + Duration::from_millis(delay_ms)));
                }
                RenderCommand::CancelTick => self.tick = None,
                RenderCommand::Connect => LINK_CONTROL.signal(LinkCommand::Open),
                RenderCommand::Disconnect => LINK_CONTROL.signal(LinkCommand::Close),
                RenderCommand::AddListener => self.listening = true,
                RenderCommand::RemoveListener => self.listening = false,
                RenderCommand::FetchSnapshot => {
                    let commands = self.engine.on_sync_event(SyncEvent::Snapshot(self.cache.items()));
                    self.execute(commands);
                }
                RenderCommand::FetchIcon(request) => ICON_REQUEST.signal(request),
            }
        }
    }

    fn on_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Lifecycle(event) => self.lifecycle(event),
            HostEvent::ButtonPressed => {
                if self.engine.state().ambient_mode {
                    self.set_ambient(false);
                } else {
                    self.idle_deadline = Some(Instant::now() + config::IDLE_TIMEOUT);
                }
            }
            HostEvent::ClockSet(reference) => {
                defmt::info!("clock synchronised");
                self.clock.set_time(reference);
                self.lifecycle(LifecycleEvent::TimeTick);
                if self.engine.state().ambient_mode {
                    self.ambient_deadline = Some(self.next_ambient_tick());
                }
            }
            HostEvent::Link(LinkEvent::Connected) => self.sync(SyncEvent::Connected),
            HostEvent::Link(LinkEvent::Suspended) => self.sync(SyncEvent::Suspended),
            HostEvent::Link(LinkEvent::Failed(code)) => self.sync(SyncEvent::ConnectionFailed(code)),
            HostEvent::Link(LinkEvent::Item(item)) => {
                if self.listening {
                    self.sync(SyncEvent::DataChanged(core::slice::from_ref(&item)));
                }
                if let Err(err) = self.cache.store(item) {
                    defmt::warn!("data item not cached: {}", err);
                }
            }
        }
    }

    fn set_ambient(&mut self, ambient: bool) {
        let level = if ambient {
            config::AMBIENT_BRIGHTNESS
        } else {
            config::INTERACTIVE_BRIGHTNESS
        };
        if let Err(err) = self.backlight.set(level) {
            defmt::warn!("backlight: {}", err);
        }

        self.lifecycle(LifecycleEvent::AmbientModeChanged(ambient));
        if ambient {
            self.idle_deadline = None;
            self.ambient_deadline = Some(self.next_ambient_tick());
        } else {
            self.idle_deadline = Some(Instant::now() + config::IDLE_TIMEOUT);
            self.ambient_deadline = None;
        }
    }

    /// Next full minute of the wall clock.
    fn next_ambient_tick(&self) -> Instant {
        let now_ms = self.clock.now_millis(Instant::now().as_millis());
        Instant::now() + Duration::from_millis(time::next_tick_delay(now_ms, config::AMBIENT_TICK_MS))
    }

    fn next_deadline(&self) -> Instant {
        [
            self.tick.map(|(_, at)| at),
            self.idle_deadline,
            self.ambient_deadline,
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(Instant::MAX)
    }

    fn on_deadline(&mut self) {
        let now = Instant::now();

        if let Some((token, at)) = self.tick {
            if at <= now {
                self.tick = None;
                let now_ms = self.clock.now_millis(now.as_millis());
                self.lifecycle(LifecycleEvent::TimerFired { token, now_ms });
            }
        }
        if self.idle_deadline.is_some_and(|at| at <= now) {
            self.set_ambient(true);
        }
        if self.ambient_deadline.is_some_and(|at| at <= now) {
            self.ambient_deadline = Some(self.next_ambient_tick());
            self.lifecycle(LifecycleEvent::TimeTick);
        }
    }

    fn redraw(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let now = self.clock.now(Instant::now().as_millis());
        let bounds = self.display.bounds();
        self.engine.update_time(now);
        let frame = self.engine.draw(bounds);
        if let Err(err) = self.display.render(&frame) {
            defmt::error!("display: {:?}", defmt::Debug2Format(&err));
        }
    }
}

/// Drives the face: one event at a time, redraw when something changed.
#[embassy_executor::task]
async fn run_face(mut face: Face) -> ! {
    face.lifecycle(LifecycleEvent::Create);
    face.lifecycle(LifecycleEvent::PropertiesChanged {
        low_bit_ambient: false,
    });
    let shape = face.display.shape();
    face.lifecycle(LifecycleEvent::WindowInsets(shape));
    face.lifecycle(LifecycleEvent::VisibilityChanged(true));
    face.set_ambient(false);
    face.redraw();

    loop {
        match select3(
            HOST_EVENTS.receive(),
            ICON_RESULT.wait(),
            Timer::at(face.next_deadline()),
        )
        .await
        {
            Either3::First(event) => face.on_host_event(event),
            Either3::Second((ticket, result)) => {
                let commands = face.engine.on_icon_fetched(ticket, result);
                face.execute(commands);
            }
            Either3::Third(()) => face.on_deadline(),
        }
        face.redraw();
    }
}

/// Runs icon fetches one after the other; a newer request simply overtakes
/// the result of an older one at the engine.
#[embassy_executor::task]
async fn fetch_icons() -> ! {
    static BUFFER: StaticCell<[u8; ASSET_CAPACITY]> = StaticCell::new();
    let buf = BUFFER.init([0; ASSET_CAPACITY]);
    let mut assets = UploadedAssets;

    loop {
        let request = ICON_REQUEST.wait().await;
        let timeout = Duration::from_millis(ICON_FETCH_TIMEOUT_MS);
        let result = with_timeout(timeout, load_icon(&mut assets, request.asset, &mut buf[..]))
            .await
            .unwrap_or(Err(IconError::Timeout));
        ICON_RESULT.signal((request.ticket, result));
    }
}

/// Polls the button every 10ms
#[embassy_executor::task]
async fn poll_button(mut button: Button) -> ! {
    loop {
        if button.pressed().await {
            HOST_EVENTS.send(HostEvent::ButtonPressed).await;
        }
        Timer::after(peripherals::button::POLL_INTERVAL).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(config::embassy_config());
    defmt::info!("Initializing");

    // Keep SPIM clear of the priorities reserved for the SoftDevice
    interrupt::SPIM2_SPIS2_SPI2.set_priority(Priority::P3);

    // Backlight stays off until the first frame is painted
    let backlight = unwrap!(Backlight::new(
        Output::new(p.P0_14.degrade(), Level::High, OutputDrive::Standard),
        Output::new(p.P0_22.degrade(), Level::High, OutputDrive::Standard),
        Output::new(p.P0_23.degrade(), Level::High, OutputDrive::Standard),
        0,
    ));

    let button = Button::new(
        Input::new(p.P0_13, Pull::None),
        Output::new(p.P0_15, Level::Low, OutputDrive::Standard),
    );

    let mut spim_config = spim::Config::default();
    // 8MHz is the fastest SPI clock of the nRF52832
    spim_config.frequency = spim::Frequency::M8;
    // The panel needs SPI mode 3
    spim_config.mode = spim::MODE_3;
    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    let display = unwrap!(Display::new(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
    ));

    // Bluetooth
    let sd = Softdevice::enable(&config::softdevice_config());
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;

    // The build time is the best guess until the phone sets the clock
    let reference = TimeReference::from_epoch(UTC_EPOCH, Instant::now().as_millis())
        .unwrap_or_default();

    let face = Face {
        engine: Engine::default(),
        clock: TimeManager::new(reference),
        cache: DataCache::new(),
        display,
        backlight,
        listening: false,
        dirty: false,
        tick: None,
        idle_deadline: None,
        ambient_deadline: None,
    };

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(bluetooth::softdevice_task(sd)));
    unwrap!(spawner.spawn(bluetooth::companion_link(sd, server)));
    unwrap!(spawner.spawn(fetch_icons()));
    unwrap!(spawner.spawn(poll_button(button)));
    unwrap!(spawner.spawn(run_face(face)));
}
