//! A simulated coprocessor bus for tests.
use std::{cell::Cell, collections::VecDeque, convert::Infallible};

use embedded_hal::spi::ErrorKind;
use wifi_spi_proto::{FrameDescriptor, START_TOKEN};

use crate::{
    bus::Bus,
    hal::{Clock, Completion, IrqLine, PinControl, Transport},
    Driver, Settings,
};

/// A transport that records everything written and answers reads from a
/// script.
#[derive(Debug)]
pub(crate) struct SimTransport {
    /// Every write, one entry per `send_bytes` call.
    pub(crate) sent: Vec<Vec<u8>>,
    /// Bytes returned by reads, in order.
    pub(crate) rx: VecDeque<u8>,
    /// Cycled through once `rx` runs dry.
    pub(crate) repeat: Vec<u8>,
    repeat_pos: usize,
    /// Returned once `rx` runs dry and nothing repeats.
    pub(crate) idle: u8,
    /// Fails the next transfer with this error.
    pub(crate) fail_next: Option<ErrorKind>,
    /// Makes `start_send` leave its transfer pending.
    pub(crate) defer_sends: bool,
    /// Buffers passed to `start_send` while `defer_sends` is set.
    pub(crate) started: Vec<Vec<u8>>,
    pub(crate) selected: Option<u8>,
}

/// A tick counter that advances by a fixed step every time it is read.
#[derive(Debug)]
pub(crate) struct SimClock {
    now: Cell<u32>,
    step: u32,
}

#[derive(Debug, Default)]
pub(crate) struct SimIrq {
    pub(crate) enabled: usize,
    pub(crate) disabled: usize,
    pub(crate) cleared: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum PinEvent {
    Power(bool),
    Reset(bool),
}

#[derive(Debug, Default)]
pub(crate) struct SimPins {
    pub(crate) events: Vec<PinEvent>,
}

pub(crate) fn trace_init() {
    use tracing_subscriber::{
        filter::{EnvFilter, LevelFilter},
        prelude::*,
    };
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let filter = if env.is_empty() {
        builder.parse("wifi_spi=trace").unwrap()
    } else {
        builder.parse_lossy(env)
    };

    let _res = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .finish()
        .try_init();
}

pub(crate) fn bus(settings: Settings) -> Bus<SimTransport, SimClock> {
    trace_init();
    Bus::new(SimTransport::default(), SimClock::new(), &settings)
}

pub(crate) fn driver(settings: Settings) -> Driver<SimTransport, SimClock, SimIrq> {
    trace_init();
    let driver = Driver::new(
        SimTransport::default(),
        SimClock::new(),
        SimIrq::default(),
        &settings,
    )
    .unwrap();
    assert_eq!(driver.bus().transport().selected, Some(settings.slave));
    driver
}

/// Scripts the device's side of one status register read.
pub(crate) fn script_register_read(
    driver: &mut Driver<SimTransport, SimClock, SimIrq>,
    status: u8,
) {
    driver
        .bus_mut()
        .transport_mut()
        .respond(&[0x58, START_TOKEN, status]);
}

/// Scripts the device's side of reading one frame: the descriptor, then
/// `body` if it is not empty.
pub(crate) fn script_frame(
    driver: &mut Driver<SimTransport, SimClock, SimIrq>,
    desc: &FrameDescriptor,
    body: &[u8],
) {
    let transport = driver.bus_mut().transport_mut();
    transport.respond(&[0x58, START_TOKEN]);
    transport.respond(desc.as_bytes());
    if !body.is_empty() {
        transport.respond(&[0x58, START_TOKEN]);
        transport.respond(body);
    }
}

// === impl SimTransport ===

impl SimTransport {
    pub(crate) fn respond(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    fn next_byte(&mut self) -> u8 {
        if let Some(byte) = self.rx.pop_front() {
            return byte;
        }
        if self.repeat.is_empty() {
            return self.idle;
        }
        let byte = self.repeat[self.repeat_pos % self.repeat.len()];
        self.repeat_pos += 1;
        byte
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            rx: VecDeque::new(),
            repeat: Vec::new(),
            repeat_pos: 0,
            idle: 0x58,
            fail_next: None,
            defer_sends: false,
            started: Vec::new(),
            selected: None,
        }
    }
}

impl Transport for SimTransport {
    type Error = ErrorKind;

    fn send_bytes(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }
        self.sent.push(buf.to_vec());
        Ok(())
    }

    fn recv_bytes(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }
        for byte in buf {
            *byte = self.next_byte();
        }
        Ok(())
    }

    fn set_slave_select(&mut self, which: Option<u8>) -> Result<(), Self::Error> {
        self.selected = which;
        Ok(())
    }

    fn start_send(&mut self, buf: &[u8]) -> Result<Completion, Self::Error> {
        if !self.defer_sends {
            self.send_bytes(buf)?;
            return Ok(Completion::Done);
        }
        self.started.push(buf.to_vec());
        Ok(Completion::Pending)
    }
}

// === impl SimClock ===

impl SimClock {
    pub(crate) const TICKS_PER_SECOND: u32 = 1_000;

    /// A clock that advances one tick per reading.
    pub(crate) fn new() -> Self {
        Self {
            now: Cell::new(0),
            step: 1,
        }
    }

    /// A clock that only moves when advanced.
    pub(crate) fn manual(start: u32) -> Self {
        Self {
            now: Cell::new(start),
            step: 0,
        }
    }

    pub(crate) fn advance(&self, ticks: u32) {
        self.now.set(self.now.get().wrapping_add(ticks));
    }

    /// Reads the clock without advancing it.
    pub(crate) fn peek(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for SimClock {
    fn now_ticks(&self) -> u32 {
        let now = self.now.get();
        self.advance(self.step);
        now
    }

    fn ticks_per_second(&self) -> u32 {
        Self::TICKS_PER_SECOND
    }
}

// === impl SimIrq ===

impl SimIrq {
    /// True if every `disable` was matched by an `enable`.
    pub(crate) fn enabled_now(&self) -> bool {
        self.enabled == self.disabled
    }
}

impl IrqLine for SimIrq {
    fn enable(&mut self) {
        self.enabled += 1;
    }

    fn disable(&mut self) {
        self.disabled += 1;
    }

    fn clear_pending(&mut self) {
        self.cleared += 1;
    }
}

// === impl SimPins ===

impl PinControl for SimPins {
    type Error = Infallible;

    fn set_reset(&mut self, asserted: bool) -> Result<(), Self::Error> {
        self.events.push(PinEvent::Reset(asserted));
        Ok(())
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        self.events.push(PinEvent::Power(on));
        Ok(())
    }
}
