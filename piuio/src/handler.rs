use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use strum::IntoEnumIterator;

use super::{
    compose_lights, Error, LightsMappings, LightsSource, Sensor, SensorSet, UsbBoard,
};

/// One report per logical button per scan iteration.
#[derive(Clone, Debug)]
pub struct InputEvent {
    /// Logical button `k` in `[0, 31]`, carried in bit `31-k` of the input
    /// words.
    pub button: u8,
    /// Whether any sensor reported the button this iteration.
    pub pressed: bool,
    /// Which sensors reported it. Empty when all four did: every non-pad
    /// button reports every sensor, so an all-four reading carries no
    /// attribution.
    pub sensors: SensorSet,
    pub timestamp: Instant,
}

/// Receives the scan loop's reports. Runs on the scan thread.
pub trait InputSink: Send {
    fn handle(&mut self, event: InputEvent);
}

impl InputSink for Sender<InputEvent> {
    fn handle(&mut self, event: InputEvent) {
        // the receiver may already be gone during shutdown
        let _ = self.send(event);
    }
}

/// Which USB path the scan loop drives. Picked once at startup.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, strum::Display)]
pub enum Transport {
    /// Four sequential write/read cycles per scan. The reference path.
    #[default]
    Synchronous,
    /// One bulk transfer carrying all four write/read pairs; needs kernel
    /// support for parallel asynchronous requests.
    BulkAsync,
}

// one handler per process; the board multiplexes everything already
static INITIALIZED: AtomicBool = AtomicBool::new(false);

const REPORT_INTERVAL: u32 = 5;

#[derive(Debug)]
pub struct PiuioBuilder {
    transport: Transport,
    mappings: LightsMappings,
    failure_limit: Option<u32>,
}

impl Default for PiuioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PiuioBuilder {
    pub fn new() -> Self {
        Self {
            transport: Transport::Synchronous,
            mappings: LightsMappings::default(),
            failure_limit: None,
        }
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn mappings(mut self, mappings: LightsMappings) -> Self {
        self.mappings = mappings;
        self
    }

    /// Stop scanning after this many consecutive failed transfers instead
    /// of retrying forever.
    pub fn failure_limit(mut self, limit: u32) -> Self {
        self.failure_limit = Some(limit);
        self
    }

    /// Claims the board and starts the scan thread.
    pub fn spawn(
        self,
        mut board: Box<dyn UsbBoard>,
        lights: Box<dyn LightsSource>,
        sink: Box<dyn InputSink>,
    ) -> Result<PiuioHandler, Error> {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            log::warn!("redundant PIUIO driver loaded, disabling");
            return Err(Error::RedundantInstance);
        }

        if let Err(err) = board.open() {
            log::warn!("could not establish a connection with PIUIO: {err}");
            INITIALIZED.store(false, Ordering::SeqCst);
            return Err(Error::BoardNotFound);
        }
        log::trace!("opened PIUIO board ({} transport)", self.transport);

        let shutdown = Arc::new(AtomicBool::new(false));
        let sensors = Arc::new(Mutex::new([0u32; 4]));
        let scanner = Scanner {
            board,
            lights,
            sink,
            transport: self.transport,
            mappings: self.mappings,
            failure_limit: self.failure_limit,
            shutdown: shutdown.clone(),
            sensors: sensors.clone(),
        };
        let thread = thread::Builder::new()
            .name("PIUIO thread".into())
            .spawn(move || scanner.run())
            .expect("spawn PIUIO thread");

        Ok(PiuioHandler {
            shutdown,
            sensors,
            thread: Some(thread),
        })
    }
}

/// Owning handle for the scan thread. Dropping it shuts the loop down and
/// extinguishes the lamps.
pub struct PiuioHandler {
    shutdown: Arc<AtomicBool>,
    sensors: Arc<Mutex<[u32; 4]>>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PiuioHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiuioHandler").finish_non_exhaustive()
    }
}

impl PiuioHandler {
    pub fn builder() -> PiuioBuilder {
        PiuioBuilder::new()
    }

    /// The raw input word most recently read for sensor set `set` (0..=3),
    /// active-high.
    pub fn sensor_set(&self, set: usize) -> Option<u32> {
        (set < 4).then(|| self.sensors.lock().unwrap()[set])
    }

    /// Stops the scan loop and joins the thread. The loop's final board
    /// write is an all-zero mask so the lamps go out deterministically.
    pub fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.shutdown.store(true, Ordering::SeqCst);
            log::trace!("shutting down PIUIO thread");
            let _ = thread.join();
            log::trace!("PIUIO thread shut down");
            INITIALIZED.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for PiuioHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Scanner {
    board: Box<dyn UsbBoard>,
    lights: Box<dyn LightsSource>,
    sink: Box<dyn InputSink>,
    transport: Transport,
    mappings: LightsMappings,
    failure_limit: Option<u32>,
    shutdown: Arc<AtomicBool>,
    sensors: Arc<Mutex<[u32; 4]>>,
}

impl Scanner {
    fn run(mut self) {
        let mut failures = 0u32;
        let mut iterations = 0u32;
        let mut window = Instant::now();

        while !self.shutdown.load(Ordering::SeqCst) {
            let lights = compose_lights(&self.lights.snapshot(), &self.mappings);

            let input = match self.scan(lights) {
                Ok(input) => {
                    failures = 0;
                    input
                }
                Err(err) => {
                    failures += 1;
                    log::warn!("PIUIO transfer failed ({failures} in a row): {err}");
                    if self.failure_limit.is_some_and(|limit| failures >= limit) {
                        log::warn!("giving up on PIUIO after {failures} consecutive failures");
                        break;
                    }
                    continue;
                }
            };

            *self.sensors.lock().unwrap() = input;
            self.dispatch(&input);

            iterations = iterations.wrapping_add(1);
            if iterations % REPORT_INTERVAL == 0 {
                log::debug!(
                    "{} scans in {:?}\n{}",
                    REPORT_INTERVAL,
                    window.elapsed(),
                    debug_line(&input, lights)
                );
                window = Instant::now();
            }
        }

        // lamps off before the device closes
        let _ = self.board.write(0);
        self.board.close();
    }

    fn scan(&mut self, lights: u32) -> Result<[u32; 4], Error> {
        match self.transport {
            Transport::Synchronous => self.scan_sync(lights),
            Transport::BulkAsync => self.scan_bulk(lights),
        }
    }

    fn scan_sync(&mut self, lights: u32) -> Result<[u32; 4], Error> {
        let mut input = [0u32; 4];
        for (phase, word) in input.iter_mut().enumerate() {
            let phase = phase as u32;
            // select which sensors to report from, then read that set
            self.board.write(lights | phase | (phase << 16))?;
            // the board opens high; invert for more logical processing
            *word = !self.board.read()?;
        }
        Ok(input)
    }

    fn scan_bulk(&mut self, lights: u32) -> Result<[u32; 4], Error> {
        // output words ride in slots 0, 2, 4 and 6; the transfer layer runs
        // the four write/read pairs at once and overwrites each output word
        // with the input word its selector asked for
        let mut bulk = [0u32; 8];
        for phase in 0..4u32 {
            bulk[phase as usize * 2] = lights | phase | (phase << 16);
        }
        self.board.bulk_read_write(&mut bulk)?;

        let mut input = [0u32; 4];
        for (phase, word) in input.iter_mut().enumerate() {
            *word = !bulk[phase * 2];
        }
        Ok(input)
    }

    fn dispatch(&mut self, input: &[u32; 4]) {
        let combined = input.iter().fold(0, |field, word| field | word);

        for button in 0..32u32 {
            let mask = 1u32 << (31 - button);

            let mut sensors = SensorSet::default();
            for (sensor, word) in Sensor::iter().zip(input) {
                if word & mask != 0 {
                    sensors.insert(sensor);
                }
            }
            // every non-pad button reports all four sensors at once, which
            // carries no attribution
            if sensors.len() == 4 {
                sensors.clear();
            }

            self.sink.handle(InputEvent {
                button: button as u8,
                pressed: combined & mask != 0,
                sensors,
                timestamp: Instant::now(),
            });
        }
    }
}

fn debug_line(input: &[u32; 4], output: u32) -> String {
    let mut line = "input:".to_owned();
    for word in input {
        line += &format!("\n\t{word:032b}");
    }
    line += &format!("\noutput:\n\t{output:032b}");
    line
}
