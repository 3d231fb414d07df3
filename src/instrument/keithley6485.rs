//! Keithley 6485 picoammeter driver. Probably works for the 6487 too.
//!
//! Reference: Keithley 6485/6487 Instruction Manual
//!
//! Protocol overview:
//! - SCPI over RS-232, 9600 baud, 8N1, no flow control
//! - Terminator: CR (the front-panel TX Term factory default)
//! - Measurement query: `READ?`
//! - Responses: comma-separated, first field is the reading with a one
//!   character unit suffix, e.g. `-1.234567E-09A,+8.5,+0`
//!
//! On the instrument, press COMM and check that it is set to RS232 mode;
//! CONFIG > COMM reaches the baud/terminator settings if they were changed.

use crate::adapters::Transport;
use crate::config::InstrumentSettings;
use crate::error::{AppResult, PicologError};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Pause between empty read windows while waiting on a response.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Driver for a Keithley 6485 picoammeter on a [`Transport`].
///
/// The only way to obtain one is [`Keithley6485::initialize`], which runs the
/// full setup sequence, so a value of this type is always ready to serve
/// [`read_measurement`](Keithley6485::read_measurement); there is no
/// half-initialized state to misuse.
pub struct Keithley6485<T: Transport> {
    transport: T,
    line_terminator: String,
    terminator_byte: u8,
    sign_multiplier: f64,
    response_timeout: Duration,
}

impl<T: Transport> Keithley6485<T> {
    /// Reset and configure the meter for fixed-range current logging.
    ///
    /// Sends, in order: `*RST`, `*IDN?`, `SYST:ZCH ON`, `INIT`,
    /// `SYST:ZCOR OFF`, `CURR:RANG:AUTO OFF`, `CURR:RANG`, `CURR:NPLC`,
    /// `SYST:ZCH OFF`. Configuration commands are fire-and-forget; the
    /// identity response is read once and logged, whatever it says.
    pub async fn initialize(transport: T, settings: &InstrumentSettings) -> AppResult<Self> {
        let terminator_byte = settings.terminator.as_bytes().first().copied().unwrap_or(b'\r');
        let mut driver = Self {
            transport,
            line_terminator: settings.terminator.clone(),
            terminator_byte,
            sign_multiplier: settings.current_sign_multiplier,
            response_timeout: settings.response_timeout(),
        };

        driver.command("*RST").await?;
        driver.command("*IDN?").await?;
        let identity = driver.read_identity().await?;
        if identity.is_empty() {
            warn!("No identity response from the instrument");
        } else {
            info!("IDN: {identity}");
        }

        driver.command("SYST:ZCH ON").await?;
        driver.command("INIT").await?;
        driver.command("SYST:ZCOR OFF").await?;
        driver.command("CURR:RANG:AUTO OFF").await?;
        driver
            .command(&format!("CURR:RANG {:E}", settings.range_amps))
            .await?;
        driver
            .command(&format!("CURR:NPLC {:.1}", settings.averaging.nplc()))
            .await?;
        driver.command("SYST:ZCH OFF").await?;

        Ok(driver)
    }

    /// Request and decode one reading, in amps, sign multiplier applied.
    ///
    /// Transient failures come back as [`PicologError::Timeout`],
    /// [`PicologError::Malformed`] or [`PicologError::Transport`]; the caller
    /// is expected to drop the attempt and ask again on the next cycle.
    pub async fn read_measurement(&mut self) -> AppResult<f64> {
        let started = Instant::now();
        self.command("READ?").await?;
        let response = self.read_terminated().await?;
        let amps = decode_response(&response, self.sign_multiplier)?;
        debug!(
            "time to get reading: {:.3} sec",
            started.elapsed().as_secs_f64()
        );
        Ok(amps)
    }

    /// Fire-and-forget command with the configured terminator appended.
    async fn command(&mut self, command: &str) -> AppResult<()> {
        debug!("-> {command}");
        let mut bytes = command.as_bytes().to_vec();
        bytes.extend_from_slice(self.line_terminator.as_bytes());
        self.transport.write(bytes).await?;
        Ok(())
    }

    /// Accumulate read windows until a window carries the terminator, or
    /// fail with `Timeout` once the maximum wait elapses.
    async fn read_terminated(&mut self) -> AppResult<String> {
        let started = Instant::now();
        let mut line: Vec<u8> = Vec::new();
        let mut chunk: Vec<u8> = Vec::new();
        loop {
            let n = self.transport.read_chunk(&mut chunk).await?;
            if n > 0 {
                line.extend_from_slice(&chunk);
                // The terminator has to land inside a single read window; one
                // split across windows reads as absent.
                if chunk.contains(&self.terminator_byte) {
                    return Ok(String::from_utf8_lossy(&line).into_owned());
                }
            } else {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            if started.elapsed() >= self.response_timeout {
                return Err(PicologError::Timeout {
                    waited: self.response_timeout,
                });
            }
        }
    }

    /// Lenient read for the identity query: returns whatever arrived within
    /// the wait window, terminated or not, possibly empty.
    async fn read_identity(&mut self) -> AppResult<String> {
        let started = Instant::now();
        let mut line: Vec<u8> = Vec::new();
        let mut chunk: Vec<u8> = Vec::new();
        while started.elapsed() < self.response_timeout {
            let n = self.transport.read_chunk(&mut chunk).await?;
            if n > 0 {
                line.extend_from_slice(&chunk);
                if chunk.contains(&self.terminator_byte) {
                    break;
                }
            } else if !line.is_empty() {
                break;
            } else {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
        Ok(String::from_utf8_lossy(&line).trim().to_string())
    }
}

/// Decode a terminated response line into amps.
///
/// The first comma-separated field carries the reading with a one-character
/// unit suffix that is stripped, not interpreted. The terminator is still in
/// the text: a response with no commas keeps it in this field, so only a
/// properly fielded line parses.
fn decode_response(response: &str, sign_multiplier: f64) -> AppResult<f64> {
    let malformed = || PicologError::Malformed {
        response: response.trim().to_string(),
    };
    let field = response.split(',').next().unwrap_or(response);
    let mut chars = field.chars();
    chars.next_back().ok_or_else(malformed)?;
    chars
        .as_str()
        .trim()
        .parse::<f64>()
        .map(|value| value * sign_multiplier)
        .map_err(|_| malformed())
}
