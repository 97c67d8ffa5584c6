//! Frame log replay
//!
//! Reads a JSON-lines frame log, slices it into fixed-length control cycles and
//! runs the car state translator once per cycle, the same way the live control
//! loop would.

use anyhow::{Context, Result};
use carstate::signals::{Buses, CanFrame, CanParser, SignalDatabase};
use carstate::{
    ActuatorRelay, CarParams, CarState, CarStateError, Channel, DiagnosticSnapshot, VehicleState,
    VolvoCarState,
};
use serde::Serialize;
use std::io::{BufRead, Write};

/// One output line
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleRecord<'a> {
    /// End of the cycle in log time
    pub timestamp_ns: u64,
    pub can_valid: bool,
    pub state: &'a VehicleState,
    pub diag: &'a DiagnosticSnapshot,
    pub actuator: &'a ActuatorRelay,
}

/// Counters reported at the end of a replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub cycles: usize,
    pub written: usize,
    /// Cycles where a required signal had not been received yet
    pub skipped: usize,
    /// Cycles with the temporary steering fault raised
    pub fault_cycles: usize,
}

/// Parsers and translator for one replay
pub struct Replay {
    pt: CanParser,
    radar: CanParser,
    cam: CanParser,
    car: VolvoCarState,
    cycle_ns: u64,
    require_can_valid: bool,
}

impl Replay {
    pub fn new(db: &SignalDatabase, params: CarParams, cycle_ms: u64, require_can_valid: bool) -> Result<Self> {
        let cycle_ns = cycle_ms
            .checked_mul(1_000_000)
            .with_context(|| format!("Cycle length of {} ms is out of range", cycle_ms))?;

        let pt = CanParser::new(Channel::Powertrain, db, &params.messages.powertrain)
            .context("Failed to build powertrain parser")?;
        let radar = CanParser::new(Channel::Radar, db, &params.messages.radar)
            .context("Failed to build radar parser")?;
        let cam = CanParser::new(Channel::Camera, db, &params.messages.camera)
            .context("Failed to build camera parser")?;

        Ok(Self {
            pt,
            radar,
            cam,
            car: VolvoCarState::new(params)?,
            cycle_ns,
            require_can_valid,
        })
    }

    /// Replay every frame from `input`, writing one JSON record per cycle
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        let mut pending: Vec<CanFrame> = Vec::new();
        let mut cycle_end: Option<u64> = None;

        for (line_no, line) in input.lines().enumerate() {
            let line = line.context("Failed to read frame log")?;
            if line.trim().is_empty() {
                continue;
            }

            let frame: CanFrame = serde_json::from_str(&line)
                .with_context(|| format!("Invalid frame on line {}", line_no + 1))?;
            summary.frames += 1;

            let end = match cycle_end {
                Some(end) => end,
                None => *cycle_end.insert(self.next_cycle_end(frame.timestamp_ns, line_no)?),
            };
            if frame.timestamp_ns >= end {
                // Close every cycle up to this frame, including empty ones
                let mut end = end;
                while frame.timestamp_ns >= end {
                    self.step(&pending, end, &mut output, &mut summary)?;
                    pending.clear();
                    end = self.next_cycle_end(end, line_no)?;
                }
                cycle_end = Some(end);
            }
            pending.push(frame);
        }

        if let Some(end) = cycle_end {
            self.step(&pending, end, &mut output, &mut summary)?;
        }

        output.flush()?;
        Ok(summary)
    }

    fn next_cycle_end(&self, from_ns: u64, line_no: usize) -> Result<u64> {
        from_ns
            .checked_add(self.cycle_ns)
            .with_context(|| format!("Timestamp overflow on line {}", line_no + 1))
    }

    fn step<W: Write>(
        &mut self,
        frames: &[CanFrame],
        end_ns: u64,
        output: &mut W,
        summary: &mut ReplaySummary,
    ) -> Result<()> {
        for parser in [&mut self.pt, &mut self.radar, &mut self.cam] {
            parser.update(frames);
            parser.advance_to(end_ns);
        }
        summary.cycles += 1;

        let can_valid = self.pt.can_valid() && self.cam.can_valid();
        let buses = Buses::new(&self.pt, &self.radar, &self.cam);

        let state = match self.car.update(&buses) {
            Ok(state) => state,
            Err(CarStateError::SignalUnavailable { channel, message, signal }) => {
                log::debug!("Cycle {} skipped, waiting for {}: {}.{}", summary.cycles, channel, message, signal);
                summary.skipped += 1;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if state.steer_fault_temporary {
            summary.fault_cycles += 1;
        }
        if !can_valid {
            log::warn!("CAN not valid at {} ns", end_ns);
            if self.require_can_valid {
                return Ok(());
            }
        }

        let record = CycleRecord {
            timestamp_ns: end_ns,
            can_valid,
            state: &state,
            diag: self.car.diag(),
            actuator: self.car.actuator_relay(),
        };
        serde_json::to_writer(&mut *output, &record)?;
        writeln!(output)?;
        summary.written += 1;
        Ok(())
    }
}
