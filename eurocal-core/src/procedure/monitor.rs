//! Live analog input monitor
//!
//! Shows the input voltage through the stored input calibration next to the
//! raw reading, plus the lowest and highest voltage seen since the range
//! was last cleared with B1.

use eurocal_hal::AnalogInput;

use super::{line, show, show_error, Board, Procedure, ProcedureError};
use crate::calibration::InputCalibration;
use crate::config::{load_input_calibration, MonitorConfig};
use crate::state::{Action, Dispatch, MachineError, StateMachine};

/// Input monitor states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorStep {
    /// Live reading
    Monitoring,
    /// Stored input calibration is unusable
    Error,
}

/// Lowest and highest voltage seen
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VoltageRange {
    pub min: f32,
    pub max: f32,
}

impl VoltageRange {
    fn new(volts: f32) -> Self {
        Self {
            min: volts,
            max: volts,
        }
    }

    fn include(&mut self, volts: f32) {
        self.min = self.min.min(volts);
        self.max = self.max.max(volts);
    }
}

/// State shared by the monitor handlers
pub struct MonitorContext<B: Board> {
    board: B,
    config: MonitorConfig,
    model: Option<InputCalibration>,
    reading: u16,
    volts: f32,
    range: Option<VoltageRange>,
    error: Option<ProcedureError>,
    reset_requested: bool,
}

impl<B: Board> MonitorContext<B> {
    fn new(board: B, config: MonitorConfig) -> Self {
        let mut ctx = Self {
            board,
            config,
            model: None,
            reading: 0,
            volts: 0.0,
            range: None,
            error: None,
            reset_requested: false,
        };
        ctx.load_model();
        ctx
    }

    fn load_model(&mut self) {
        match load_input_calibration(self.board.storage()).model() {
            Ok(model) => {
                self.model = Some(model);
                self.error = None;
            }
            Err(e) => {
                warn!("Stored input calibration is unusable: {:?}", e);
                self.model = None;
                self.error = Some(e.into());
            }
        }
    }

    fn clear(&mut self) {
        self.reading = 0;
        self.volts = 0.0;
        self.range = None;
        self.reset_requested = false;
        self.load_model();
    }

    /// Take a reading and widen the range to include it
    fn measure(&mut self) {
        let reading = self.board.adc().read_average(self.config.samples);
        let Some(model) = self.model.as_ref() else {
            return;
        };
        let volts = model.forward(reading);
        self.reading = reading;
        self.volts = volts;
        match self.range.as_mut() {
            Some(range) => range.include(volts),
            None => self.range = Some(VoltageRange::new(volts)),
        }
    }

    fn show_reading(&mut self) {
        let current = line(format_args!("{:.2}V   {}", self.volts, self.reading));
        let range = self.range.unwrap_or(VoltageRange::new(self.volts));
        let extremes = line(format_args!("{:.2}  {:.2}", range.min, range.max));
        show(&mut self.board, &current, &extremes, "B1:reset");
    }
}

type Machine<B> = StateMachine<MonitorStep, Action, MonitorContext<B>>;

fn build_machine<B: Board>() -> Machine<B> {
    let mut machine: Machine<B> = StateMachine::new();

    machine
        .state(MonitorStep::Monitoring)
        .when(Action::RefreshDisplay)
        .run(refresh)
        .when(Action::Button1)
        .run(reset_range);

    machine
        .state(MonitorStep::Error)
        .when(Action::Button2)
        .run(request_reset);

    machine.any_state().when(Action::Reset).run(request_reset);

    machine
}

// Handlers

fn refresh<B: Board>(ctx: &mut MonitorContext<B>, _: Action) -> Option<MonitorStep> {
    ctx.measure();
    ctx.show_reading();
    None
}

fn reset_range<B: Board>(ctx: &mut MonitorContext<B>, action: Action) -> Option<MonitorStep> {
    debug!("Monitor range cleared");
    ctx.range = None;
    refresh(ctx, action)
}

fn request_reset<B: Board>(ctx: &mut MonitorContext<B>, _: Action) -> Option<MonitorStep> {
    ctx.reset_requested = true;
    None
}

/// Live analog input monitor
pub struct MonitorProcedure<B: Board> {
    machine: Machine<B>,
    ctx: MonitorContext<B>,
}

impl<B: Board> MonitorProcedure<B> {
    /// Create the monitor with the default settings
    ///
    /// Loads the input calibration from the board's storage.
    pub fn new(board: B) -> Self {
        Self::with_config(board, MonitorConfig::default())
    }

    /// Create the monitor with custom settings
    pub fn with_config(board: B, config: MonitorConfig) -> Self {
        Self {
            machine: build_machine(),
            ctx: MonitorContext::new(board, config),
        }
    }

    pub fn board(&self) -> &B {
        &self.ctx.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.ctx.board
    }

    /// Hand the hardware back, e.g. to start another procedure
    pub fn into_board(self) -> B {
        self.ctx.board
    }

    /// Last calibrated voltage
    pub fn volts(&self) -> f32 {
        self.ctx.volts
    }

    /// Last raw reading
    pub fn reading(&self) -> u16 {
        self.ctx.reading
    }

    /// Range seen since the last clear, `None` before the first reading
    pub fn range(&self) -> Option<VoltageRange> {
        self.ctx.range
    }

    pub fn error(&self) -> Option<ProcedureError> {
        self.ctx.error
    }

    fn restart(&mut self) {
        info!("Restarting input monitor");
        self.ctx.board.reinitialize();
        self.ctx.clear();
        if let Err(e) = self.start() {
            error!("Failed to restart input monitor: {:?}", e);
        }
    }
}

impl<B: Board> Procedure for MonitorProcedure<B> {
    type Step = MonitorStep;

    fn start(&mut self) -> Result<(), MachineError> {
        if let Some(error) = self.ctx.error {
            self.machine.start(MonitorStep::Error)?;
            show_error(&mut self.ctx.board, &error);
            return Ok(());
        }
        self.machine.start(MonitorStep::Monitoring)?;
        self.ctx.measure();
        self.ctx.show_reading();
        Ok(())
    }

    fn do_action(&mut self, action: Action) {
        self.machine.do_action(action);
    }

    fn execute(&mut self) -> Dispatch<MonitorStep, Action> {
        let dispatch = self.machine.execute(&mut self.ctx);
        if self.ctx.reset_requested {
            self.restart();
        }
        dispatch
    }

    fn step(&self) -> Option<MonitorStep> {
        self.machine.state_id()
    }

    fn wants_refresh(&self) -> bool {
        self.step() == Some(MonitorStep::Monitoring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_widens() {
        let mut range = VoltageRange::new(2.0);
        range.include(3.5);
        range.include(1.25);
        range.include(2.0);
        assert_eq!(range, VoltageRange { min: 1.25, max: 3.5 });
    }
}
