//! Analog input calibration
//!
//! The operator applies 0..11 V to the analog input one point at a time.
//! Each point can be fine-tuned with the knobs before it is captured, so a
//! precise voltmeter can make up for an imprecise source. The captured
//! table is validated and saved once all points are confirmed.
//!
//! ```text
//! Start --B2--> PowerReminder --B2--> CurrentPoint --B2--> Result
//!                    |                 |  K1/K2/refresh      |  B1: retry
//!                    B1 -> Start       B1 -> Abort           B2: next point,
//!                                                            AllDone or Error
//! ```

use eurocal_hal::{AnalogInput, DelayNs};

use super::{
    line, show, show_done, show_error, show_power_reminder, Board, Procedure, ProcedureError,
};
use crate::calibration::FineTune;
use crate::config::{save_input_calibration, InputCalibrationData, InputProcedureConfig, INPUT_POINTS};
use crate::state::{Action, Dispatch, MachineError, StateMachine};

/// Input calibration states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputStep {
    /// Waiting for the operator to begin
    Start,
    /// Asking the operator to check rack power
    PowerReminder,
    /// Live reading of the point being calibrated
    CurrentPoint,
    /// Captured reading, waiting for confirm or retry
    Result,
    /// All points saved
    AllDone,
    /// Captured data could not be validated or saved
    Error,
    /// Operator aborted the procedure
    Abort,
}

/// State shared by the input calibration handlers
pub struct InputContext<B: Board> {
    board: B,
    config: InputProcedureConfig,
    tune: FineTune,
    knobs: [u8; 2],
    points: [f32; INPUT_POINTS],
    readings: [u16; INPUT_POINTS],
    current_point: usize,
    current_reading: u16,
    error: Option<ProcedureError>,
    saved: Option<InputCalibrationData>,
    reset_requested: bool,
}

impl<B: Board> InputContext<B> {
    fn new(board: B, config: InputProcedureConfig) -> Self {
        Self {
            board,
            tune: FineTune::ZERO,
            knobs: [0; 2],
            points: config.targets,
            readings: [0; INPUT_POINTS],
            current_point: 0,
            current_reading: 0,
            error: None,
            saved: None,
            reset_requested: false,
            config,
        }
    }

    /// Discard all captured data
    fn clear(&mut self) {
        self.tune = FineTune::ZERO;
        self.points = self.config.targets;
        self.readings = [0; INPUT_POINTS];
        self.current_point = 0;
        self.current_reading = 0;
        self.error = None;
        self.saved = None;
        self.reset_requested = false;
    }

    /// Nominal voltage of the point being calibrated
    fn current_target(&self) -> f32 {
        self.points.get(self.current_point).copied().unwrap_or_default()
    }

    fn apply_tune(&mut self) {
        let index = self.current_point;
        if let (Some(point), Some(target)) =
            (self.points.get_mut(index), self.config.targets.get(index))
        {
            *point = self.tune.apply(*target);
        }
    }

    fn sample(&mut self) -> u16 {
        let samples = self.config.samples;
        self.board.adc().read_average(samples)
    }

    fn save(&mut self) -> Result<(), ProcedureError> {
        show(&mut self.board, "Saving values...", "", "");

        let mut data = InputCalibrationData::new(self.points, self.readings);
        data.model()?;
        save_input_calibration(self.board.storage(), &mut data)?;

        self.board.delay().delay_ms(self.config.save_hold_ms);
        self.saved = Some(data);
        Ok(())
    }
}

type Machine<B> = StateMachine<InputStep, Action, InputContext<B>>;

fn build_machine<B: Board>() -> Machine<B> {
    let mut machine: Machine<B> = StateMachine::new();

    machine
        .state(InputStep::Start)
        .when(Action::Button2)
        .run(init)
        .goto_and(InputStep::PowerReminder, show_reminder);

    machine
        .state(InputStep::PowerReminder)
        .when(Action::Button1)
        .goto_and(InputStep::Start, show_start)
        .when(Action::Button2)
        .goto_and(InputStep::CurrentPoint, show_point);

    machine
        .state(InputStep::CurrentPoint)
        .when(Action::Button1)
        .goto_and(InputStep::Abort, show_abort)
        .when(Action::Button2)
        .run(capture)
        .goto_and(InputStep::Result, show_result)
        .when(Action::Knob1)
        .run(adjust_tenths)
        .run(show_point)
        .when(Action::Knob2)
        .run(adjust_hundredths)
        .run(show_point)
        .when(Action::RefreshDisplay)
        .run(show_point);

    machine
        .state(InputStep::Result)
        .when(Action::Button1)
        .run(retry)
        .goto_and(InputStep::CurrentPoint, show_point)
        .when(Action::Button2)
        .run(next_point_or_save);

    for terminal in [InputStep::AllDone, InputStep::Error, InputStep::Abort] {
        machine
            .state(terminal)
            .when(Action::Button2)
            .run(request_reset);
    }

    machine.any_state().when(Action::Reset).run(request_reset);

    machine
}

// Handlers

fn init<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    ctx.clear();
    None
}

fn show_reminder<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    show_power_reminder(&mut ctx.board);
    None
}

fn show_start<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    show(&mut ctx.board, "Input", "calibration", "          B2:go");
    None
}

fn show_point<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    let live = ctx.sample();
    let target = line(format_args!("Apply {:.2} V", ctx.current_target()));
    let reading = line(format_args!("adc: {}", live));
    show(&mut ctx.board, &target, &reading, "Abort        OK");
    None
}

fn show_result<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    let result = line(format_args!(
        "{:.2}V = {}",
        ctx.current_target(),
        ctx.current_reading
    ));
    show(&mut ctx.board, &result, " ", "Retry   Confirm");
    None
}

fn show_abort<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    info!("Input calibration aborted at point {}", ctx.current_point);
    show(&mut ctx.board, "Aborted", " ", "B2 to restart");
    None
}

fn adjust_tenths<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    ctx.tune.set_tenths_from_knob(ctx.knobs[0]);
    ctx.apply_tune();
    None
}

fn adjust_hundredths<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    ctx.tune.set_hundredths(ctx.knobs[1]);
    ctx.apply_tune();
    None
}

fn capture<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    ctx.current_reading = ctx.sample();
    debug!(
        "Point {} captured reading {}",
        ctx.current_point,
        ctx.current_reading
    );
    None
}

fn retry<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    ctx.current_reading = 0;
    None
}

fn next_point_or_save<B: Board>(ctx: &mut InputContext<B>, action: Action) -> Option<InputStep> {
    if let Some(reading) = ctx.readings.get_mut(ctx.current_point) {
        *reading = ctx.current_reading;
    }
    ctx.current_point += 1;
    ctx.tune = FineTune::ZERO;

    if ctx.current_point < INPUT_POINTS {
        show_point(ctx, action);
        return Some(InputStep::CurrentPoint);
    }

    match ctx.save() {
        Ok(()) => {
            info!("Input calibration saved");
            show_done(&mut ctx.board);
            Some(InputStep::AllDone)
        }
        Err(e) => {
            warn!("Input calibration failed: {:?}", e);
            show_error(&mut ctx.board, &e);
            ctx.error = Some(e);
            Some(InputStep::Error)
        }
    }
}

fn request_reset<B: Board>(ctx: &mut InputContext<B>, _: Action) -> Option<InputStep> {
    ctx.reset_requested = true;
    None
}

/// Analog input calibration procedure
pub struct InputProcedure<B: Board> {
    machine: Machine<B>,
    ctx: InputContext<B>,
}

impl<B: Board> InputProcedure<B> {
    /// Create the procedure with the default settings
    pub fn new(board: B) -> Self {
        Self::with_config(board, InputProcedureConfig::default())
    }

    /// Create the procedure with custom settings
    pub fn with_config(board: B, config: InputProcedureConfig) -> Self {
        Self {
            machine: build_machine(),
            ctx: InputContext::new(board, config),
        }
    }

    /// The hardware the procedure runs on
    pub fn board(&self) -> &B {
        &self.ctx.board
    }

    /// Mutable access to the hardware
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.ctx.board
    }

    /// Index of the point being calibrated
    pub fn current_point(&self) -> usize {
        self.ctx.current_point
    }

    /// Nominal voltages, including any fine-tuning so far
    pub fn points(&self) -> &[f32; INPUT_POINTS] {
        &self.ctx.points
    }

    /// Readings confirmed so far
    pub fn readings(&self) -> &[u16] {
        &self.ctx.readings[..self.ctx.current_point.min(INPUT_POINTS)]
    }

    /// Record written to flash when the procedure completed
    pub fn saved(&self) -> Option<&InputCalibrationData> {
        self.ctx.saved.as_ref()
    }

    /// Error that ended the procedure
    pub fn error(&self) -> Option<ProcedureError> {
        self.ctx.error
    }

    fn restart(&mut self) {
        info!("Restarting input calibration");
        self.ctx.clear();
        self.ctx.board.reinitialize();
        if let Err(e) = self.start() {
            error!("Failed to restart input calibration: {:?}", e);
        }
    }
}

impl<B: Board> Procedure for InputProcedure<B> {
    type Step = InputStep;

    fn start(&mut self) -> Result<(), MachineError> {
        self.machine.start(InputStep::PowerReminder)?;
        show_power_reminder(&mut self.ctx.board);
        Ok(())
    }

    fn do_action(&mut self, action: Action) {
        self.machine.do_action(action);
    }

    fn execute(&mut self) -> Dispatch<InputStep, Action> {
        let dispatch = self.machine.execute(&mut self.ctx);
        if let Dispatch::Moved { action, from, to } = dispatch {
            debug!("Input {:?} --{:?}--> {:?}", from, action, to);
        }
        if self.ctx.reset_requested {
            self.restart();
        }
        dispatch
    }

    fn step(&self) -> Option<InputStep> {
        self.machine.state_id()
    }

    fn wants_refresh(&self) -> bool {
        self.machine.in_state(InputStep::CurrentPoint)
    }

    fn update_knobs(&mut self, knobs: [u8; 2]) {
        self.ctx.knobs = knobs;
    }
}
