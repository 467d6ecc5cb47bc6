//! DAC output calibration
//!
//! Fully automatic once the operator has patched an output into the analog
//! input: the search raises the DAC code until the input, read through the
//! stored input calibration, sees each whole voltage from 1 to 10 V.
//! Outputs are calibrated one at a time in front panel order and the codes
//! are saved once every output is done.

use eurocal_hal::{AnalogInput, DacChannel, DacError, DacOutput, DelayNs, MAX_DAC_CODE};

use super::{line, show, show_done, show_error, show_power_reminder, Board, Procedure, ProcedureError};
use crate::calibration::{
    converge, CalibrationError, InputCalibration, Probe, SearchConfig, SearchProgress, DAC_POINTS,
};
use crate::config::{
    load_input_calibration, save_output_calibration, OutputCalibrationData, OutputJack,
    OutputProcedureConfig,
};
use crate::state::{Action, Dispatch, MachineError, StateMachine};

/// Output calibration states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputStep {
    /// Start menu
    Start,
    /// Waiting for the operator to patch the next output
    Connect,
    /// One output calibrated
    ChannelDone,
    /// All outputs saved
    AllDone,
    /// Search, input calibration or save failed
    Error,
}

/// State shared by the output calibration handlers
pub struct OutputContext<B: Board> {
    board: B,
    config: OutputProcedureConfig,
    model: Option<InputCalibration>,
    data: OutputCalibrationData,
    jack: usize,
    error: Option<ProcedureError>,
    reset_requested: bool,
}

impl<B: Board> OutputContext<B> {
    fn new(board: B, config: OutputProcedureConfig) -> Self {
        let mut ctx = Self {
            board,
            config,
            model: None,
            data: OutputCalibrationData::default(),
            jack: 0,
            error: None,
            reset_requested: false,
        };
        ctx.load_model();
        ctx
    }

    /// Build the input model the search measures with
    fn load_model(&mut self) {
        let input = load_input_calibration(self.board.storage());
        match input.model() {
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
        self.data = OutputCalibrationData::default();
        self.jack = 0;
        self.reset_requested = false;
        self.load_model();
    }

    fn current_jack(&self) -> Option<OutputJack> {
        self.config.jacks.get(self.jack).copied()
    }

    fn fail(&mut self, error: ProcedureError) -> Option<OutputStep> {
        warn!("Output calibration failed: {:?}", error);
        show_error(&mut self.board, &error);
        self.error = Some(error);
        Some(OutputStep::Error)
    }

    /// Search the codes for one output and store them
    fn calibrate(&mut self, jack: OutputJack) -> Result<(), ProcedureError> {
        let Some(model) = self.model.as_ref() else {
            return Err(CalibrationError::IncompleteCalibration.into());
        };
        let channel = jack.channel;
        let samples = self.config.samples;
        let search = SearchConfig {
            tolerance: self.config.tolerance,
            max_code: MAX_DAC_CODE,
        };

        show(&mut self.board, "Calibrating", "0 V (DAC)", "please wait...");
        self.board.dac().set_code(channel, 0)?;
        self.board.delay().delay_ms(self.config.initial_settle_ms);
        let mut reading = self.board.adc().read_average(samples);

        let mut codes = [0u16; DAC_POINTS];
        let mut code = 0;
        for (volts, slot) in codes.iter_mut().enumerate().skip(1) {
            let expected = model.inverse(volts as f32);
            let mut probe = ChannelProbe {
                board: &mut self.board,
                model,
                channel,
                volts: volts as u8,
                samples,
                settle_ms: self.config.settle_ms,
            };
            let found = converge(&mut probe, &search, code, reading, expected)?;
            debug!(
                "DAC {} reached {} V at code {} after {} steps",
                channel.index(),
                volts,
                found.code,
                found.steps
            );
            code = found.code;
            reading = found.reading;
            *slot = code;

            let title = line(format_args!("Cal {}V (DAC {})", volts, channel.index()));
            let result = line(format_args!("dac = {}", code));
            let measured = line(format_args!("ain: {:.2} V", model.forward(reading)));
            show(&mut self.board, &title, &result, &measured);
            self.board.delay().delay_ms(self.config.result_hold_ms);
        }

        self.data.set_channel(channel, codes);
        self.board.dac().set_code(channel, 0)?;
        info!("Output {} (DAC {}) calibrated", jack.jack, channel.index());
        Ok(())
    }
}

/// DAC channel looped back into the analog input
struct ChannelProbe<'a, B: Board> {
    board: &'a mut B,
    model: &'a InputCalibration,
    channel: DacChannel,
    volts: u8,
    samples: u16,
    settle_ms: u32,
}

impl<B: Board> Probe for ChannelProbe<'_, B> {
    fn apply(&mut self, code: u16) -> Result<(), DacError> {
        self.board.dac().set_code(self.channel, code)?;
        self.board.delay().delay_ms(self.settle_ms);
        Ok(())
    }

    fn sample(&mut self) -> u16 {
        self.board.adc().read_average(self.samples)
    }

    fn observe(&mut self, progress: &SearchProgress) {
        let permille = progress.permille();
        let title = line(format_args!("Cal {}V (DAC {})", self.volts, self.channel.index()));
        let status = line(format_args!(
            "{} {}.{}%",
            progress.code,
            permille / 10,
            permille % 10
        ));
        let measured = line(format_args!(
            "ain: {:.2} V",
            self.model.forward(progress.reading)
        ));
        show(&mut *self.board, &title, &status, &measured);
    }
}

type Machine<B> = StateMachine<OutputStep, Action, OutputContext<B>>;

fn build_machine<B: Board>() -> Machine<B> {
    let mut machine: Machine<B> = StateMachine::new();

    machine
        .state(OutputStep::Start)
        .when(Action::Button1)
        .run(show_reminder)
        .when(Action::Button2)
        .goto_and(OutputStep::Connect, show_connect);

    machine
        .state(OutputStep::Connect)
        .when(Action::Button2)
        .run(calibrate_channel)
        .goto(OutputStep::ChannelDone);

    machine
        .state(OutputStep::ChannelDone)
        .when(Action::Button2)
        .run(next_channel_or_save);

    for terminal in [OutputStep::AllDone, OutputStep::Error] {
        machine
            .state(terminal)
            .when(Action::Button2)
            .run(request_reset);
    }

    machine.any_state().when(Action::Reset).run(request_reset);

    machine
}

// Handlers

fn show_start_menu<B: Board>(board: &mut B) {
    show(board, "DAC", "calibration", "          B2:go");
}

fn show_reminder<B: Board>(ctx: &mut OutputContext<B>, _: Action) -> Option<OutputStep> {
    show_power_reminder(&mut ctx.board);
    None
}

fn show_connect<B: Board>(ctx: &mut OutputContext<B>, _: Action) -> Option<OutputStep> {
    if let Some(jack) = ctx.current_jack() {
        let prompt = line(format_args!("Plug out {} into", jack.jack));
        show(&mut ctx.board, &prompt, "analogue in.", "             OK");
    }
    None
}

fn calibrate_channel<B: Board>(ctx: &mut OutputContext<B>, _: Action) -> Option<OutputStep> {
    let jack = ctx.current_jack()?;
    match ctx.calibrate(jack) {
        Ok(()) => {
            let title = line(format_args!("DAC ch.{} OK", jack.channel.index()));
            show(&mut ctx.board, &title, "", "        B2:next");
            None
        }
        Err(e) => {
            if let Err(dac_error) = ctx.board.dac().set_code(jack.channel, 0) {
                warn!("Failed to return DAC to 0: {:?}", dac_error);
            }
            ctx.fail(e)
        }
    }
}

fn next_channel_or_save<B: Board>(ctx: &mut OutputContext<B>, action: Action) -> Option<OutputStep> {
    ctx.jack += 1;
    if ctx.jack < ctx.config.jacks.len() {
        show_connect(ctx, action);
        return Some(OutputStep::Connect);
    }

    show(&mut ctx.board, "Saving values...", "", "");
    match save_output_calibration(ctx.board.storage(), &mut ctx.data) {
        Ok(()) => {
            show_done(&mut ctx.board);
            Some(OutputStep::AllDone)
        }
        Err(e) => ctx.fail(e.into()),
    }
}

fn request_reset<B: Board>(ctx: &mut OutputContext<B>, _: Action) -> Option<OutputStep> {
    ctx.reset_requested = true;
    None
}

/// DAC output calibration procedure
pub struct OutputProcedure<B: Board> {
    machine: Machine<B>,
    ctx: OutputContext<B>,
}

impl<B: Board> OutputProcedure<B> {
    /// Create the procedure with the default settings
    ///
    /// Loads the input calibration from the board's storage.
    pub fn new(board: B) -> Self {
        Self::with_config(board, OutputProcedureConfig::default())
    }

    /// Create the procedure with custom settings
    pub fn with_config(board: B, config: OutputProcedureConfig) -> Self {
        Self {
            machine: build_machine(),
            ctx: OutputContext::new(board, config),
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

    /// Hand the hardware back, e.g. to start another procedure
    pub fn into_board(self) -> B {
        self.ctx.board
    }

    /// Codes found so far; complete once the procedure is done
    pub fn data(&self) -> &OutputCalibrationData {
        &self.ctx.data
    }

    /// Jack being calibrated, `None` once every jack is done
    pub fn current_jack(&self) -> Option<OutputJack> {
        self.ctx.current_jack()
    }

    /// Error that ended the procedure
    pub fn error(&self) -> Option<ProcedureError> {
        self.ctx.error
    }

    fn restart(&mut self) {
        info!("Restarting output calibration");
        self.ctx.board.reinitialize();
        self.ctx.clear();
        if let Err(e) = self.start() {
            error!("Failed to restart output calibration: {:?}", e);
        }
    }
}

impl<B: Board> Procedure for OutputProcedure<B> {
    type Step = OutputStep;

    fn start(&mut self) -> Result<(), MachineError> {
        if let Some(error) = self.ctx.error {
            self.machine.start(OutputStep::Error)?;
            show_error(&mut self.ctx.board, &error);
            return Ok(());
        }
        self.machine.start(OutputStep::Start)?;
        show_start_menu(&mut self.ctx.board);
        Ok(())
    }

    fn do_action(&mut self, action: Action) {
        self.machine.do_action(action);
    }

    fn execute(&mut self) -> Dispatch<OutputStep, Action> {
        let dispatch = self.machine.execute(&mut self.ctx);
        if let Dispatch::Moved { action, from, to } = dispatch {
            debug!("Output {:?} --{:?}--> {:?}", from, action, to);
        }
        if self.ctx.reset_requested {
            self.restart();
        }
        dispatch
    }

    fn step(&self) -> Option<OutputStep> {
        self.machine.state_id()
    }
}
