//! Calibrated voltage generator
//!
//! Drives every output to the voltage set on the knobs, through each
//! channel's stored DAC calibration. Knob 1 sets whole volts and knob 2 the
//! hundredths, so 0.00 to 9.99 V can be dialled in. The analog input is
//! read back on the same screen to check an output with a patch cable.

use eurocal_hal::{AnalogInput, DacChannel, DacOutput, DAC_CHANNELS};

use super::{line, show, show_error, Board, Procedure, ProcedureError};
use crate::calibration::{CalibrationError, DacCalibration, InputCalibration};
use crate::config::{
    load_input_calibration, load_output_calibration, GeneratorConfig, OutputCalibrationData,
    OUTPUT_JACKS,
};
use crate::state::{Action, Dispatch, MachineError, StateMachine};

/// Voltage generator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeneratorStep {
    /// Outputs follow the knobs
    Generating,
    /// Stored output calibration is unusable or a DAC write failed
    Error,
}

/// Models for every channel, indexed by [`DacChannel::index`]
fn channel_models(
    data: &OutputCalibrationData,
) -> Result<[DacCalibration; DAC_CHANNELS], CalibrationError> {
    let mut models = [data.model(DacChannel::A)?; DAC_CHANNELS];
    for channel in DacChannel::ALL {
        models[channel.index()] = data.model(channel)?;
    }
    Ok(models)
}

/// State shared by the generator handlers
pub struct GeneratorContext<B: Board> {
    board: B,
    config: GeneratorConfig,
    models: Option<[DacCalibration; DAC_CHANNELS]>,
    input: Option<InputCalibration>,
    knobs: [u8; 2],
    volts: f32,
    error: Option<ProcedureError>,
    reset_requested: bool,
}

impl<B: Board> GeneratorContext<B> {
    fn new(board: B, config: GeneratorConfig) -> Self {
        let mut ctx = Self {
            board,
            config,
            models: None,
            input: None,
            knobs: [0; 2],
            volts: 0.0,
            error: None,
            reset_requested: false,
        };
        ctx.load_models();
        ctx
    }

    fn load_models(&mut self) {
        let output = load_output_calibration(self.board.storage());
        match channel_models(&output) {
            Ok(models) => {
                self.models = Some(models);
                self.error = None;
            }
            Err(e) => {
                warn!("Stored output calibration is unusable: {:?}", e);
                self.models = None;
                self.error = Some(e.into());
            }
        }

        // Only the readback needs it; without one the raw reading is shown
        self.input = load_input_calibration(self.board.storage()).model().ok();
    }

    fn clear(&mut self) {
        self.volts = 0.0;
        self.reset_requested = false;
        self.load_models();
    }

    /// Voltage set on the knobs
    fn requested_volts(&self) -> f32 {
        f32::from(self.knobs[0]) + f32::from(self.knobs[1]) / 100.0
    }

    /// Drive every output to the requested voltage
    fn apply(&mut self) -> Result<(), ProcedureError> {
        let Some(models) = self.models else {
            return Err(CalibrationError::IncompleteCalibration.into());
        };
        let volts = self.requested_volts();
        for channel in DacChannel::ALL {
            let code = models[channel.index()].code_for(volts);
            self.board.dac().set_code(channel, code)?;
        }
        self.volts = volts;
        Ok(())
    }

    fn show_output(&mut self) {
        let jack = OUTPUT_JACKS[0];
        let code = self
            .models
            .map(|models| models[jack.channel.index()].code_for(self.volts))
            .unwrap_or_default();
        let output = line(format_args!("{:.2}V out{}={}", self.volts, jack.jack, code));

        let reading = self.board.adc().read_average(self.config.samples);
        let input = match self.input.as_ref() {
            Some(model) => line(format_args!("Vin={:.2}V", model.forward(reading))),
            None => line(format_args!("Vin={}", reading)),
        };
        show(&mut self.board, &output, &input, "K1:V   K2:1/100");
    }

    fn fail(&mut self, error: ProcedureError) -> Option<GeneratorStep> {
        warn!("Voltage generator stopped: {:?}", error);
        show_error(&mut self.board, &error);
        self.error = Some(error);
        Some(GeneratorStep::Error)
    }
}

type Machine<B> = StateMachine<GeneratorStep, Action, GeneratorContext<B>>;

fn build_machine<B: Board>() -> Machine<B> {
    let mut machine: Machine<B> = StateMachine::new();

    machine
        .state(GeneratorStep::Generating)
        .when(Action::Knob1)
        .run(update_outputs)
        .when(Action::Knob2)
        .run(update_outputs)
        .when(Action::RefreshDisplay)
        .run(update_outputs);

    machine
        .state(GeneratorStep::Error)
        .when(Action::Button2)
        .run(request_reset);

    machine.any_state().when(Action::Reset).run(request_reset);

    machine
}

// Handlers

fn update_outputs<B: Board>(ctx: &mut GeneratorContext<B>, _: Action) -> Option<GeneratorStep> {
    if let Err(e) = ctx.apply() {
        return ctx.fail(e);
    }
    ctx.show_output();
    None
}

fn request_reset<B: Board>(ctx: &mut GeneratorContext<B>, _: Action) -> Option<GeneratorStep> {
    ctx.reset_requested = true;
    None
}

/// Calibrated voltage generator
pub struct GeneratorProcedure<B: Board> {
    machine: Machine<B>,
    ctx: GeneratorContext<B>,
}

impl<B: Board> GeneratorProcedure<B> {
    /// Create the generator with the default settings
    ///
    /// Loads the output and input calibrations from the board's storage.
    pub fn new(board: B) -> Self {
        Self::with_config(board, GeneratorConfig::default())
    }

    /// Create the generator with custom settings
    pub fn with_config(board: B, config: GeneratorConfig) -> Self {
        Self {
            machine: build_machine(),
            ctx: GeneratorContext::new(board, config),
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

    /// Voltage the outputs were last driven to
    pub fn volts(&self) -> f32 {
        self.ctx.volts
    }

    pub fn error(&self) -> Option<ProcedureError> {
        self.ctx.error
    }

    fn restart(&mut self) {
        info!("Restarting voltage generator");
        self.ctx.board.reinitialize();
        self.ctx.clear();
        if let Err(e) = self.start() {
            error!("Failed to restart voltage generator: {:?}", e);
        }
    }
}

impl<B: Board> Procedure for GeneratorProcedure<B> {
    type Step = GeneratorStep;

    fn start(&mut self) -> Result<(), MachineError> {
        if self.ctx.error.is_none() {
            if let Err(e) = self.ctx.apply() {
                warn!("Voltage generator failed to start: {:?}", e);
                self.ctx.error = Some(e);
            }
        }
        if let Some(error) = self.ctx.error {
            self.machine.start(GeneratorStep::Error)?;
            show_error(&mut self.ctx.board, &error);
            return Ok(());
        }
        self.machine.start(GeneratorStep::Generating)?;
        self.ctx.show_output();
        Ok(())
    }

    fn do_action(&mut self, action: Action) {
        self.machine.do_action(action);
    }

    fn execute(&mut self) -> Dispatch<GeneratorStep, Action> {
        let dispatch = self.machine.execute(&mut self.ctx);
        if let Dispatch::Moved { action, from, to } = dispatch {
            debug!("Generator {:?} --{:?}--> {:?}", from, action, to);
        }
        if self.ctx.reset_requested {
            self.restart();
        }
        dispatch
    }

    fn step(&self) -> Option<GeneratorStep> {
        self.machine.state_id()
    }

    fn wants_refresh(&self) -> bool {
        self.step() == Some(GeneratorStep::Generating)
    }

    fn update_knobs(&mut self, knobs: [u8; 2]) {
        self.ctx.knobs = knobs;
    }

    fn knob_resolutions(&self) -> Option<[u8; 2]> {
        Some([self.ctx.config.volts_resolution, self.ctx.config.hundredths_resolution])
    }
}
