//! Control loop
//!
//! Polls the front panel and turns what changed into state machine actions.
//! Knobs are polled first, then buttons, so a button press replaces a knob
//! or refresh action synthesized in the same iteration. Only one action is
//! executed per iteration.

use core::convert::Infallible;

use eurocal_hal::{ButtonId, ControlPanel, DelayNs, KnobId};

use crate::config::LoopConfig;
use crate::procedure::Procedure;
use crate::state::{Action, Dispatch, MachineError};

/// Knobs in polling order; an earlier knob's change wins
const KNOBS: [KnobId; 2] = [KnobId::K1, KnobId::K2];

/// Drives a [`Procedure`] from a [`ControlPanel`]
pub struct ControlLoop<P: ControlPanel, D: DelayNs> {
    panel: P,
    delay: D,
    config: LoopConfig,
    knobs: [u8; 2],
}

impl<P: ControlPanel, D: DelayNs> ControlLoop<P, D> {
    /// Create a loop with the default settings
    pub fn new(panel: P, delay: D) -> Self {
        Self::with_config(panel, delay, LoopConfig::default())
    }

    /// Create a loop with custom settings
    ///
    /// The current knob positions are the baseline; they do not produce an
    /// action on the first iteration.
    pub fn with_config(mut panel: P, delay: D, config: LoopConfig) -> Self {
        let knobs = KNOBS.map(|knob| panel.knob_position(knob, config.knob_resolution));
        Self {
            panel,
            delay,
            config,
            knobs,
        }
    }

    /// The panel being polled
    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    /// The delay used between refreshes
    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Run one iteration: poll, queue at most one action, execute it
    pub fn step<R: Procedure>(&mut self, procedure: &mut R) -> Dispatch<R::Step, Action> {
        let resolutions = procedure
            .knob_resolutions()
            .unwrap_or([self.config.knob_resolution; 2]);
        let mut positions = [0u8; 2];
        for (i, knob) in KNOBS.into_iter().enumerate() {
            positions[i] = self.panel.knob_position(knob, resolutions[i]);
        }
        procedure.update_knobs(positions);

        if let Some(i) = (0..KNOBS.len()).find(|&i| positions[i] != self.knobs[i]) {
            self.knobs[i] = positions[i];
            procedure.do_action(Action::from_knob(KNOBS[i]));
        } else if procedure.wants_refresh() {
            procedure.do_action(Action::RefreshDisplay);
            self.delay.delay_ms(self.config.refresh_ms);
        }

        for button in [ButtonId::B1, ButtonId::B2] {
            if self.panel.button_pressed(button) {
                procedure.do_action(Action::from_button(button));
            }
        }

        procedure.execute()
    }

    /// Start `procedure` and drive it forever
    pub fn run<R: Procedure>(&mut self, procedure: &mut R) -> Result<Infallible, MachineError> {
        procedure.start()?;
        loop {
            self.step(procedure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eurocal_sim::{SimDelay, SimPanel};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Screen {
        Menu,
        Live,
    }

    /// Records what the loop asks of it
    struct Recorder {
        screen: Screen,
        pending: Option<Action>,
        executed: heapless::Vec<Action, 16>,
        knobs: [u8; 2],
        resolutions: Option<[u8; 2]>,
    }

    impl Recorder {
        fn new(screen: Screen) -> Self {
            Self {
                screen,
                pending: None,
                executed: heapless::Vec::new(),
                knobs: [0; 2],
                resolutions: None,
            }
        }
    }

    impl Procedure for Recorder {
        type Step = Screen;

        fn start(&mut self) -> Result<(), MachineError> {
            Ok(())
        }

        fn do_action(&mut self, action: Action) {
            self.pending = Some(action);
        }

        fn execute(&mut self) -> Dispatch<Screen, Action> {
            match self.pending.take() {
                Some(action) => {
                    self.executed.push(action).unwrap();
                    Dispatch::Stayed(action)
                }
                None => Dispatch::Idle,
            }
        }

        fn step(&self) -> Option<Screen> {
            Some(self.screen)
        }

        fn wants_refresh(&self) -> bool {
            self.screen == Screen::Live
        }

        fn update_knobs(&mut self, knobs: [u8; 2]) {
            self.knobs = knobs;
        }

        fn knob_resolutions(&self) -> Option<[u8; 2]> {
            self.resolutions
        }
    }

    fn control_loop() -> ControlLoop<SimPanel, SimDelay> {
        let mut panel = SimPanel::new();
        panel.set_knob(KnobId::K1, 5);
        panel.set_knob(KnobId::K2, 5);
        ControlLoop::new(panel, SimDelay::new())
    }

    #[test]
    fn test_quiet_panel_is_idle() {
        let mut runner = control_loop();
        let mut procedure = Recorder::new(Screen::Menu);
        assert_eq!(runner.step(&mut procedure), Dispatch::Idle);
        assert_eq!(runner.delay().elapsed_ms(), 0);
    }

    #[test]
    fn test_live_screen_refreshes_with_pause() {
        let mut runner = control_loop();
        let mut procedure = Recorder::new(Screen::Live);
        assert_eq!(
            runner.step(&mut procedure),
            Dispatch::Stayed(Action::RefreshDisplay)
        );
        assert_eq!(runner.delay().elapsed_ms(), 200);
    }

    #[test]
    fn test_knob1_wins_over_knob2() {
        let mut runner = control_loop();
        let mut procedure = Recorder::new(Screen::Live);
        runner.panel_mut().set_knob(KnobId::K1, 7);
        runner.panel_mut().set_knob(KnobId::K2, 2);

        assert_eq!(runner.step(&mut procedure), Dispatch::Stayed(Action::Knob1));
        assert_eq!(procedure.knobs, [7, 2]);
        assert_eq!(runner.step(&mut procedure), Dispatch::Stayed(Action::Knob2));
        assert_eq!(
            runner.step(&mut procedure),
            Dispatch::Stayed(Action::RefreshDisplay)
        );
    }

    #[test]
    fn test_button_replaces_synthesized_action() {
        let mut runner = control_loop();
        let mut procedure = Recorder::new(Screen::Live);
        runner.panel_mut().set_knob(KnobId::K1, 3);
        runner.panel_mut().press(ButtonId::B2);

        assert_eq!(runner.step(&mut procedure), Dispatch::Stayed(Action::Button2));
        assert_eq!(procedure.executed.as_slice(), &[Action::Button2]);
    }

    #[test]
    fn test_later_button_wins() {
        let mut runner = control_loop();
        let mut procedure = Recorder::new(Screen::Menu);
        runner.panel_mut().press(ButtonId::B1);
        runner.panel_mut().press(ButtonId::B2);

        assert_eq!(runner.step(&mut procedure), Dispatch::Stayed(Action::Button2));
        assert_eq!(runner.step(&mut procedure), Dispatch::Idle);
    }

    #[test]
    fn test_procedure_chooses_knob_resolution() {
        let mut runner = control_loop();
        let mut procedure = Recorder::new(Screen::Live);
        procedure.resolutions = Some([10, 100]);
        runner.panel_mut().set_knob(KnobId::K2, 50);

        assert_eq!(runner.step(&mut procedure), Dispatch::Stayed(Action::Knob2));
        assert_eq!(procedure.knobs, [5, 50]);
        assert_eq!(
            runner.step(&mut procedure),
            Dispatch::Stayed(Action::RefreshDisplay)
        );
    }
}
