//! The round orchestrator.
//!
//! # Step pipeline
//!
//! Each iteration of [`Runner`]'s loop plays one component:
//!
//! 1. **Data** -- take the component's record from the current scope and
//!    reset its step fields.
//! 2. **Play** -- call [`Component::play`], then return the record.
//! 3. **Awards** -- evaluate everything queued during the play, in order.
//! 4. **Route** -- resolve the successor from the step outcome, unless a
//!    jump award overrides it.
//! 5. **Bookkeeping** -- count the step, hash the state, notify hooks.
//! 6. **Frames** -- enter a granted respin frame, or, when the scope has no
//!    successor, finish the current iteration (looping or exiting frames).
//!
//! A round ends when the round scope has no successor left. It pauses when
//! a component returns [`Step::Await`] and continues with
//! [`Runner::resume`].

use log::{debug, trace, warn};

use crate::award;
use crate::component::{Component, Next, Step};
use crate::fixed::{Coins, Fixed64};
use crate::hooks::{DebugHook, StatsSink, StepView};
use crate::id::ComponentId;
use crate::round::{RoundContext, RoundError, RoundState, Waiting};
use crate::template::GameTemplate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStatus {
    Completed,
    Waiting {
        component: ComponentId,
        options: Vec<String>,
    },
}

/// Outcome of a `run` or `resume` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub status: RoundStatus,
    pub steps: u32,
    pub coin_win: Coins,
    pub cash_win: Fixed64,
    /// Number of paid results.
    pub wins: usize,
    pub state_hash: u64,
}

impl RoundReport {
    pub fn is_complete(&self) -> bool {
        self.status == RoundStatus::Completed
    }
}

pub struct Runner<'t> {
    template: &'t GameTemplate,
    sinks: Vec<Box<dyn StatsSink + 't>>,
    debug: Option<Box<dyn DebugHook + 't>>,
}

impl<'t> Runner<'t> {
    pub fn new(template: &'t GameTemplate) -> Self {
        Self {
            template,
            sinks: Vec::new(),
            debug: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn StatsSink + 't>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_debug_hook(mut self, hook: Box<dyn DebugHook + 't>) -> Self {
        self.debug = Some(hook);
        self
    }

    pub fn template(&self) -> &'t GameTemplate {
        self.template
    }

    /// Run a fresh round from the template's entry component.
    pub fn play_round(&mut self, round: &mut RoundContext) -> Result<RoundReport, RoundError> {
        self.run(round, self.template.entry())
    }

    /// Run a fresh round starting at `entry`.
    pub fn run(&mut self, round: &mut RoundContext, entry: ComponentId) -> Result<RoundReport, RoundError> {
        if round.state != RoundState::Fresh {
            return Err(RoundError::NotRunnable(round.state));
        }
        self.template
            .component(entry)
            .ok_or(RoundError::UnknownComponent(entry))?;
        debug!(
            "round start: game `{}` at `{}`",
            self.template.name(),
            self.template.name_of(entry).unwrap_or("?")
        );
        round.state = RoundState::Running;
        round.current = Some(entry);
        self.drive(round)
    }

    /// Continue a waiting round with the player's `command`. An invalid
    /// command leaves the round waiting.
    pub fn resume(&mut self, round: &mut RoundContext, command: &str) -> Result<RoundReport, RoundError> {
        let waiting = match (&round.state, &round.waiting) {
            (RoundState::Waiting, Some(w)) => w.clone(),
            _ => return Err(RoundError::NotWaiting),
        };
        if !waiting.options.iter().any(|o| o == command) {
            return Err(RoundError::InvalidCommand {
                command: command.to_string(),
                options: waiting.options,
            });
        }
        debug!("resume at component {} with `{command}`", waiting.component.0);
        round.waiting = None;
        round.accept_command(waiting.component, command);
        round.state = RoundState::Running;
        round.current = Some(waiting.component);
        self.drive(round)
    }

    fn drive(&mut self, round: &mut RoundContext) -> Result<RoundReport, RoundError> {
        match self.steps(round) {
            Ok(status) => {
                let completed = status == RoundStatus::Completed;
                let report = RoundReport {
                    status,
                    steps: round.step(),
                    coin_win: round.coin_win(),
                    cash_win: round.cash_win(),
                    wins: round.results().len(),
                    state_hash: round.state_hash(),
                };
                if completed {
                    round.state = RoundState::Completed;
                    debug!(
                        "round end after {} steps: {} coins, {} cash",
                        report.steps, report.coin_win, report.cash_win
                    );
                    for sink in &mut self.sinks {
                        sink.on_round_end(&report, round);
                    }
                } else {
                    round.state = RoundState::Waiting;
                }
                Ok(report)
            }
            Err(e) => {
                round.state = RoundState::Failed;
                round.current = None;
                warn!("round aborted at step {}: {e}", round.step());
                for sink in &mut self.sinks {
                    sink.on_round_abort();
                }
                Err(e)
            }
        }
    }

    fn steps(&mut self, round: &mut RoundContext) -> Result<RoundStatus, RoundError> {
        let template = self.template;
        let max_steps = template.max_steps();

        while let Some(id) = round.current {
            // Routing back onto the active respin closes the iteration.
            if round.calls().current_frame().is_some_and(|f| f.respin == id) {
                round.current = self.finish_iteration(round)?;
                continue;
            }
            if round.step() >= max_steps {
                warn!("step limit {max_steps} reached");
                return Err(RoundError::StepLimit(max_steps));
            }
            let component = template
                .component(id)
                .ok_or(RoundError::UnknownComponent(id))?;

            let mut data = round.take_data(id)?;
            data.on_new_step();
            data.base_mut().play_count += 1;
            let outcome = component.play(round, data.as_mut());
            round.put_data(id, data);
            let outcome = outcome?;
            round.advance_step();
            trace!(
                "step {} `{}` -> {outcome:?}",
                round.step(),
                component.name()
            );

            award::evaluate_pending(round)?;

            let mut next = match &outcome {
                Step::Advance(Next::To(target)) => Some(*target),
                Step::Advance(Next::End) => None,
                Step::Advance(Next::Default) | Step::NoOp | Step::Await(_) => {
                    component.default_next()
                }
            };
            if let Some(target) = round.take_jump(id) {
                trace!("jump override -> {}", target.0);
                next = Some(target);
            }

            round.record_hash();
            self.notify(round, component, &outcome, next);

            if let Step::Await(options) = outcome {
                round.waiting = Some(Waiting {
                    component: id,
                    options: options.clone(),
                });
                return Ok(RoundStatus::Waiting {
                    component: id,
                    options,
                });
            }

            round.current = match round.take_pending_entry() {
                Some(entry) => {
                    let first = template
                        .component(entry.respin)
                        .and_then(|c| c.respin_entry())
                        .ok_or(RoundError::NotRespin(entry.respin))?;
                    round.enter_frame(entry.respin, entry.iterations, first, next);
                    Some(first)
                }
                None => match next {
                    Some(n) => Some(n),
                    None => self.finish_iteration(round)?,
                },
            };
        }
        Ok(RoundStatus::Completed)
    }

    /// Close the current iteration. Loops the frame while iterations remain;
    /// otherwise exits it and resumes the enclosing scope, repeating while
    /// exited frames have nowhere to return to. `None` ends the round.
    fn finish_iteration(&mut self, round: &mut RoundContext) -> Result<Option<ComponentId>, RoundError> {
        loop {
            let first = match round.calls().current_frame() {
                Some(frame) => frame.first,
                None => return Ok(None),
            };
            if !round.tick_frame()? {
                return Ok(Some(first));
            }
            let summary = round.exit_frame()?;
            if summary.return_to.is_some() {
                return Ok(summary.return_to);
            }
        }
    }

    fn notify(
        &mut self,
        round: &RoundContext,
        component: &dyn Component,
        outcome: &Step,
        next: Option<ComponentId>,
    ) {
        if self.sinks.is_empty() && self.debug.is_none() {
            return;
        }
        let id = component.id();
        let Some(data) = round.find_data(id) else {
            return;
        };
        for sink in &mut self.sinks {
            sink.on_step(id, component.name(), data);
        }
        if let Some(hook) = &mut self.debug {
            hook.inspect(&StepView {
                step: round.step(),
                component: id,
                name: component.name(),
                kind: component.kind(),
                outcome,
                next,
                data,
                round,
            });
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
