//! Observation points on a running round.
//!
//! Hooks get shared references only; nothing they do can change the
//! outcome of a round.

use crate::component::Step;
use crate::data::ComponentData;
use crate::id::ComponentId;
use crate::round::RoundContext;
use crate::runner::RoundReport;

/// Receives every completed play and every finished round.
///
/// Plays reported through `on_step` belong to the round in progress until
/// `on_round_end` confirms it. A round that fails calls `on_round_abort`
/// instead, and its plays should be dropped.
pub trait StatsSink {
    fn on_step(&mut self, component: ComponentId, name: &str, data: &dyn ComponentData);

    fn on_round_end(&mut self, report: &RoundReport, round: &RoundContext);

    fn on_round_abort(&mut self) {}
}

/// Everything a debugger may look at after one step.
#[derive(Debug)]
pub struct StepView<'a> {
    /// Number of plays completed, this one included.
    pub step: u32,
    pub component: ComponentId,
    pub name: &'a str,
    pub kind: &'static str,
    pub outcome: &'a Step,
    /// Resolved successor, `None` when the scope ends here.
    pub next: Option<ComponentId>,
    pub data: &'a dyn ComponentData,
    pub round: &'a RoundContext,
}

impl StepView<'_> {
    pub fn depth(&self) -> usize {
        self.round.calls().depth()
    }
}

pub trait DebugHook {
    fn inspect(&mut self, view: &StepView<'_>);
}

impl<S: StatsSink + ?Sized> StatsSink for &mut S {
    fn on_step(&mut self, component: ComponentId, name: &str, data: &dyn ComponentData) {
        (**self).on_step(component, name, data);
    }

    fn on_round_end(&mut self, report: &RoundReport, round: &RoundContext) {
        (**self).on_round_end(report, round);
    }

    fn on_round_abort(&mut self) {
        (**self).on_round_abort();
    }
}

impl<H: DebugHook + ?Sized> DebugHook for &mut H {
    fn inspect(&mut self, view: &StepView<'_>) {
        (**self).inspect(view);
    }
}
