//! Episode lifecycle
//!
//! An episode advances through pure `step` calls. `run_episode` is the thin
//! driver that composes stepping with an optional render sink and pacing.

use crate::context::{AbortFlag, SimulationContext};
use crate::controller::FitnessReport;
use crate::error::Aborted;
use crate::render::{Frame, FramePacer, RenderSink};

/// Episode state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodePhase {
    Running,
    Terminated,
}

/// A single evaluation run
pub trait Episode {
    /// Visualization pace (ticks per second)
    const TICK_RATE: u32;

    /// Advance one fixed tick. Polls `abort` before touching any state.
    fn step(&mut self, abort: &AbortFlag) -> Result<EpisodePhase, Aborted>;

    fn phase(&self) -> EpisodePhase;

    /// Read-only snapshot for rendering
    fn frame(&self, generation: usize) -> Frame;

    /// Fitness per controller; final once the episode terminated
    fn report(&self) -> FitnessReport;
}

/// Step an episode to termination, presenting frames when the sink wants them
pub fn run_episode<E: Episode>(
    episode: &mut E,
    ctx: &SimulationContext,
    sink: &mut dyn RenderSink,
) -> Result<FitnessReport, Aborted> {
    let mut pacer = sink.is_enabled().then(|| FramePacer::new(E::TICK_RATE));

    while episode.phase() == EpisodePhase::Running {
        episode.step(&ctx.abort)?;
        if sink.is_enabled() {
            sink.present(&episode.frame(ctx.generation()));
            if let Some(pacer) = pacer.as_mut() {
                pacer.wait();
            }
        }
    }
    Ok(episode.report())
}
