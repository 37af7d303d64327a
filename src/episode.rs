//! One game session played by one controller
//!
//! An episode couples a fresh [`GameState`], a [`PaddleController`] and a
//! [`FitnessTracker`]. Every step scores the tick, asks the controller for
//! input, advances the simulation and feeds the resulting events into the
//! tracker. The episode ends when the last ball is lost, the level is
//! cleared, the tick limit is hit or the caller ends it.

use crate::agent::{ManualInput, PaddleController};
use crate::consts::SIM_DT;
use crate::fitness::{FitnessRules, FitnessTracker};
use crate::sim::{EndReason, GamePhase, GameState, tick};

/// Summary of a finished episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeEnd {
    pub reason: EndReason,
    pub fitness: f64,
    pub ticks: u64,
    pub bricks: u32,
    pub paddle_hits: u32,
}

pub struct Episode {
    state: GameState,
    tracker: FitnessTracker,
    controller: Box<dyn PaddleController>,
    max_ticks: Option<u64>,
    finished: Option<EpisodeEnd>,
}

impl Episode {
    pub fn new(
        seed: u64,
        controller: Box<dyn PaddleController>,
        rules: FitnessRules,
        max_ticks: Option<u64>,
    ) -> Self {
        Self {
            state: GameState::new(seed),
            tracker: FitnessTracker::new(rules),
            controller,
            max_ticks,
            finished: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn tracker(&self) -> &FitnessTracker {
        &self.tracker
    }

    pub fn label(&self) -> &str {
        self.controller.label()
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.tracker.fitness()
    }

    pub fn result(&self) -> Option<&EpisodeEnd> {
        self.finished.as_ref()
    }

    /// Advance one fixed tick; returns the summary once the episode is over
    pub fn step(&mut self, manual: &ManualInput) -> Option<EpisodeEnd> {
        if self.finished.is_some() {
            return self.finished.clone();
        }

        self.tracker.on_tick();
        let input = self.controller.command(&self.state, manual);
        tick(&mut self.state, &input, SIM_DT);
        for event in self.state.drain_events() {
            self.tracker.on_event(&event);
        }

        if let GamePhase::Over(reason) = self.state.phase {
            return Some(self.finish(reason));
        }
        if self
            .max_ticks
            .is_some_and(|limit| self.tracker.ticks() >= limit)
        {
            return Some(self.end(EndReason::TickLimit));
        }
        None
    }

    /// Stop the episode from outside (quit key, closed window, tick limit)
    pub fn end(&mut self, reason: EndReason) -> EpisodeEnd {
        if let Some(end) = &self.finished {
            return end.clone();
        }
        self.state.end(reason);
        let reason = match self.state.phase {
            GamePhase::Over(reason) => reason,
            GamePhase::Playing => reason,
        };
        self.finish(reason)
    }

    fn finish(&mut self, reason: EndReason) -> EpisodeEnd {
        if reason == EndReason::BallLost {
            self.tracker.on_ball_lost();
        }
        let end = EpisodeEnd {
            reason,
            fitness: self.tracker.fitness(),
            ticks: self.tracker.ticks(),
            bricks: self.tracker.bricks(),
            paddle_hits: self.tracker.paddle_hits(),
        };
        log::debug!(
            "{} finished: {:?} after {} ticks, fitness {:.3}",
            self.controller.label(),
            end.reason,
            end.ticks,
            end.fitness
        );
        self.finished = Some(end.clone());
        end
    }

    /// Step without a window until the episode ends
    pub fn run_headless(&mut self) -> EpisodeEnd {
        let manual = ManualInput::default();
        loop {
            if let Some(end) = self.step(&manual) {
                return end;
            }
        }
    }
}
