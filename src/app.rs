//! Process-level context: the game plus the collaborators it never owns
//! itself (clock, input, drawing).

use std::io;
use std::time::Duration;

use crate::config::Config;
use crate::game::{Action, Game, Snapshot};
use crate::source::PieceSource;

// ============================================================================
// Boundary Traits
// ============================================================================

/// Monotonic, non-decreasing millisecond counter.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

/// What the player asked the application to do besides playing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flow {
    Continue,
    Restart,
    Quit,
}

pub trait InputSource {
    /// Waits up to `budget` for input, appending every decoded action.
    fn poll(&mut self, budget: Duration, actions: &mut Vec<Action>) -> io::Result<Flow>;
}

pub trait Renderer {
    fn draw(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

// ============================================================================
// Application
// ============================================================================

pub struct Application<C, I, R> {
    clock: C,
    input: I,
    renderer: R,
    game: Game,
    frame: Duration,
    actions: Vec<Action>,
    frames: u64,
}

impl<C: Clock, I: InputSource, R: Renderer> Application<C, I, R> {
    pub fn new(
        config: Config,
        source: Box<dyn PieceSource>,
        clock: C,
        input: I,
        renderer: R,
    ) -> Self {
        let frame = Duration::from_millis(config.frame_ms());
        let game = Game::new(config, source, clock.now_millis());

        Self {
            clock,
            input,
            renderer,
            game,
            frame,
            actions: Vec::new(),
            frames: 0,
        }
    }

    /// One frame: gather input for the frame budget, tick, draw.
    pub fn run_frame(&mut self) -> io::Result<Flow> {
        self.actions.clear();
        let flow = self.input.poll(self.frame, &mut self.actions)?;
        if flow == Flow::Quit {
            return Ok(flow);
        }

        let now = self.clock.now_millis();
        if flow == Flow::Restart {
            self.game.restart(now);
        }

        self.game.tick(now, &self.actions);
        for event in self.game.take_events() {
            tracing::trace!(?event, "game event");
        }

        self.renderer.draw(&self.game.snapshot())?;
        self.frames += 1;
        Ok(flow)
    }

    /// Runs frames until the input source asks to quit.
    pub fn run(&mut self) -> io::Result<()> {
        tracing::info!(frame_ms = self.frame.as_millis() as u64, "starting game loop");

        while self.run_frame()? != Flow::Quit {}

        tracing::info!(
            frames = self.frames,
            score = self.game.score(),
            lines = self.game.lines_cleared(),
            pieces = self.game.pieces_locked(),
            "session ended"
        );
        Ok(())
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
