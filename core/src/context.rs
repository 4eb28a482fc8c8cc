//! Store contexts for the two module roles
//!
//! Provider state lives here rather than in globals: it is created when a
//! module is instantiated and dropped together with its store.

use wasmtime::{StoreLimits, StoreLimitsBuilder};

use crate::config::ExportNames;
use crate::env::HostState;
use crate::providers::{
    AudioHost, AudioState, GraphicsHost, GraphicsState, InputHost, InputState, RelayHost,
};
use crate::relay::PlayerInstance;

fn limits_for(ram_limit: usize) -> StoreLimits {
    StoreLimitsBuilder::new().memory_size(ram_limit).build()
}

/// Context of the coordinator module: full provider set plus the player roster
pub struct CoordinatorContext {
    label: String,
    limits: StoreLimits,
    pub graphics: GraphicsState,
    pub input: InputState,
    pub audio: AudioState,
    pub players: Vec<PlayerInstance>,
    pub exports: ExportNames,
}

impl CoordinatorContext {
    pub fn new(label: impl Into<String>, ram_limit: usize, exports: ExportNames) -> Self {
        Self {
            label: label.into(),
            limits: limits_for(ram_limit),
            graphics: GraphicsState::default(),
            input: InputState::default(),
            audio: AudioState::default(),
            players: Vec::new(),
            exports,
        }
    }

    pub fn with_graphics(mut self, graphics: GraphicsState) -> Self {
        self.graphics = graphics;
        self
    }

    pub fn with_audio(mut self, audio: AudioState) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_players(mut self, players: Vec<PlayerInstance>) -> Self {
        self.players = players;
        self
    }
}

impl HostState for CoordinatorContext {
    fn label(&self) -> &str {
        &self.label
    }

    fn limits(&mut self) -> &mut StoreLimits {
        &mut self.limits
    }
}

impl GraphicsHost for CoordinatorContext {
    fn graphics(&mut self) -> &mut GraphicsState {
        &mut self.graphics
    }
}

impl InputHost for CoordinatorContext {
    fn input(&mut self) -> &mut InputState {
        &mut self.input
    }
}

impl AudioHost for CoordinatorContext {
    fn audio(&mut self) -> &mut AudioState {
        &mut self.audio
    }
}

impl RelayHost for CoordinatorContext {
    fn player(&mut self, slot: usize) -> Option<&mut PlayerInstance> {
        self.players.get_mut(slot)
    }

    fn player_with_input(
        &mut self,
        slot: usize,
    ) -> Option<(&mut PlayerInstance, &mut InputState)> {
        let player = self.players.get_mut(slot)?;
        Some((player, &mut self.input))
    }

    fn exports(&self) -> &ExportNames {
        &self.exports
    }
}

/// Context of a player module
///
/// Minimal players only bind the format provider and never touch the
/// graphics or input state. Interactive players draw into their own
/// graphics state; `input` holds the coordinator's pointer state only
/// while a decision is being relayed and is empty otherwise.
pub struct PlayerContext {
    label: String,
    limits: StoreLimits,
    pub graphics: GraphicsState,
    pub input: InputState,
}

impl PlayerContext {
    pub fn new(label: impl Into<String>, ram_limit: usize) -> Self {
        Self {
            label: label.into(),
            limits: limits_for(ram_limit),
            graphics: GraphicsState::default(),
            input: InputState::default(),
        }
    }

    pub fn with_graphics(mut self, graphics: GraphicsState) -> Self {
        self.graphics = graphics;
        self
    }
}

impl HostState for PlayerContext {
    fn label(&self) -> &str {
        &self.label
    }

    fn limits(&mut self) -> &mut StoreLimits {
        &mut self.limits
    }
}

impl GraphicsHost for PlayerContext {
    fn graphics(&mut self) -> &mut GraphicsState {
        &mut self.graphics
    }
}

impl InputHost for PlayerContext {
    fn input(&mut self) -> &mut InputState {
        &mut self.input
    }
}
