// src/engine.rs
//
// Single-owner session engine: holds the one authoritative GameState,
// sequences turns against the oracle, and keeps scene images honest when a
// newer turn supersedes an in-flight image request.

use crate::error::{AppError, GameError};
use crate::game_state::{Difficulty, GameState};
use crate::oracle::Oracle;
use crate::save::{SaveData, SessionStore};
use crate::storage::Storage;
use crate::turn::TurnRequest;
use log::{debug, info};

/// Where the session stands. `Awaiting` only shows between issuing a turn
/// request and merging its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NoGame,
    Awaiting,
    Active,
    Ended,
}

/// Handle for one scene-image request. A result is applied only if its
/// ticket is still the most recently issued one; later turns invalidate
/// earlier tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTicket {
    serial: u64,
}

/// Owns the oracle, the save store and the authoritative state. All state
/// changes are wholesale replacements; the engine never mutates nested
/// fields in place.
///
/// The engine does not guard against overlapping turn requests — callers
/// keep at most one in flight, and if they don't, the last reply to arrive
/// wins.
pub struct SessionEngine<O: Oracle, S: Storage> {
    oracle: O,
    store: SessionStore<S>,
    state: Option<GameState>,
    difficulty: Difficulty,
    phase: Phase,
    image_serial: u64,
    pending_image_prompt: Option<String>,
    scene_image: Option<Vec<u8>>,
}

impl<O: Oracle, S: Storage> SessionEngine<O, S> {
    pub fn new(oracle: O, storage: S) -> Self {
        Self {
            oracle,
            store: SessionStore::new(storage),
            state: None,
            difficulty: Difficulty::default(),
            phase: Phase::NoGame,
            image_serial: 0,
            pending_image_prompt: None,
            scene_image: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The oracle is shared with callers so they can fetch scene images
    /// between turns; see [`Self::begin_scene_image`].
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn scene_image(&self) -> Option<&[u8]> {
        self.scene_image.as_deref()
    }

    pub fn save_exists(&self) -> bool {
        self.store.exists()
    }

    /// Unconditionally replaces the authoritative state. Outstanding image
    /// tickets become stale; a non-terminal state queues its scene prompt,
    /// a terminal one clears the current image.
    pub fn replace(&mut self, new_state: GameState) -> &GameState {
        self.image_serial += 1;
        if new_state.is_game_over {
            self.pending_image_prompt = None;
            self.scene_image = None;
            self.phase = Phase::Ended;
        } else {
            self.pending_image_prompt =
                (!new_state.image_prompt.is_empty()).then(|| new_state.image_prompt.clone());
            self.phase = Phase::Active;
        }
        self.state.insert(new_state)
    }

    /// Starts a fresh session. The previous save is discarded, as starting
    /// anew always has.
    pub async fn start(&mut self, difficulty: Difficulty) -> Result<&GameState, AppError> {
        info!("Starting new game on {difficulty} difficulty");
        self.state = None;
        self.scene_image = None;
        self.pending_image_prompt = None;
        self.difficulty = difficulty;
        self.store.clear()?;
        self.advance(None).await
    }

    /// Plays one choice, quoted verbatim to the oracle.
    pub async fn choose(&mut self, action: &str) -> Result<&GameState, AppError> {
        if self.state.is_none() {
            return Err(GameError::NoActiveGame.into());
        }
        self.advance(Some(action)).await
    }

    /// Attempts an item combination. The intent is flattened to free text
    /// before the request builder sees it.
    pub async fn combine(&mut self, items: &[String]) -> Result<&GameState, AppError> {
        if items.len() < 2 {
            return Err(
                GameError::InvalidCombination("at least two items are required".to_string())
                    .into(),
            );
        }
        let intent = TurnRequest::combine_intent(items);
        self.choose(&intent).await
    }

    async fn advance(&mut self, intent: Option<&str>) -> Result<&GameState, AppError> {
        let request = TurnRequest::build(self.state.as_ref(), intent, self.difficulty);
        self.phase = Phase::Awaiting;
        let new_state = self.oracle.request_next_state(&request).await;
        Ok(self.replace(new_state))
    }

    /// Persists the current session. Explicit user action only; nothing in
    /// the turn pipeline writes to storage.
    pub fn save(&self) -> Result<(), AppError> {
        let state = self.state.as_ref().ok_or(GameError::NoActiveGame)?;
        self.store.persist(state, self.difficulty)?;
        Ok(())
    }

    /// Loads the saved session, migrating legacy shapes. On a corrupt save
    /// the store purges the entry and the in-memory session is untouched.
    pub fn load(&mut self) -> Result<&GameState, AppError> {
        let SaveData {
            game_state,
            difficulty,
        } = self.store.load_and_migrate()?;
        self.difficulty = difficulty;
        Ok(self.replace(game_state))
    }

    /// Discards the session and its save.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.state = None;
        self.scene_image = None;
        self.pending_image_prompt = None;
        self.difficulty = Difficulty::default();
        self.phase = Phase::NoGame;
        self.image_serial += 1;
        self.store.clear()?;
        Ok(())
    }

    /// Takes the pending scene prompt, if any, and hands out the ticket the
    /// eventual result must present. At most one ticket per turn.
    pub fn begin_scene_image(&mut self) -> Option<(ImageTicket, String)> {
        let prompt = self.pending_image_prompt.take()?;
        Some((
            ImageTicket {
                serial: self.image_serial,
            },
            prompt,
        ))
    }

    /// Applies an image result if its ticket is still current; stale results
    /// are dropped without effect. Returns whether the image was applied.
    pub fn apply_scene_image(&mut self, ticket: ImageTicket, image: Option<Vec<u8>>) -> bool {
        if ticket.serial != self.image_serial {
            debug!("Discarding stale scene image result");
            return false;
        }
        self.scene_image = image;
        true
    }
}
