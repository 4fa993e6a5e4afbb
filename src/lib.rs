pub mod engine;
pub mod error;
pub mod game_state;
pub mod logging;
pub mod oracle;
pub mod save;
pub mod settings;
pub mod storage;
pub mod turn;

// Re-export commonly used items for easier access
pub use engine::{ImageTicket, Phase, SessionEngine};
pub use error::{AppError, GameError, OracleError, SaveError, StorageError};
pub use game_state::{
    Choice, CombatState, Difficulty, GameState, InventoryItem, MAX_INVENTORY_SIZE,
};
pub use oracle::{AspectRatio, GameMaster, Oracle, fallback_state, parse_turn_response};
pub use save::{LEGACY_ITEM_DESCRIPTION, SAVE_KEY, SaveData, SessionStore};
pub use settings::{SETTINGS_KEY, Settings, SpeechSettings};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use turn::TurnRequest;
