// src/save.rs
//
// Durable save handling. One fixed key, whole-save overwrites, and an
// explicit migration chain that upgrades legacy save shapes on load.

use crate::error::SaveError;
use crate::game_state::{Difficulty, GameState};
use crate::storage::Storage;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Fixed storage key for the one save slot.
pub const SAVE_KEY: &str = "fateweaver_save";

/// Description given to items recovered from saves that predate item
/// descriptions.
pub const LEGACY_ITEM_DESCRIPTION: &str =
    "An item from a bygone era, its secrets are yours to rediscover.";

/// The durable form of a session: the snapshot plus its fixed difficulty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub game_state: GameState,
    pub difficulty: Difficulty,
}

/// One step of the save-format upgrade chain. Steps are applied in order,
/// repeatedly, until no predicate matches; each must be idempotent.
struct Migration {
    name: &'static str,
    applies: fn(&Value) -> bool,
    apply: fn(&mut Value),
}

const MIGRATIONS: &[Migration] = &[
    // The oldest saves stored the bare game state with no difficulty wrapper.
    Migration {
        name: "wrap-bare-game-state",
        applies: |value| value.is_object() && value.get("gameState").is_none(),
        apply: |value| {
            let state = value.take();
            *value = json!({ "gameState": state, "difficulty": "Medium" });
        },
    },
    Migration {
        name: "default-difficulty",
        applies: |value| !matches!(value.get("difficulty"), Some(Value::String(d)) if
            matches!(d.as_str(), "Easy" | "Medium" | "Hard")),
        apply: |value| {
            value["difficulty"] = json!("Medium");
        },
    },
    // Health, status and combat state arrived after the first release.
    Migration {
        name: "default-health-status-combat",
        applies: |value| {
            value.get("gameState").is_some_and(|state| {
                !state.is_object()
                    || !state.get("health").is_some_and(Value::is_number)
                    || state.get("status").is_none()
                    || state.get("combatState").is_none()
            })
        },
        apply: |value| {
            let Some(state) = value.get_mut("gameState") else {
                return;
            };
            if !state.is_object() {
                *state = json!({});
            }
            if !state.get("health").is_some_and(Value::is_number) {
                state["health"] = json!(100);
            }
            if state.get("status").is_none() {
                state["status"] = Value::Null;
            }
            if state.get("combatState").is_none() {
                state["combatState"] = Value::Null;
            }
        },
    },
    // Inventories used to be plain name lists; lift each name to a full item.
    Migration {
        name: "lift-string-inventory",
        applies: |value| {
            value["gameState"]
                .get("inventory")
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(Value::is_string))
        },
        apply: |value| {
            let Some(inventory) = value
                .get_mut("gameState")
                .and_then(|state| state.get_mut("inventory"))
            else {
                return;
            };
            if let Some(items) = inventory.as_array_mut() {
                for item in items.iter_mut() {
                    if let Some(name) = item.as_str() {
                        *item = json!({
                            "name": name,
                            "description": LEGACY_ITEM_DESCRIPTION,
                        });
                    }
                }
            }
        },
    },
    // A missing or malformed inventory resets rather than failing the load.
    Migration {
        name: "reset-malformed-inventory",
        applies: |value| {
            match value["gameState"].get("inventory") {
                Some(Value::Array(items)) => items.iter().any(|item| {
                    !(item.get("name").is_some_and(Value::is_string)
                        && item.get("description").is_some_and(Value::is_string))
                }),
                _ => true,
            }
        },
        apply: |value| {
            let Some(state) = value.get_mut("gameState").filter(|s| s.is_object()) else {
                return;
            };
            let kept: Vec<Value> = state
                .get("inventory")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter(|item| {
                            item.get("name").is_some_and(Value::is_string)
                                && item.get("description").is_some_and(Value::is_string)
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            state["inventory"] = Value::Array(kept);
        },
    },
];

/// Runs the migration chain until the shape is stable. Bounded to one pass
/// per step beyond the first; every step is idempotent.
fn migrate(mut value: Value) -> Value {
    for _ in 0..=MIGRATIONS.len() {
        let mut changed = false;
        for migration in MIGRATIONS {
            if (migration.applies)(&value) {
                info!("Applying save migration: {}", migration.name);
                (migration.apply)(&mut value);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    value
}

/// Persistence facade over the blob store. Holds no game state itself: the
/// engine owns the authoritative snapshot, this type owns its durable form.
pub struct SessionStore<S: Storage> {
    storage: S,
}

impl<S: Storage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// O(1) presence check, no deserialization.
    pub fn exists(&self) -> bool {
        self.storage.contains(SAVE_KEY)
    }

    /// Writes the whole save, replacing any previous one.
    pub fn persist(&self, state: &GameState, difficulty: Difficulty) -> Result<(), SaveError> {
        let data = SaveData {
            game_state: state.clone(),
            difficulty,
        };
        let serialized = serde_json::to_string_pretty(&data)?;
        self.storage.write(SAVE_KEY, &serialized)?;
        Ok(())
    }

    /// Loads the save, upgrading legacy shapes along the way.
    ///
    /// Only an unparseable payload fails the load; a corrupt entry is purged
    /// before the error returns so `exists()` stays consistent.
    pub fn load_and_migrate(&self) -> Result<SaveData, SaveError> {
        let raw = self.storage.read(SAVE_KEY)?.ok_or(SaveError::NoSave)?;

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => return self.purge_corrupt(err.to_string()),
        };
        if !value.is_object() {
            return self.purge_corrupt("save payload is not a JSON object".to_string());
        }

        let migrated = migrate(value);
        match serde_json::from_value(migrated) {
            Ok(data) => Ok(data),
            Err(err) => self.purge_corrupt(err.to_string()),
        }
    }

    /// Deletes the save slot. Used on reset and when starting a new game.
    pub fn clear(&self) -> Result<(), SaveError> {
        self.storage.remove(SAVE_KEY)?;
        Ok(())
    }

    fn purge_corrupt(&self, reason: String) -> Result<SaveData, SaveError> {
        warn!("Purging corrupt save: {reason}");
        self.storage.remove(SAVE_KEY)?;
        Err(SaveError::Corrupt(reason))
    }
}
