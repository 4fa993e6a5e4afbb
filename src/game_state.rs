use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Hard cap communicated to the game master. The engine itself does not
/// truncate — the cap lives in the instruction text and the oracle is
/// expected to honor it.
pub const MAX_INVENTORY_SIZE: usize = 10;

/// One item carried by the player. The name doubles as the match key for
/// use/combine intents; duplicates are allowed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub name: String,
    pub description: String,
}

/// A choice offered to the player at the end of a story segment.
///
/// The flags are presentation affordances only (icons, grouping). They never
/// influence how a response is merged.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Choice {
    pub text: String,
    /// Opaque action summary, sent back verbatim when the choice is taken.
    pub prompt: String,
    pub is_item_use: bool,
    pub is_item_combine: bool,
    pub items_to_combine: Vec<String>,
    pub is_attack: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CombatState {
    pub enemy_name: String,
    pub enemy_health: i32,
    pub max_enemy_health: i32,
}

/// The authoritative per-session snapshot. Replaced wholesale on every turn;
/// nested fields are never mutated in place.
///
/// Field names stay camelCase on the wire so saves written by earlier
/// versions of the game keep loading.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub story: String,
    pub inventory: Vec<InventoryItem>,
    pub choices: Vec<Choice>,
    pub is_game_over: bool,
    /// May be empty when the oracle omitted it; no image is requested then.
    #[serde(default)]
    pub image_prompt: String,
    pub health: i32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub combat_state: Option<CombatState>,
}

impl GameState {
    pub fn in_combat(&self) -> bool {
        self.combat_state.is_some()
    }
}

/// Session difficulty, fixed once a game starts.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display, EnumString,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}
