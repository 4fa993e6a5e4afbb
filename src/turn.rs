// src/turn.rs
//
// Builds the payload for one game-master turn. Pure transforms only: the
// oracle client owns the transport, model id and sampling parameters.

use crate::game_state::{Difficulty, GameState, MAX_INVENTORY_SIZE};
use serde_json::{Value, json};

/// Fixed rules handed to the game master as the system instruction. The
/// inventory cap, health range and flag conventions live here — the engine
/// trusts the oracle to enforce them.
pub fn system_instruction() -> String {
    format!(
        r#"You are an expert text adventure game master running a classic fantasy adventure.

You MUST ALWAYS answer with a single valid JSON object matching the provided schema.

Your responsibilities:
1. Storytelling: write immersive second-person story segments ("You see...", "You feel...") rich in sensory detail. The story must evolve from the player's choices.
2. State management: track the player's inventory, health (starts at 100, game over at 0 or below) and status effect (e.g. 'Poisoned', 'Blessed'; null means none). Every change must follow from the story.
3. Inventory limit: the player can carry at most {max} items. If the inventory is full, say so in the story and do NOT add the item; offer choices to drop something instead.
4. Choices: offer 2 to 4 meaningful choices after each segment, each leading to a different outcome. When the game is over, offer none and set 'isGameOver' to true with a concluding segment.
5. Image prompts: for every scene provide an evocative prompt for an AI image generator covering subject, mood, lighting and artistic style.
6. Item usage: check the inventory every turn. When an item is relevant, offer an explicit choice to use it (e.g. "Use the silver key") with 'isItemUse' set to true, and remove the item from the inventory once used.
7. Item descriptions: every new inventory item needs a brief, flavorful description.
8. Item combination: when two or more carried items logically combine (e.g. 'stick' and 'flint' into a 'torch'), offer an explicit combine choice with 'isItemCombine' set to true and the item names listed in 'itemsToCombine'. Combining consumes the parts and adds the result.
9. Combat: start a fight by populating 'combatState' with a specific enemy type and a 'maxEnemyHealth' matching its toughness. During combat offer tactical choices, marking attacks with 'isAttack'. Resolve the player's action and the enemy's counter-attack in the same segment, updating both healths. When the enemy drops to 0 or below, set 'combatState' to null and narrate the victory."#,
        max = MAX_INVENTORY_SIZE
    )
}

/// Pacing/harshness guideline for one difficulty tier. Exactly three fixed
/// variants; the tier is chosen once per session.
pub fn difficulty_guideline(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => {
            "The story should be straightforward and forgiving, and the player should feel heroic. \
             Reach a conclusion in about 5-7 steps. Give descriptive hints, be generous with \
             health, and keep enemies weak."
        }
        Difficulty::Medium => {
            "The story should be balanced: choices carry clear consequences, good and bad. \
             Moderate length, about 8-12 steps, with moderate damage and healing. Enemies have \
             standard strength."
        }
        Difficulty::Hard => {
            "The story should be complex and dangerous, with ambiguous choices and real failure. \
             Longer and more intricate, 15+ steps. Keep descriptions terse, be punishing with \
             health loss, and make enemies strong and smart."
        }
    }
}

/// The strict output schema the oracle must satisfy, in JSON Schema form.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "story": {
                "type": "string",
                "description": "The next story segment, written in the second person."
            },
            "inventory": {
                "type": "array",
                "description": "The full updated list of carried items.",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name", "description"]
                }
            },
            "choices": {
                "type": "array",
                "description": "2-4 choices, or empty when the game is over.",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "text": { "type": "string" },
                        "prompt": {
                            "type": "string",
                            "description": "Short summary of the action, echoed back next turn."
                        },
                        "isItemUse": { "type": "boolean" },
                        "isItemCombine": { "type": "boolean" },
                        "itemsToCombine": {
                            "type": "array",
                            "items": { "type": "string" }
                        },
                        "isAttack": { "type": "boolean" }
                    },
                    "required": [
                        "text", "prompt", "isItemUse", "isItemCombine",
                        "itemsToCombine", "isAttack"
                    ]
                }
            },
            "isGameOver": { "type": "boolean" },
            "imagePrompt": {
                "type": "string",
                "description": "Prompt for an AI image generator capturing the scene."
            },
            "health": {
                "type": "integer",
                "description": "Player health, 0-100. 0 or below means isGameOver must be true."
            },
            "status": {
                "type": ["string", "null"],
                "description": "Current status effect, or null when none is active."
            },
            "combatState": {
                "type": ["object", "null"],
                "additionalProperties": false,
                "properties": {
                    "enemyName": { "type": "string" },
                    "enemyHealth": { "type": "integer" },
                    "maxEnemyHealth": { "type": "integer" }
                },
                "required": ["enemyName", "enemyHealth", "maxEnemyHealth"]
            }
        },
        "required": [
            "story", "inventory", "choices", "isGameOver",
            "imagePrompt", "health", "status", "combatState"
        ]
    })
}

/// One assembled turn payload. Intent-agnostic: item combination arrives
/// here already flattened into free text by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub prompt: String,
    pub difficulty: Difficulty,
}

impl TurnRequest {
    /// Assembles the user prompt for the next turn. With no state and no
    /// intent this is the new-game payload; otherwise it summarizes the
    /// current snapshot and quotes the player's intent verbatim.
    pub fn build(state: Option<&GameState>, intent: Option<&str>, difficulty: Difficulty) -> Self {
        let guideline = difficulty_guideline(difficulty);
        let prompt = match intent {
            Some(action) => {
                let health = state.map_or(100, |s| s.health);
                let inventory = state.map(|s| s.inventory.as_slice()).unwrap_or_default();
                let occupancy = format!("({}/{} items)", inventory.len(), MAX_INVENTORY_SIZE);
                let inventory_summary = if inventory.is_empty() {
                    format!("empty {occupancy}")
                } else {
                    let names: Vec<&str> =
                        inventory.iter().map(|item| item.name.as_str()).collect();
                    format!("[{}] {occupancy}", names.join(", "))
                };
                let status_summary = state
                    .and_then(|s| s.status.as_deref())
                    .map(|status| format!(" The player's status is {status}."))
                    .unwrap_or_default();
                let combat_summary = state
                    .and_then(|s| s.combat_state.as_ref())
                    .map(|combat| {
                        format!(
                            " The player is in combat with a {} ({}/{} health).",
                            combat.enemy_name, combat.enemy_health, combat.max_enemy_health
                        )
                    })
                    .unwrap_or_default();

                format!(
                    "Player state: Health is {health}/100. Inventory is {inventory_summary}.\
                     {status_summary}{combat_summary} The player chose: \"{action}\". \
                     Continue the story, logically updating health, status, inventory, and \
                     combat state based on the events, and adhering to these difficulty \
                     guidelines: {guideline}"
                )
            }
            None => format!(
                "Start a new fantasy adventure for the player with {difficulty} difficulty. \
                 The player begins with 100 health, no status effects, and is not in combat. \
                 Here are the guidelines: {guideline}"
            ),
        };

        TurnRequest { prompt, difficulty }
    }

    /// Free-text intent for an item combination, synthesized before the
    /// builder ever sees it.
    pub fn combine_intent(items: &[String]) -> String {
        format!("Attempt to combine the following items: {}.", items.join(", "))
    }
}
