// ../tests/tests.rs
use fateweaver::*;
use serde_json::json;
use std::collections::VecDeque;
use std::fs;
use std::sync::Mutex;

/// Scripted stand-in for the generative model. Replies are raw JSON strings
/// run through the same validation pipeline as the live client; a `None`
/// reply simulates a transport failure.
#[derive(Default)]
struct ScriptedOracle {
    replies: Mutex<VecDeque<Option<String>>>,
    images: Mutex<VecDeque<Option<Vec<u8>>>>,
}

impl ScriptedOracle {
    fn new() -> Self {
        Self::default()
    }

    fn reply(self, raw: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Some(raw.to_string()));
        self
    }

    fn transport_failure(self) -> Self {
        self.replies.lock().unwrap().push_back(None);
        self
    }

    fn image(self, image: Option<Vec<u8>>) -> Self {
        self.images.lock().unwrap().push_back(image);
        self
    }
}

impl Oracle for ScriptedOracle {
    async fn request_next_state(&self, _request: &TurnRequest) -> GameState {
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(raw)) => parse_turn_response(&raw).unwrap_or_else(|_| fallback_state()),
            _ => fallback_state(),
        }
    }

    async fn request_scene_image(
        &self,
        _prompt: &str,
        _aspect_ratio: AspectRatio,
    ) -> Option<Vec<u8>> {
        self.images.lock().unwrap().pop_front().flatten()
    }
}

fn turn_response_fixture() -> String {
    fs::read_to_string("tests/dummy_turn_response.json")
        .expect("Failed to read dummy turn response JSON file")
}

// --- Oracle response validation ---------------------------------------------

#[test]
fn test_valid_turn_response_is_accepted() {
    let state = parse_turn_response(&turn_response_fixture()).expect("fixture should validate");

    assert_eq!(state.health, 92);
    assert_eq!(state.status.as_deref(), Some("Blessed"));
    assert!(state.combat_state.is_none());
    assert!(!state.is_game_over);
    assert_eq!(state.inventory.len(), 2);
    assert_eq!(state.inventory[0].name, "rusty sword");
    assert_eq!(state.choices.len(), 3);
    assert!(state.choices[1].is_item_use);
    assert!(state.choices[2].is_item_combine);
    assert_eq!(
        state.choices[2].items_to_combine,
        vec!["rusty sword".to_string(), "torch".to_string()]
    );
}

#[test]
fn test_missing_status_and_combat_default_to_none() {
    let raw = json!({
        "story": "You walk on.",
        "inventory": [],
        "choices": [{ "text": "Continue", "prompt": "Continue" }],
        "isGameOver": false,
        "imagePrompt": "A winding road.",
        "health": 100
    })
    .to_string();

    let state = parse_turn_response(&raw).expect("older schema revisions still validate");
    assert_eq!(state.status, None);
    assert_eq!(state.combat_state, None);
}

#[test]
fn test_one_bad_inventory_element_rejects_the_whole_reply() {
    let raw = json!({
        "story": "You walk on.",
        "inventory": [
            { "name": "lantern", "description": "A dented brass lantern." },
            { "name": "mystery" }
        ],
        "choices": [],
        "isGameOver": false,
        "imagePrompt": "A winding road.",
        "health": 100
    })
    .to_string();

    assert!(matches!(
        parse_turn_response(&raw),
        Err(OracleError::InvalidResponse(_))
    ));
}

#[test]
fn test_non_numeric_health_is_rejected() {
    let raw = json!({
        "story": "You walk on.",
        "inventory": [],
        "choices": [],
        "isGameOver": false,
        "imagePrompt": "A winding road.",
        "health": "hale"
    })
    .to_string();

    assert!(matches!(
        parse_turn_response(&raw),
        Err(OracleError::InvalidResponse(_))
    ));
}

#[test]
fn test_malformed_json_is_rejected() {
    assert!(parse_turn_response("the oracle mumbles {").is_err());
}

#[test]
fn test_oversized_inventory_is_accepted_unclamped() {
    // The inventory cap lives in the oracle's instructions; the client takes
    // what it is given.
    let items: Vec<_> = (0..12)
        .map(|i| json!({ "name": format!("trinket {i}"), "description": "A trinket." }))
        .collect();
    let raw = json!({
        "story": "Your pack bulges.",
        "inventory": items,
        "choices": [],
        "isGameOver": false,
        "imagePrompt": "An overstuffed pack.",
        "health": 100
    })
    .to_string();

    let state = parse_turn_response(&raw).expect("oversized inventory passes through");
    assert_eq!(state.inventory.len(), 12);
    assert!(state.inventory.len() > MAX_INVENTORY_SIZE);
}

#[test]
fn test_terminal_reply_with_choices_is_accepted_verbatim() {
    // Merge does not enforce the terminal-implies-no-choices invariant;
    // presentation suppresses the choices instead.
    let raw = json!({
        "story": "The dragon's flame washes over you.",
        "inventory": [],
        "choices": [{ "text": "Flee", "prompt": "Flee" }],
        "isGameOver": true,
        "imagePrompt": "A wall of dragonfire.",
        "health": 0
    })
    .to_string();

    let state = parse_turn_response(&raw).expect("terminal reply with choices still validates");
    assert!(state.is_game_over);
    assert_eq!(state.choices.len(), 1);
}

#[test]
fn test_fallback_state_shape() {
    let state = fallback_state();
    assert!(state.is_game_over);
    assert!(state.inventory.is_empty());
    assert!(state.choices.is_empty());
    assert_eq!(state.health, 100);
    assert_eq!(state.status, None);
    assert_eq!(state.combat_state, None);
    assert!(state.story.contains("connection to the story has been lost"));
}

// --- Turn request builder ----------------------------------------------------

#[test]
fn test_new_game_request_carries_only_difficulty_and_guideline() {
    let request = TurnRequest::build(None, None, Difficulty::Hard);
    assert!(request.prompt.contains("Start a new fantasy adventure"));
    assert!(request.prompt.contains("Hard difficulty"));
    assert!(request.prompt.contains("15+ steps"));
    assert!(!request.prompt.contains("Player state"));
}

#[test]
fn test_mid_game_request_summarizes_the_snapshot() {
    let mut state = parse_turn_response(&turn_response_fixture()).unwrap();
    state.combat_state = Some(CombatState {
        enemy_name: "Goblin Archer".to_string(),
        enemy_health: 12,
        max_enemy_health: 20,
    });

    let request = TurnRequest::build(Some(&state), Some("Open the door"), Difficulty::Medium);
    assert!(request.prompt.contains("Health is 92/100"));
    assert!(request.prompt.contains("[rusty sword, torch] (2/10 items)"));
    assert!(request.prompt.contains("The player's status is Blessed."));
    assert!(
        request
            .prompt
            .contains("in combat with a Goblin Archer (12/20 health)")
    );
    assert!(request.prompt.contains("The player chose: \"Open the door\""));
}

#[test]
fn test_mid_game_request_with_empty_inventory() {
    let mut state = parse_turn_response(&turn_response_fixture()).unwrap();
    state.inventory.clear();
    state.status = None;

    let request = TurnRequest::build(Some(&state), Some("Look around"), Difficulty::Easy);
    assert!(request.prompt.contains("Inventory is empty (0/10 items)"));
    assert!(!request.prompt.contains("The player's status is"));
    assert!(!request.prompt.contains("in combat"));
}

#[test]
fn test_combine_intent_is_flattened_free_text() {
    let items = vec!["stick".to_string(), "flint".to_string()];
    assert_eq!(
        TurnRequest::combine_intent(&items),
        "Attempt to combine the following items: stick, flint."
    );
}

// --- Save store and migrations -----------------------------------------------

#[test]
fn test_persist_load_round_trip() {
    let store = SessionStore::new(MemoryStorage::new());
    let state = parse_turn_response(&turn_response_fixture()).unwrap();

    store.persist(&state, Difficulty::Hard).unwrap();
    assert!(store.exists());

    let loaded = store.load_and_migrate().unwrap();
    assert_eq!(loaded.game_state, state);
    assert_eq!(loaded.difficulty, Difficulty::Hard);
}

#[test]
fn test_legacy_bare_save_with_string_inventory_migrates() {
    let storage = MemoryStorage::new();
    let legacy = fs::read_to_string("tests/dummy_legacy_save.json")
        .expect("Failed to read dummy legacy save JSON file");
    storage.write(SAVE_KEY, &legacy).unwrap();

    let store = SessionStore::new(storage);
    let loaded = store.load_and_migrate().unwrap();

    assert_eq!(loaded.difficulty, Difficulty::Medium);
    assert_eq!(loaded.game_state.health, 100);
    assert_eq!(loaded.game_state.status, None);
    assert_eq!(loaded.game_state.combat_state, None);
    assert_eq!(
        loaded.game_state.inventory,
        vec![
            InventoryItem {
                name: "sword".to_string(),
                description: LEGACY_ITEM_DESCRIPTION.to_string(),
            },
            InventoryItem {
                name: "shield".to_string(),
                description: LEGACY_ITEM_DESCRIPTION.to_string(),
            },
        ]
    );
}

#[test]
fn test_malformed_inventory_resets_to_empty() {
    let storage = MemoryStorage::new();
    let raw = json!({
        "gameState": {
            "story": "An old save.",
            "inventory": 42,
            "choices": [],
            "isGameOver": false,
            "imagePrompt": "Parchment.",
            "health": 70,
            "status": null,
            "combatState": null
        },
        "difficulty": "Easy"
    })
    .to_string();
    storage.write(SAVE_KEY, &raw).unwrap();

    let store = SessionStore::new(storage);
    let loaded = store.load_and_migrate().unwrap();
    assert!(loaded.game_state.inventory.is_empty());
    assert_eq!(loaded.game_state.health, 70);
    assert_eq!(loaded.difficulty, Difficulty::Easy);
}

#[test]
fn test_migrated_save_round_trips_stably() {
    let storage = MemoryStorage::new();
    let legacy = fs::read_to_string("tests/dummy_legacy_save.json").unwrap();
    storage.write(SAVE_KEY, &legacy).unwrap();

    let store = SessionStore::new(storage);
    let first = store.load_and_migrate().unwrap();
    store
        .persist(&first.game_state, first.difficulty)
        .unwrap();
    let second = store.load_and_migrate().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_corrupt_save_is_purged() {
    let storage = MemoryStorage::new();
    storage.write(SAVE_KEY, "}}} definitely not json").unwrap();

    let store = SessionStore::new(storage);
    assert!(store.exists());
    assert!(matches!(
        store.load_and_migrate(),
        Err(SaveError::Corrupt(_))
    ));
    assert!(!store.exists());
}

#[test]
fn test_loading_without_a_save_is_distinct_from_corruption() {
    let store = SessionStore::new(MemoryStorage::new());
    assert!(!store.exists());
    assert!(matches!(store.load_and_migrate(), Err(SaveError::NoSave)));
}

// --- Session engine ----------------------------------------------------------

#[tokio::test]
async fn test_start_and_choose_replace_state_wholesale() {
    let oracle = ScriptedOracle::new().reply(&turn_response_fixture()).reply(
        &json!({
            "story": "The cave swallows your torchlight.",
            "inventory": [],
            "choices": [{ "text": "Press on", "prompt": "Press on" }],
            "isGameOver": false,
            "imagePrompt": "A narrow passage.",
            "health": 80
        })
        .to_string(),
    );
    let mut engine = SessionEngine::new(oracle, MemoryStorage::new());
    assert_eq!(engine.phase(), Phase::NoGame);

    engine.start(Difficulty::Medium).await.unwrap();
    assert_eq!(engine.phase(), Phase::Active);
    assert_eq!(engine.state().unwrap().health, 92);

    engine.choose("Enter the cave").await.unwrap();
    let state = engine.state().unwrap();
    assert_eq!(state.health, 80);
    assert!(state.inventory.is_empty());
}

#[tokio::test]
async fn test_transport_failure_yields_fallback_and_ends_the_game() {
    let oracle = ScriptedOracle::new().transport_failure();
    let mut engine = SessionEngine::new(oracle, MemoryStorage::new());

    engine.start(Difficulty::Easy).await.unwrap();
    assert_eq!(engine.phase(), Phase::Ended);
    let state = engine.state().unwrap();
    assert!(state.is_game_over);
    assert_eq!(state.health, 100);
    assert!(state.inventory.is_empty());
    assert!(state.choices.is_empty());
    assert!(state.story.contains("connection to the story has been lost"));
}

#[tokio::test]
async fn test_choosing_before_starting_is_an_error() {
    let mut engine = SessionEngine::new(ScriptedOracle::new(), MemoryStorage::new());
    assert!(matches!(
        engine.choose("Go north").await,
        Err(AppError::Game(GameError::NoActiveGame))
    ));
}

#[tokio::test]
async fn test_combining_fewer_than_two_items_is_an_error() {
    let oracle = ScriptedOracle::new().reply(&turn_response_fixture());
    let mut engine = SessionEngine::new(oracle, MemoryStorage::new());
    engine.start(Difficulty::Medium).await.unwrap();

    let items = vec!["torch".to_string()];
    assert!(matches!(
        engine.combine(&items).await,
        Err(AppError::Game(GameError::InvalidCombination(_)))
    ));
}

#[tokio::test]
async fn test_save_load_reset_cycle() {
    let oracle = ScriptedOracle::new().reply(&turn_response_fixture());
    let mut engine = SessionEngine::new(oracle, MemoryStorage::new());

    engine.start(Difficulty::Hard).await.unwrap();
    assert!(!engine.save_exists());
    engine.save().unwrap();
    assert!(engine.save_exists());

    let saved_story = engine.state().unwrap().story.clone();
    engine.load().unwrap();
    assert_eq!(engine.state().unwrap().story, saved_story);
    assert_eq!(engine.difficulty(), Difficulty::Hard);

    engine.reset().unwrap();
    assert_eq!(engine.phase(), Phase::NoGame);
    assert!(engine.state().is_none());
    assert!(!engine.save_exists());
}

#[tokio::test]
async fn test_starting_a_new_game_discards_the_old_save() {
    let oracle = ScriptedOracle::new()
        .reply(&turn_response_fixture())
        .reply(&turn_response_fixture());
    let mut engine = SessionEngine::new(oracle, MemoryStorage::new());

    engine.start(Difficulty::Easy).await.unwrap();
    engine.save().unwrap();
    assert!(engine.save_exists());

    engine.start(Difficulty::Hard).await.unwrap();
    assert!(!engine.save_exists());
}

#[tokio::test]
async fn test_corrupt_save_surfaces_and_purges_through_the_engine() {
    let storage = MemoryStorage::new();
    storage.write(SAVE_KEY, "\u{0}garbage").unwrap();
    let mut engine = SessionEngine::new(ScriptedOracle::new(), storage);

    assert!(matches!(
        engine.load(),
        Err(AppError::Save(SaveError::Corrupt(_)))
    ));
    assert_eq!(engine.phase(), Phase::NoGame);
    assert!(!engine.save_exists());
}

#[tokio::test]
async fn test_stale_scene_image_is_discarded() {
    let oracle = ScriptedOracle::new()
        .reply(&turn_response_fixture())
        .reply(&turn_response_fixture());
    let mut engine = SessionEngine::new(oracle, MemoryStorage::new());

    engine.start(Difficulty::Medium).await.unwrap();
    let (ticket_a, _prompt_a) = engine.begin_scene_image().expect("first turn queues an image");

    // A second turn begins before the first image resolves.
    engine.choose("Enter the cave").await.unwrap();

    assert!(!engine.apply_scene_image(ticket_a, Some(vec![1, 2, 3])));
    assert!(engine.scene_image().is_none());

    let (ticket_b, _prompt_b) = engine.begin_scene_image().expect("second turn queues an image");
    assert!(engine.apply_scene_image(ticket_b, Some(vec![9])));
    assert_eq!(engine.scene_image(), Some(&[9u8][..]));
}

#[tokio::test]
async fn test_terminal_state_queues_no_image_and_clears_the_current_one() {
    let oracle = ScriptedOracle::new().reply(&turn_response_fixture()).reply(
        &json!({
            "story": "Your wounds overcome you.",
            "inventory": [],
            "choices": [],
            "isGameOver": true,
            "imagePrompt": "A fading battlefield.",
            "health": 0
        })
        .to_string(),
    );
    let mut engine = SessionEngine::new(oracle, MemoryStorage::new());

    engine.start(Difficulty::Medium).await.unwrap();
    let (ticket, _prompt) = engine.begin_scene_image().unwrap();
    assert!(engine.apply_scene_image(ticket, Some(vec![7])));
    assert!(engine.scene_image().is_some());

    engine.choose("Fight on").await.unwrap();
    assert_eq!(engine.phase(), Phase::Ended);
    assert!(engine.scene_image().is_none());
    assert!(engine.begin_scene_image().is_none());
}

#[tokio::test]
async fn test_scripted_image_flows_through_the_oracle_capability() {
    let oracle = ScriptedOracle::new().image(Some(vec![1, 1, 2, 3]));
    let image = oracle
        .request_scene_image("A cave mouth", AspectRatio::Landscape)
        .await;
    assert_eq!(image, Some(vec![1, 1, 2, 3]));

    // Script exhausted: no image available, never an error.
    let none = oracle
        .request_scene_image("A cave mouth", AspectRatio::Square)
        .await;
    assert_eq!(none, None);
}

// --- Settings ----------------------------------------------------------------

#[test]
fn test_speech_settings_default_when_absent() {
    let storage = MemoryStorage::new();
    let settings = SpeechSettings::load(&storage).unwrap();
    assert_eq!(settings, SpeechSettings::default());
}

#[test]
fn test_speech_settings_merge_field_by_field() {
    let storage = MemoryStorage::new();
    storage
        .write(SETTINGS_KEY, r#"{ "enabled": true, "rate": 1.5 }"#)
        .unwrap();

    let settings = SpeechSettings::load(&storage).unwrap();
    assert!(settings.enabled);
    assert_eq!(settings.rate, 1.5);
    // Missing fields keep their defaults.
    assert_eq!(settings.voice_uri, None);
    assert_eq!(settings.pitch, 1.0);
}

#[test]
fn test_speech_settings_round_trip() {
    let storage = MemoryStorage::new();
    let settings = SpeechSettings {
        enabled: true,
        voice_uri: Some("en-GB-standard".to_string()),
        rate: 0.9,
        pitch: 1.2,
    };
    settings.save(&storage).unwrap();
    assert_eq!(SpeechSettings::load(&storage).unwrap(), settings);
}

#[test]
fn test_unreadable_settings_blob_falls_back_to_defaults() {
    let storage = MemoryStorage::new();
    storage.write(SETTINGS_KEY, "!!!").unwrap();
    assert_eq!(
        SpeechSettings::load(&storage).unwrap(),
        SpeechSettings::default()
    );
}

// --- File storage -------------------------------------------------------------

#[test]
fn test_file_storage_crud() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());

    assert!(!storage.contains("slot"));
    assert_eq!(storage.read("slot").unwrap(), None);

    storage.write("slot", "{\"a\":1}").unwrap();
    assert!(storage.contains("slot"));
    assert_eq!(storage.read("slot").unwrap().as_deref(), Some("{\"a\":1}"));

    storage.write("slot", "{\"a\":2}").unwrap();
    assert_eq!(storage.read("slot").unwrap().as_deref(), Some("{\"a\":2}"));

    storage.remove("slot").unwrap();
    assert!(!storage.contains("slot"));

    // Removing a missing key is not an error.
    storage.remove("slot").unwrap();
}

#[test]
fn test_file_storage_backed_store_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(FileStorage::new(dir.path()));
    let state = parse_turn_response(&turn_response_fixture()).unwrap();

    store.persist(&state, Difficulty::Medium).unwrap();
    let loaded = store.load_and_migrate().unwrap();
    assert_eq!(loaded.game_state, state);
    assert_eq!(loaded.difficulty, Difficulty::Medium);
}
