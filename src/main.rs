use anyhow::{Context, Result};
use fateweaver::engine::{Phase, SessionEngine};
use fateweaver::game_state::{Difficulty, GameState};
use fateweaver::oracle::{AspectRatio, GameMaster, Oracle};
use fateweaver::settings::{Settings, SpeechSettings};
use fateweaver::storage::{FileStorage, default_data_dir};
use fateweaver::{logging, storage::Storage};
use std::fs;
use std::io::{self, Write};
use std::str::FromStr;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = logging::init() {
        eprintln!("Logging unavailable: {err}");
    }

    let settings = Settings::load().context("Failed to load settings")?;
    let api_key = settings
        .openai_api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .context("No API key configured. Set OPENAI_API_KEY or add it to settings.json.")?;

    let storage = FileStorage::new(default_data_dir());
    let narration = SpeechSettings::load(&storage)?;

    let oracle = GameMaster::new(api_key, settings.model.clone());
    let mut engine = SessionEngine::new(oracle, storage);

    println!("=== FATEWEAVER ===");
    println!("A fantasy adventure, told one turn at a time.\n");
    if narration.enabled {
        println!("(Narration is enabled in your settings; this terminal build prints only.)\n");
    }

    loop {
        match engine.phase() {
            Phase::NoGame => {
                if !start_menu(&mut engine).await? {
                    break;
                }
            }
            Phase::Active => {
                if !play_turn(&mut engine).await? {
                    break;
                }
            }
            Phase::Ended => {
                println!("\n--- THE END ---\n");
                if !start_menu(&mut engine).await? {
                    break;
                }
            }
            Phase::Awaiting => unreachable!("no turn is in flight between loop iterations"),
        }
    }

    println!("Farewell, adventurer.");
    Ok(())
}

/// Start-screen prompt. Returns false when the player quits.
async fn start_menu<S: Storage>(engine: &mut SessionEngine<GameMaster, S>) -> Result<bool> {
    println!("Start a new game: [e]asy, [m]edium, [h]ard");
    if engine.save_exists() {
        println!("Or [l]oad your saved game.");
    }
    println!("Or [q]uit.");

    let input = read_line("> ")?;
    match input.trim().to_lowercase().as_str() {
        "e" | "easy" => new_game(engine, Difficulty::Easy).await?,
        "m" | "medium" => new_game(engine, Difficulty::Medium).await?,
        "h" | "hard" => new_game(engine, Difficulty::Hard).await?,
        "l" | "load" => match engine.load() {
            Ok(_) => {
                render(engine.state());
                fetch_scene_image(engine).await;
            }
            Err(err) => println!("Could not load the saved game: {err}"),
        },
        "q" | "quit" => return Ok(false),
        other => {
            // Allow the full difficulty names as typed.
            if let Ok(difficulty) = Difficulty::from_str(other) {
                new_game(engine, difficulty).await?;
            } else {
                println!("Unrecognized option.");
            }
        }
    }
    Ok(true)
}

async fn new_game<S: Storage>(
    engine: &mut SessionEngine<GameMaster, S>,
    difficulty: Difficulty,
) -> Result<()> {
    println!("\nThe threads of fate begin to weave...\n");
    engine.start(difficulty).await?;
    render(engine.state());
    fetch_scene_image(engine).await;
    Ok(())
}

/// One prompt/turn cycle during an active game. Returns false on quit.
async fn play_turn<S: Storage>(engine: &mut SessionEngine<GameMaster, S>) -> Result<bool> {
    println!("\nPick a choice number, or: save, load, new, quit");
    let input = read_line("> ")?;
    let input = input.trim();

    match input.to_lowercase().as_str() {
        "save" => {
            match engine.save() {
                Ok(()) => println!("Game saved."),
                Err(err) => println!("Could not save: {err}"),
            }
            return Ok(true);
        }
        "load" => {
            match engine.load() {
                Ok(_) => {
                    render(engine.state());
                    fetch_scene_image(engine).await;
                }
                Err(err) => println!("Could not load the saved game: {err}"),
            }
            return Ok(true);
        }
        "new" => {
            engine.reset()?;
            return Ok(true);
        }
        "quit" | "q" => return Ok(false),
        _ => {}
    }

    let Ok(index) = input.parse::<usize>() else {
        println!("Type the number of a choice.");
        return Ok(true);
    };
    let Some(choice) = engine
        .state()
        .and_then(|state| state.choices.get(index.wrapping_sub(1)))
    else {
        println!("No such choice.");
        return Ok(true);
    };

    // Combine choices carry their item list; everything else replays the
    // choice prompt verbatim.
    let result = if choice.is_item_combine && choice.items_to_combine.len() >= 2 {
        let items = choice.items_to_combine.clone();
        engine.combine(&items).await
    } else {
        let action = choice.prompt.clone();
        engine.choose(&action).await
    };

    match result {
        Ok(_) => {
            render(engine.state());
            fetch_scene_image(engine).await;
        }
        Err(err) => {
            println!("Something went wrong: {err}");
            println!("Type 'new' to start over.");
        }
    }
    Ok(true)
}

/// Prints the current scene: story, vitals, inventory and numbered choices.
/// Choices are suppressed for terminal states even if the oracle sent some.
fn render(state: Option<&GameState>) {
    let Some(state) = state else {
        return;
    };

    println!("\n{}\n", state.story);
    print!("Health: {}/100", state.health);
    if let Some(status) = &state.status {
        print!("  |  Status: {status}");
    }
    if let Some(combat) = &state.combat_state {
        print!(
            "  |  Fighting: {} ({}/{})",
            combat.enemy_name, combat.enemy_health, combat.max_enemy_health
        );
    }
    println!();

    if state.inventory.is_empty() {
        println!("Inventory: empty");
    } else {
        println!("Inventory:");
        for item in &state.inventory {
            println!("  - {}: {}", item.name, item.description);
        }
    }

    if !state.is_game_over {
        println!();
        for (i, choice) in state.choices.iter().enumerate() {
            println!("  [{}] {}", i + 1, choice.text);
        }
    }
}

/// Fetches and stores the scene image for the latest turn, if one is due.
/// Failures degrade to "no image"; a stale result is dropped by the engine.
async fn fetch_scene_image<S: Storage>(engine: &mut SessionEngine<GameMaster, S>) {
    let Some((ticket, prompt)) = engine.begin_scene_image() else {
        return;
    };
    let image = engine
        .oracle()
        .request_scene_image(&prompt, AspectRatio::Landscape)
        .await;
    if engine.apply_scene_image(ticket, image) {
        if let Some(bytes) = engine.scene_image() {
            let path = default_data_dir().join("scene.png");
            match fs::write(&path, bytes) {
                Ok(()) => println!("(Scene image saved to {})", path.display()),
                Err(err) => log::warn!("Could not write scene image: {err}"),
            }
        }
    }
}

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
