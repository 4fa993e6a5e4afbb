// src/oracle.rs
//
// The generative model behind the game, treated as an opaque oracle with two
// capabilities: advance the story by one turn, and render a scene image.
// Nothing unvalidated crosses this boundary.

use crate::error::OracleError;
use crate::game_state::GameState;
use crate::turn::{TurnRequest, response_schema, system_instruction};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateImageRequestArgs, Image, ImageModel,
        ImageResponseFormat, ImageSize, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, warn};
use serde_json::Value;
use tokio::time::{Duration, timeout};

const TEMPERATURE: f32 = 0.8;
const TOP_P: f32 = 0.9;
const TURN_TIMEOUT: Duration = Duration::from_secs(120);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Requested shape for scene images. The image API offers a fixed size grid,
/// so each ratio maps onto the nearest size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    Square,
    #[default]
    Landscape,
    Portrait,
}

impl AspectRatio {
    fn image_size(self) -> ImageSize {
        match self {
            AspectRatio::Square => ImageSize::S1024x1024,
            AspectRatio::Landscape => ImageSize::S1792x1024,
            AspectRatio::Portrait => ImageSize::S1024x1792,
        }
    }
}

/// Capability interface for the generative model.
///
/// `request_next_state` never fails outward: any transport or shape problem
/// degrades into the fixed fallback state. `request_scene_image` degrades to
/// `None`, which callers treat as "no image available".
#[allow(async_fn_in_trait)]
pub trait Oracle {
    async fn request_next_state(&self, request: &TurnRequest) -> GameState;
    async fn request_scene_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Option<Vec<u8>>;
}

/// The fixed terminal state substituted when the oracle is unreachable or
/// answers with an invalid shape.
pub fn fallback_state() -> GameState {
    GameState {
        story: "The ancient magicks fizzle and pop, and the world fades to static. It seems \
                the connection to the story has been lost. Please try starting a new game."
            .to_string(),
        inventory: Vec::new(),
        choices: Vec::new(),
        is_game_over: true,
        image_prompt: "A glitchy, pixelated screen with arcane symbols, digital error."
            .to_string(),
        health: 100,
        status: None,
        combat_state: None,
    }
}

/// Validates a raw turn reply and produces the next state.
///
/// Required shape: story (string), inventory (array of {name, description}
/// string pairs — one bad element rejects the whole reply), choices (array,
/// sub-fields permissive), isGameOver (bool), health (number). A missing
/// status or combatState defaults to null instead of rejecting, so replies
/// from older schema revisions keep working. Acceptance is atomic.
pub fn parse_turn_response(raw: &str) -> Result<GameState, OracleError> {
    let mut value: Value = serde_json::from_str(raw.trim())?;
    let object = value
        .as_object()
        .ok_or_else(|| OracleError::InvalidResponse("reply is not a JSON object".to_string()))?;

    if !object.get("story").is_some_and(Value::is_string) {
        return Err(OracleError::InvalidResponse(
            "missing or non-string story".to_string(),
        ));
    }
    let inventory_ok = object
        .get("inventory")
        .and_then(Value::as_array)
        .is_some_and(|items| {
            items.iter().all(|item| {
                item.get("name").is_some_and(Value::is_string)
                    && item.get("description").is_some_and(Value::is_string)
            })
        });
    if !inventory_ok {
        return Err(OracleError::InvalidResponse(
            "missing or malformed inventory".to_string(),
        ));
    }
    if !object.get("choices").is_some_and(Value::is_array) {
        return Err(OracleError::InvalidResponse(
            "missing or non-array choices".to_string(),
        ));
    }
    if !object.get("isGameOver").is_some_and(Value::is_boolean) {
        return Err(OracleError::InvalidResponse(
            "missing or non-boolean isGameOver".to_string(),
        ));
    }
    if !object.get("health").is_some_and(Value::is_number) {
        return Err(OracleError::InvalidResponse(
            "missing or non-numeric health".to_string(),
        ));
    }

    let object = value
        .as_object_mut()
        .ok_or_else(|| OracleError::InvalidResponse("reply is not a JSON object".to_string()))?;
    object.entry("status").or_insert(Value::Null);
    object.entry("combatState").or_insert(Value::Null);

    Ok(serde_json::from_value(value)?)
}

/// Live oracle over the OpenAI API: chat completions with a strict JSON
/// schema for turns, the images endpoint for scenes.
pub struct GameMaster {
    client: Client<OpenAIConfig>,
    model: String,
}

impl GameMaster {
    pub fn new(api_key: String, model: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    async fn next_state(&self, request: &TurnRequest) -> Result<GameState, OracleError> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_instruction())
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()?
                .into(),
        ];
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .temperature(TEMPERATURE)
            .top_p(TOP_P)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some("The updated adventure state after one turn.".to_string()),
                    name: "game_state".to_string(),
                    schema: Some(response_schema()),
                    strict: Some(true),
                },
            })
            .build()?;

        let response = timeout(TURN_TIMEOUT, self.client.chat().create(chat_request))
            .await
            .map_err(|_| OracleError::Timeout)??;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(OracleError::NoMessageFound)?;

        parse_turn_response(&content)
    }

    async fn scene_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Vec<u8>, OracleError> {
        let image_request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(ImageModel::DallE3)
            .n(1)
            .response_format(ImageResponseFormat::B64Json)
            .size(aspect_ratio.image_size())
            .build()?;

        let response = timeout(IMAGE_TIMEOUT, self.client.images().create(image_request))
            .await
            .map_err(|_| OracleError::Timeout)??;

        let image = response
            .data
            .into_iter()
            .next()
            .ok_or(OracleError::NoMessageFound)?;

        match image.as_ref() {
            Image::B64Json { b64_json, .. } => BASE64
                .decode(b64_json.as_bytes())
                .map_err(|e| OracleError::InvalidResponse(e.to_string())),
            Image::Url { .. } => Err(OracleError::InvalidResponse(
                "expected a base64 image payload".to_string(),
            )),
        }
    }
}

impl Oracle for GameMaster {
    async fn request_next_state(&self, request: &TurnRequest) -> GameState {
        match self.next_state(request).await {
            Ok(state) => state,
            Err(err) => {
                warn!("Turn request failed, substituting fallback state: {err}");
                fallback_state()
            }
        }
    }

    async fn request_scene_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Option<Vec<u8>> {
        match self.scene_image(prompt, aspect_ratio).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!("Scene image unavailable: {err}");
                None
            }
        }
    }
}
