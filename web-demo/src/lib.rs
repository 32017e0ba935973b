#![allow(clippy::unused_unit)] // weird clippy bug with wasm-bindgen
use algebra_quest::{Answer, Frontend, Game, GenerationReport, QuestConfig, QuestGenerator, Seed};
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;

#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Collects the game's events until the page asks for them.
#[derive(Default)]
struct Events(Vec<Value>);

impl Frontend for Events {
    fn on_generated(&mut self, report: &GenerationReport) {
        self.0.push(json!({
            "event": "generated",
            "seed": report.seed.to_string(),
            "attempts": report.attempts,
            "classes": report.classes,
            "terms": report.terms,
            "ms": report.elapsed.as_millis() as u64,
        }));
    }

    fn on_start_game(&mut self) {
        self.0.push(json!({ "event": "start_game" }));
    }

    fn on_start_level(&mut self, level: usize, hint: &str, question: &str, suggestions: &[String]) {
        self.0.push(json!({
            "event": "start_level",
            "level": level,
            "hint": hint,
            "question": question,
            "suggestions": suggestions,
        }));
    }

    fn on_error(&mut self, message: &str) {
        self.0.push(json!({ "event": "error", "message": message }));
    }

    fn on_validate_answer(&mut self, answer: &str, valid: bool, score: usize) {
        self.0.push(json!({
            "event": "validate_answer",
            "answer": answer,
            "valid": valid,
            "score": score,
        }));
    }

    fn on_end_level(&mut self, passed: bool, valid_suggestions: &[bool]) {
        self.0.push(json!({
            "event": "end_level",
            "passed": passed,
            "valid_suggestions": valid_suggestions,
        }));
    }

    fn on_end_game(&mut self, win: bool) {
        self.0.push(json!({ "event": "end_game", "win": win }));
    }
}

#[wasm_bindgen]
pub struct WebGame {
    game: Game<Events>,
}

#[wasm_bindgen]
impl WebGame {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebGame {
        let generator = QuestGenerator::new(QuestConfig::web());
        WebGame {
            game: Game::new(generator, Events::default()),
        }
    }

    /// Starts a quest from an encoded seed, or a random one. Returns the
    /// events as a JSON array.
    pub fn generate(&mut self, seed: Option<String>) -> String {
        let seed = match seed.map(|s| s.parse::<Seed>()).transpose() {
            Ok(seed) => seed.unwrap_or_else(Seed::random),
            Err(err) => return self.error(err),
        };
        match self.game.generate(seed) {
            Ok(()) => log::info!("Generated quest {seed}"),
            Err(err) => {
                log::error!("{err}");
                return self.error(err);
            }
        }
        self.drain()
    }

    pub fn validate_answer(&mut self, index: usize) -> String {
        self.validate(Answer::Suggestion(index))
    }

    pub fn validate_expression(&mut self, text: &str) -> String {
        self.validate(Answer::Expression(text.to_string()))
    }

    fn validate(&mut self, answer: Answer) -> String {
        if let Err(err) = self.game.validate_answer(answer) {
            return self.error(err);
        }
        self.drain()
    }

    fn error(&mut self, err: impl std::fmt::Display) -> String {
        self.game.frontend_mut().on_error(&err.to_string());
        self.drain()
    }

    fn drain(&mut self) -> String {
        let events = std::mem::take(&mut self.game.frontend_mut().0);
        Value::Array(events).to_string()
    }
}

impl Default for WebGame {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    wasm_logger::init(Default::default());
    console_error_panic_hook::set_once();
    log::info!("wasm initialized");
}
