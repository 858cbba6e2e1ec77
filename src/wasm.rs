//! Browser facade
//!
//! The host owns the canvas, input and audio. It calls `tick` once per
//! animation frame and renders from `snapshot`.

use wasm_bindgen::prelude::*;

use crate::sim::{ArenaBounds, TickInput, World, tick};
use crate::{Catalog, Tuning};

fn init_logging() {
    console_error_panic_hook::set_once();
    // A second world on the same page finds the logger already installed
    let _ = console_log::init_with_level(log::Level::Info);
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct WasmWorld {
    world: World,
}

#[wasm_bindgen]
impl WasmWorld {
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, width: f32, height: f32) -> WasmWorld {
        init_logging();
        log::info!("Brickfall starting...");
        WasmWorld {
            world: World::with_canvas(seed, Tuning::default(), width, height),
        }
    }

    /// World with balance overrides from a partial tuning JSON
    pub fn with_tuning(seed: u64, width: f32, height: f32, tuning_json: &str) -> Result<WasmWorld, JsValue> {
        init_logging();
        let tuning = Tuning::from_json(tuning_json).map_err(|e| js_error(format!("{e:#}")))?;
        Ok(WasmWorld {
            world: World::with_canvas(seed, tuning, width, height),
        })
    }

    /// Pick the launched ball kind by catalog name. Returns false for unknown names.
    pub fn set_ball(&mut self, name: &str) -> bool {
        match Catalog::builtin().get(name) {
            Some(kind) => {
                self.world.set_loadout(kind.clone());
                true
            }
            None => {
                log::warn!("Unknown ball kind {name}");
                false
            }
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        let bounds = ArenaBounds::from_canvas(width, height, &self.world.tuning);
        self.world.resize(bounds);
    }

    pub fn toggle_pause(&mut self) {
        let input = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut self.world, &input, 0.0);
    }

    /// Advance one frame and return the events as a JSON array
    pub fn tick(&mut self, dt: f32, owner_x: f32, owner_y: f32, aim: f32, shoot: bool) -> Result<String, JsValue> {
        let input = TickInput {
            owner_pos: Some(glam::Vec2::new(owner_x, owner_y)),
            aim: Some(aim),
            shoot,
            ..Default::default()
        };
        let events = tick(&mut self.world, &input, dt);
        serde_json::to_string(&events).map_err(js_error)
    }

    /// Balls, bricks, player and progress as JSON
    pub fn snapshot(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.world.snapshot()).map_err(js_error)
    }
}
