//! WASM API exports for JavaScript interop
//!
//! This module provides `#[wasm_bindgen]` exports for driving a viewer from
//! JavaScript. It is only compiled when targeting wasm32.

#![cfg(target_arch = "wasm32")]

use parking_lot::Mutex;
use std::sync::Arc;
use wasm_bindgen::prelude::*;

use crate::buffers::DecodedPayload;
use crate::runtime::{ViewerHandle, ViewerOptions, run_viewer};

fn decode(json: &str) -> Result<DecodedPayload, JsValue> {
    DecodedPayload::from_json(json)
        .map_err(|e| JsValue::from_str(&format!("Failed to decode scene payload: {e:?}")))
}

/// JavaScript-accessible viewer wrapper
#[wasm_bindgen]
pub struct JsViewer {
    /// Payload waiting for `start`
    pending: Option<DecodedPayload>,
    canvas_id: String,
    handle: Option<ViewerHandle>,
    /// JSON of the hovered object, `None` when nothing is hovered
    hovered: Arc<Mutex<Option<String>>>,
}

#[wasm_bindgen]
impl JsViewer {
    /// Create a viewer from a `{scene, buffers, frames?}` JSON payload.
    ///
    /// # Arguments
    /// * `json` - payload with base64 encoded buffers
    /// * `canvas_id` - HTML canvas element ID (without #)
    #[wasm_bindgen(constructor)]
    pub fn new(json: &str, canvas_id: &str) -> Result<JsViewer, JsValue> {
        Ok(JsViewer {
            pending: Some(decode(json)?),
            canvas_id: canvas_id.to_string(),
            handle: None,
            hovered: Arc::new(Mutex::new(None)),
        })
    }

    /// Start the render loop. Only the first call has an effect.
    #[wasm_bindgen]
    pub fn start(&mut self) {
        let Some(payload) = self.pending.take() else {
            web_sys::console::warn_1(&"Viewer already started".into());
            return;
        };
        let hovered = self.hovered.clone();
        let options = ViewerOptions::new().on_hover(move |spec| {
            *hovered.lock() = spec.and_then(|s| serde_json::to_string(s).ok());
        });
        self.handle = Some(run_viewer(payload, &self.canvas_id, options));
    }

    /// Replace the displayed scene with a new payload.
    #[wasm_bindgen]
    pub fn update(&mut self, json: &str) -> Result<(), JsValue> {
        let payload = decode(json)?;
        match &self.handle {
            Some(handle) => handle.update_payload(payload),
            None => self.pending = Some(payload),
        }
        Ok(())
    }

    /// Stop rendering and release the app.
    #[wasm_bindgen]
    pub fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.dispose();
        }
    }

    /// The hovered object as JSON, if any.
    #[wasm_bindgen(getter)]
    pub fn hovered(&self) -> Option<String> {
        self.hovered.lock().clone()
    }

    #[wasm_bindgen(getter)]
    pub fn canvas_id(&self) -> String {
        self.canvas_id.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn is_started(&self) -> bool {
        self.handle.is_some()
    }
}
