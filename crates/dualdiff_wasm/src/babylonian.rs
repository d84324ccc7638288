use dualdiff_core::autodiff::Dual;
use dualdiff_core::babylonian::{babylonian, babylonian_with_derivative, BabylonianSettings};
use wasm_bindgen::prelude::*;

use crate::{settings_from_js, to_js_error};

/// `[sqrt(x), d/dx sqrt(x)]` through the dual-number path.
#[wasm_bindgen]
pub fn babylonian_sqrt(x: f64, settings: JsValue) -> Result<Vec<f64>, JsValue> {
    let settings: BabylonianSettings =
        settings_from_js(settings).map_err(|e| to_js_error("Babylonian sqrt failed", e))?;
    let result = babylonian(Dual::variable(x), settings);
    Ok(vec![result.value(), result.epsilon()])
}

/// `[sqrt(x), d/dx sqrt(x)]` through the hand-derived recurrence.
#[wasm_bindgen]
pub fn babylonian_manual(x: f64, settings: JsValue) -> Result<Vec<f64>, JsValue> {
    let settings: BabylonianSettings =
        settings_from_js(settings).map_err(|e| to_js_error("Babylonian sqrt failed", e))?;
    let (value, slope) = babylonian_with_derivative(x, settings);
    Ok(vec![value, slope])
}
