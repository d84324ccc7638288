use anyhow::Result;
use dualdiff_core::newton::{try_solve_root, NewtonSettings, RootResult};
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

use crate::expression::build_expression;
use crate::{settings_from_js, to_js_error};

pub(crate) fn find_root(
    source: &str,
    variable: &str,
    initial_guess: f64,
    settings: NewtonSettings,
) -> Result<RootResult> {
    let expression = build_expression(source, variable, &[], Vec::new())?;
    try_solve_root(|x| expression.eval_dual(x), initial_guess, settings)
}

/// Newton root of a single-variable expression, serialized as `RootResult`.
#[wasm_bindgen]
pub fn solve_root(
    source: &str,
    variable: &str,
    initial_guess: f64,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let settings: NewtonSettings =
        settings_from_js(settings).map_err(|e| to_js_error("Root solve failed", e))?;
    let result = find_root(source, variable, initial_guess, settings)
        .map_err(|e| to_js_error("Root solve failed", e))?;
    to_value(&result).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
