//! WASM bindings for `dualdiff_core`.
//!
//! Each binding is a thin wrapper over an `anyhow`-returning helper so the
//! logic stays testable off the wasm target.

mod babylonian;
mod expression;
mod newton;

pub use babylonian::{babylonian_manual, babylonian_sqrt};
pub use expression::WasmExpression;
pub use newton::solve_root;

use wasm_bindgen::JsValue;

pub(crate) fn to_js_error(context: &str, err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{}: {:#}", context, err))
}

/// `undefined`/`null` selects the defaults.
pub(crate) fn settings_from_js<T>(value: JsValue) -> anyhow::Result<T>
where
    T: Default + serde::de::DeserializeOwned,
{
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| anyhow::anyhow!("Invalid settings: {}", e))
}
