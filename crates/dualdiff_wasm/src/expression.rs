use anyhow::{Context, Result};
use dualdiff_core::expression::Expression;
use wasm_bindgen::prelude::*;

use crate::to_js_error;

#[wasm_bindgen]
pub struct WasmExpression {
    expression: Expression,
}

pub(crate) fn build_expression(
    source: &str,
    variable: &str,
    param_names: &[String],
    params: Vec<f64>,
) -> Result<Expression> {
    Expression::compile(source, variable, param_names, params)
        .with_context(|| format!("Failed to compile \"{}\"", source))
}

#[wasm_bindgen]
impl WasmExpression {
    #[wasm_bindgen(constructor)]
    pub fn new(
        source: &str,
        variable: &str,
        param_names: Vec<String>,
        params: Vec<f64>,
    ) -> Result<WasmExpression, JsValue> {
        console_error_panic_hook::set_once();
        let expression = build_expression(source, variable, &param_names, params)
            .map_err(|e| to_js_error("Invalid expression", e))?;
        Ok(WasmExpression { expression })
    }

    pub fn value(&self, x: f64) -> Result<f64, JsValue> {
        self.expression
            .value(x)
            .map_err(|e| to_js_error("Evaluation failed", e.into()))
    }

    pub fn derivative(&self, x: f64) -> Result<f64, JsValue> {
        self.expression
            .derivative(x)
            .map_err(|e| to_js_error("Differentiation failed", e.into()))
    }

    /// Returns `[f(x), f'(x)]`.
    pub fn value_and_derivative(&self, x: f64) -> Result<Vec<f64>, JsValue> {
        let (value, slope) = self
            .expression
            .value_and_derivative(x)
            .map_err(|e| to_js_error("Differentiation failed", e.into()))?;
        Ok(vec![value, slope])
    }
}

#[cfg(test)]
mod tests {
    use super::build_expression;

    #[test]
    fn build_expression_wraps_compile_errors() {
        let err = build_expression("x + y", "x", &[], Vec::new())
            .err()
            .expect("unknown symbol should fail");
        let message = format!("{err:#}");
        assert!(message.contains("Failed to compile \"x + y\""));
        assert!(message.contains("unknown variable or parameter: y"));
    }

    #[test]
    fn build_expression_binds_parameters() {
        let expression =
            build_expression("k * x^3", "x", &["k".to_string()], vec![2.0]).expect("expression");
        assert_eq!(expression.value_and_derivative(1.0), Ok((2.0, 6.0)));
    }
}
