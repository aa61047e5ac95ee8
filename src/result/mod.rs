//! Binding of service fit statistics to the original model's ordering.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BindResult, ResultError};
use crate::model::{CircuitModel, ElementKind};

/// Fit statistics for one parameter of one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterFit {
    /// Parameter index within the element.
    pub index: usize,
    /// Canonical parameter name, e.g. `R` or `α`.
    pub name: String,
    /// Fitted value.
    pub value: f64,
    /// Standard deviation reported by the fitter.
    pub error: f64,
    /// Confidence-like metric in [0,1].
    pub significance: f64,
    /// Physical unit as reported by the service.
    pub unit: String,
}

/// Fit statistics for one element, parameters in index order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementFit {
    /// Element name, e.g. `R0`.
    pub name: String,
    /// Element kind.
    pub kind: ElementKind,
    /// Per-parameter statistics, ordered by parameter index.
    pub parameters: Vec<ParameterFit>,
}

/// Aggregate error metrics of a fit, copied verbatim from the service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateErrors {
    /// Largest impedance error over the fitted samples.
    pub impedance_error_max: f64,
    /// Mean impedance error.
    pub impedance_error_mean: f64,
    /// Largest phase error.
    pub phase_error_max: f64,
    /// Mean phase error.
    pub phase_error_mean: f64,
    /// Combined error figure.
    pub overall_error: f64,
}

/// A complete fit result bound to the original model's ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Per-element statistics in the model's canonical element order.
    pub elements: Vec<ElementFit>,
    /// Aggregate metrics.
    pub overall: AggregateErrors,
}

impl FitResult {
    /// Look up an element's statistics by name.
    pub fn element(&self, name: &str) -> Option<&ElementFit> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Look up one parameter's statistics by element name and index.
    pub fn parameter(&self, element: &str, index: usize) -> Option<&ParameterFit> {
        self.element(element)?.parameters.get(index)
    }
}

// Service wire shape: element name -> parameter name -> statistics.
#[derive(Debug, Deserialize)]
struct RawResult {
    model: HashMap<String, HashMap<String, RawStats>>,
    overall: AggregateErrors,
}

#[derive(Debug, Deserialize)]
struct RawStats {
    value: f64,
    error: f64,
    significance: f64,
    #[serde(rename = "value_unit", default)]
    unit: String,
}

/// Converts the service's per-element/per-parameter response into a
/// structured result ordered like the original model.
///
/// Elements or parameters present in the model but absent from the
/// response are reported as incomplete, never silently defaulted.
pub struct ResultParser<'a> {
    model: &'a CircuitModel,
}

impl<'a> ResultParser<'a> {
    /// Create a parser bound to the model the fit was submitted with.
    pub fn new(model: &'a CircuitModel) -> Self {
        Self { model }
    }

    /// Bind a raw fit-result JSON value to the model.
    pub fn bind(&self, raw: &Value) -> BindResult<FitResult> {
        let raw: RawResult = serde_json::from_value(raw.clone())?;

        let mut elements = Vec::new();
        for element in self.model.elements() {
            let stats =
                raw.model
                    .get(element.name())
                    .ok_or_else(|| ResultError::MissingElement {
                        element: element.name().to_string(),
                    })?;

            let mut parameters = Vec::with_capacity(element.parameters().len());
            for parameter in element.parameters() {
                // The response keys parameters by canonical name; the kind
                // table maps index to name.
                let name = element
                    .parameter_name(parameter.index)
                    .unwrap_or_default();
                let entry = stats.get(name).ok_or_else(|| ResultError::MissingParameter {
                    element: element.name().to_string(),
                    parameter: name.to_string(),
                })?;
                parameters.push(ParameterFit {
                    index: parameter.index,
                    name: name.to_string(),
                    value: entry.value,
                    error: entry.error,
                    significance: entry.significance,
                    unit: entry.unit.clone(),
                });
            }
            elements.push(ElementFit {
                name: element.name().to_string(),
                kind: element.kind(),
                parameters,
            });
        }

        Ok(FitResult {
            elements,
            overall: raw.overall,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CircuitElement, ElementKind, Parameter, ParsedTree};
    use serde_json::json;

    fn leaf(kind: ElementKind, name: &str, values: &[f64]) -> ParsedTree {
        let parameters = values
            .iter()
            .enumerate()
            .map(|(index, &value)| Parameter {
                index,
                value,
                fixed: false,
            })
            .collect();
        ParsedTree::Element(CircuitElement::new(kind, name, parameters).unwrap())
    }

    fn rc_model() -> CircuitModel {
        CircuitModel::from_tree(
            "rc",
            ParsedTree::Serial(vec![
                leaf(ElementKind::Resistor, "R0", &[100.0]),
                leaf(ElementKind::Capacitor, "C0", &[1e-6]),
            ]),
        )
    }

    fn overall() -> Value {
        json!({
            "impedance_error_max": 1.9,
            "impedance_error_mean": 0.14,
            "phase_error_max": 0.22,
            "phase_error_mean": 0.018,
            "overall_error": 1.13
        })
    }

    #[test]
    fn test_binds_in_model_order() {
        let raw = json!({
            "model": {
                "C0": {"C": {"value": 5.0e-2, "error": 15.1, "significance": 0.03, "value_unit": "F"}},
                "R0": {"R": {"value": 3.6e-3, "error": 1.59, "significance": 0.078, "value_unit": "Ω"}}
            },
            "overall": overall()
        });
        let model = rc_model();
        let result = ResultParser::new(&model).bind(&raw).unwrap();

        let names: Vec<&str> = result.elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["R0", "C0"]);
        let r = result.parameter("R0", 0).unwrap();
        assert_eq!(r.name, "R");
        assert_eq!(r.unit, "Ω");
        assert!((r.value - 3.6e-3).abs() < 1e-12);
        assert!((result.overall.overall_error - 1.13).abs() < 1e-12);
    }

    #[test]
    fn test_missing_element_is_incomplete() {
        let raw = json!({
            "model": {
                "R0": {"R": {"value": 1.0, "error": 0.1, "significance": 0.5, "value_unit": "Ω"}}
            },
            "overall": overall()
        });
        let model = rc_model();
        let err = ResultParser::new(&model).bind(&raw).expect_err("C0 missing");
        assert!(matches!(err, ResultError::MissingElement { element } if element == "C0"));
    }

    #[test]
    fn test_missing_parameter_is_incomplete() {
        let model = CircuitModel::from_tree(
            "cpe",
            leaf(ElementKind::ConstantPhaseElement, "CPE0", &[0.067, 0.73, 1000.0]),
        );
        // α and f_norm are absent from the response.
        let raw = json!({
            "model": {
                "CPE0": {"C_eq": {"value": 0.067, "error": 1.0, "significance": 0.25, "value_unit": "F"}}
            },
            "overall": overall()
        });
        let err = ResultParser::new(&model).bind(&raw).expect_err("α missing");
        assert!(
            matches!(err, ResultError::MissingParameter { ref parameter, .. } if parameter == "α")
        );
    }
}
