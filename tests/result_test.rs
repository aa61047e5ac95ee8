//! Integration tests for fit-result binding
//!
//! Feeds realistic service result JSON through the parser and checks
//! ordering, lookup, and incomplete-result handling.

use pretty_assertions::assert_eq;
use serde_json::json;

use eis_analysis::error::ResultError;
use eis_analysis::model::{
    CircuitElement, CircuitModel, ElementKind, Parameter, ParsedTree,
};
use eis_analysis::result::ResultParser;

fn element(kind: ElementKind, name: &str, values: &[f64]) -> ParsedTree {
    let parameters = values
        .iter()
        .enumerate()
        .map(|(index, &value)| Parameter {
            index,
            value,
            fixed: false,
        })
        .collect();
    ParsedTree::Element(CircuitElement::new(kind, name, parameters).expect("valid element"))
}

fn randles_model() -> CircuitModel {
    CircuitModel::from_tree(
        "randles",
        ParsedTree::Serial(vec![
            element(ElementKind::Resistor, "R0", &[0.0021]),
            ParsedTree::Parallel(vec![
                element(ElementKind::Resistor, "R1", &[0.012]),
                element(
                    ElementKind::ConstantPhaseElement,
                    "CPE0",
                    &[0.067, 0.736, 1000.0],
                ),
            ]),
        ]),
    )
}

fn stat(value: f64, error: f64, significance: f64, unit: &str) -> serde_json::Value {
    json!({"value": value, "error": error, "significance": significance, "value_unit": unit})
}

fn service_result() -> serde_json::Value {
    json!({
        "model": {
            "R0": {"R": stat(0.00215, 1.59, 0.81, "Ω")},
            "R1": {"R": stat(0.01187, 2.34, 0.62, "Ω")},
            "CPE0": {
                "C_eq": stat(0.0712, 15.1, 0.30, "F"),
                "α": stat(0.729, 0.92, 0.88, ""),
                "f_norm": stat(1000.0, 0.0, 0.0, "Hz")
            }
        },
        "overall": {
            "impedance_error_max": 1.92,
            "impedance_error_mean": 0.141,
            "phase_error_max": 0.226,
            "phase_error_mean": 0.0185,
            "overall_error": 1.13
        }
    })
}

#[test]
fn test_binding_follows_model_element_order() {
    let model = randles_model();
    let result = ResultParser::new(&model)
        .bind(&service_result())
        .expect("complete result");

    let names: Vec<&str> = result.elements.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["R0", "R1", "CPE0"]);

    let cpe = result.element("CPE0").expect("CPE0 bound");
    assert_eq!(cpe.kind, ElementKind::ConstantPhaseElement);
    let parameter_names: Vec<&str> = cpe.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(parameter_names, vec!["C_eq", "α", "f_norm"]);
}

#[test]
fn test_parameter_statistics_are_copied_verbatim() {
    let model = randles_model();
    let result = ResultParser::new(&model)
        .bind(&service_result())
        .expect("complete result");

    let alpha = result.parameter("CPE0", 1).expect("α bound");
    assert_eq!(alpha.value, 0.729);
    assert_eq!(alpha.error, 0.92);
    assert_eq!(alpha.significance, 0.88);
    assert_eq!(alpha.unit, "");

    assert_eq!(result.overall.impedance_error_mean, 0.141);
    assert_eq!(result.overall.overall_error, 1.13);
}

#[test]
fn test_missing_element_reported() {
    let model = randles_model();
    let mut raw = service_result();
    raw["model"].as_object_mut().unwrap().remove("R1");

    let err = ResultParser::new(&model)
        .bind(&raw)
        .expect_err("R1 absent from response");
    assert!(matches!(err, ResultError::MissingElement { element } if element == "R1"));
}

#[test]
fn test_missing_parameter_reported() {
    let model = randles_model();
    let mut raw = service_result();
    raw["model"]["CPE0"].as_object_mut().unwrap().remove("α");

    let err = ResultParser::new(&model)
        .bind(&raw)
        .expect_err("α absent from response");
    match err {
        ResultError::MissingParameter { element, parameter } => {
            assert_eq!(element, "CPE0");
            assert_eq!(parameter, "α");
        }
        other => panic!("expected MissingParameter, got {other:?}"),
    }
}

#[test]
fn test_extra_response_entries_are_ignored() {
    let model = randles_model();
    let mut raw = service_result();
    raw["model"]["R9"] = json!({"R": stat(7.0, 0.1, 0.9, "Ω")});

    let result = ResultParser::new(&model)
        .bind(&raw)
        .expect("extra entries do not break binding");
    assert_eq!(result.elements.len(), 3);
    assert!(result.element("R9").is_none());
}

#[test]
fn test_malformed_overall_block_is_an_error() {
    let model = randles_model();
    let mut raw = service_result();
    raw["overall"] = json!({"impedance_error_max": "high"});

    assert!(matches!(
        ResultParser::new(&model).bind(&raw),
        Err(ResultError::Json(_))
    ));
}
