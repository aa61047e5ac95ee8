//! Integration tests for circuit model parsing
//!
//! Exercises document round trips and tree reconstruction from graph
//! topology, including edge-order independence and malformed inputs.

use pretty_assertions::assert_eq;

use eis_analysis::model::{
    CircuitElement, CircuitModel, ElementKind, ModelDocument, Parameter, ParsedTree,
};

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

/// Battery equivalent circuit with nested parallel groups:
/// Serial[Parallel[Serial[FI0, R1], C0], R0, Parallel[R2, CPE0], L0]
fn battery_tree() -> ParsedTree {
    ParsedTree::Serial(vec![
        ParsedTree::Parallel(vec![
            ParsedTree::Serial(vec![
                element(ElementKind::FiniteDiffusion, "FI0", &[0.043, 0.0011]),
                element(ElementKind::Resistor, "R1", &[0.012]),
            ]),
            element(ElementKind::Capacitor, "C0", &[0.51]),
        ]),
        element(ElementKind::Resistor, "R0", &[0.0021]),
        ParsedTree::Parallel(vec![
            element(ElementKind::Resistor, "R2", &[0.0033]),
            element(
                ElementKind::ConstantPhaseElement,
                "CPE0",
                &[0.067, 0.736, 1000.0],
            ),
        ]),
        element(ElementKind::Inductor, "L0", &[7.2e-8]),
    ])
}

#[cfg(test)]
mod reconstruction_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_tree_survives_graph_round_trip() {
        let tree = battery_tree();
        let rebuilt = tree.to_graph().build().expect("reducible graph");
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn test_reconstruction_preserves_names_and_values() {
        let model = CircuitModel::from_tree("battery", battery_tree());
        let names: Vec<&str> = model.elements().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["FI0", "R1", "C0", "R0", "R2", "CPE0", "L0"]);

        let cpe = model.element("CPE0").expect("CPE0 present");
        assert_eq!(cpe.value(1), Some(0.736));
        assert_eq!(cpe.parameter_name(1), Some("α"));
        assert_eq!(model.element("L0").unwrap().value(0), Some(7.2e-8));
    }

    #[test]
    fn test_edge_order_does_not_change_tree() {
        let reference = CircuitModel::from_tree("battery", battery_tree());
        let mut document = ModelDocument::from_model(&reference);
        document.parsed_tree = None;

        document.edges.reverse();
        let reversed = document.clone().into_model().expect("reversed edges parse");
        assert_eq!(reversed.tree(), reference.tree());

        document.edges.rotate_left(3);
        let rotated = document.into_model().expect("rotated edges parse");
        assert_eq!(rotated.tree(), reference.tree());
    }

    #[test]
    fn test_three_branch_parallel_under_any_edge_order() {
        let tree = ParsedTree::Parallel(vec![
            element(ElementKind::Resistor, "R0", &[1.0]),
            element(ElementKind::Capacitor, "C0", &[1e-6]),
            element(ElementKind::Inductor, "L0", &[1e-7]),
        ]);
        let mut document =
            ModelDocument::from_model(&CircuitModel::from_tree("triple", tree.clone()));
        document.parsed_tree = None;
        document.edges.reverse();

        let model = document.into_model().expect("three branches parse");
        assert_eq!(model.tree(), &tree);
        assert_eq!(model.tree().to_string(), "Parallel[R0, C0, L0]");
    }

    #[test]
    fn test_single_element_model() {
        let tree = element(ElementKind::WarburgImpedance, "W0", &[0.02]);
        let model = CircuitModel::from_tree("warburg", tree.clone());
        assert_eq!(model.tree(), &tree);
        assert_eq!(model.elements().len(), 1);
    }
}

#[cfg(test)]
mod document_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_round_trip_preserves_model() {
        let model = CircuitModel::from_tree("battery", battery_tree());
        let bytes = model.to_document_bytes().expect("serializable");
        let text = String::from_utf8(bytes).expect("utf-8 document");

        let parsed = ModelDocument::from_json(&text)
            .expect("parsable document")
            .into_model()
            .expect("valid model");
        assert_eq!(parsed.tree(), model.tree());
        assert_eq!(parsed.name(), "battery");
    }

    #[test]
    fn test_missing_edge_leaves_graph_irreducible() {
        let model = CircuitModel::from_tree("battery", battery_tree());
        let mut document = ModelDocument::from_model(&model);
        document.parsed_tree = None;
        document.edges.pop();

        let err = document.into_model().expect_err("incomplete topology");
        assert!(err.to_string().contains("single root") || err.to_string().contains("slots"));
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let model = CircuitModel::from_tree("battery", battery_tree());
        let mut document = ModelDocument::from_model(&model);
        let clone = document.nodes[0].clone();
        document.nodes.push(clone);

        let err = document.into_model().expect_err("duplicate node id");
        assert!(err.to_string().contains("duplicate node id"));
    }

    #[test]
    fn test_stale_cache_is_replaced_by_rebuilt_tree() {
        let model = CircuitModel::from_tree("battery", battery_tree());
        let mut document = ModelDocument::from_model(&model);
        document.parsed_tree = Some(element(ElementKind::Resistor, "R9", &[1.0]));

        let rebuilt = document.into_model().expect("graph is authoritative");
        assert_eq!(rebuilt.tree(), model.tree());
    }

    #[test]
    fn test_out_of_bounds_exponent_rejected_at_parse() {
        let mut document = ModelDocument::from_model(&CircuitModel::from_tree(
            "cpe",
            element(ElementKind::ConstantPhaseElement, "CPE0", &[0.067, 0.7, 1e3]),
        ));
        document.parsed_tree = None;
        for node in &mut document.nodes {
            for parameter in &mut node.parameters {
                if parameter.index == 1 {
                    parameter.value = 1.5;
                }
            }
        }
        let err = document.into_model().expect_err("exponent out of [0,1]");
        assert!(err.to_string().contains("[0,1]"));
    }
}
