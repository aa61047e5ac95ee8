//! Circuit element primitives and the closed per-kind parameter table.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Closed set of circuit element kinds.
///
/// Each kind has a fixed parameter arity and a canonical name/unit per
/// parameter index. Unknown kind codes fail at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Resistor,
    Capacitor,
    Inductor,
    ConstantPhaseElement,
    FiniteDiffusion,
    WarburgImpedance,
    NernstDiffusion,
    SphericalDiffusion,
    HomogenousReactionImpedance,
    YoungGoehrImpedance,
}

/// Name and unit of one parameter slot of an element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Canonical parameter name, e.g. `R` or `C_eq`.
    pub name: &'static str,
    /// Physical unit as displayed by the service.
    pub unit: &'static str,
}

impl ElementKind {
    /// Parameter table for this kind, ordered by parameter index.
    pub fn parameter_specs(&self) -> &'static [ParameterSpec] {
        match self {
            ElementKind::Resistor => &[ParameterSpec { name: "R", unit: "Ω" }],
            ElementKind::Capacitor => &[ParameterSpec { name: "C", unit: "F" }],
            ElementKind::Inductor => &[ParameterSpec { name: "L", unit: "H" }],
            ElementKind::ConstantPhaseElement => &[
                ParameterSpec { name: "C_eq", unit: "F" },
                ParameterSpec { name: "α", unit: "" },
                ParameterSpec { name: "f_norm", unit: "Hz" },
            ],
            ElementKind::FiniteDiffusion => &[
                ParameterSpec { name: "W", unit: "Ωs^(-½)" },
                ParameterSpec { name: "k", unit: "1/s" },
            ],
            ElementKind::WarburgImpedance => &[ParameterSpec { name: "W", unit: "Ωs^(-½)" }],
            ElementKind::NernstDiffusion => &[
                ParameterSpec { name: "W", unit: "Ωs^(-½)" },
                ParameterSpec { name: "k", unit: "1/s" },
            ],
            ElementKind::SphericalDiffusion => &[
                ParameterSpec { name: "W", unit: "Ωs^(-½)" },
                ParameterSpec { name: "k", unit: "1/s" },
            ],
            ElementKind::HomogenousReactionImpedance => &[
                ParameterSpec { name: "W", unit: "Ωs^(-½)" },
                ParameterSpec { name: "k", unit: "1/s" },
            ],
            ElementKind::YoungGoehrImpedance => &[
                ParameterSpec { name: "C", unit: "F" },
                ParameterSpec { name: "p", unit: "" },
                ParameterSpec { name: "T", unit: "s" },
            ],
        }
    }

    /// Fixed parameter arity of this kind.
    pub fn arity(&self) -> usize {
        self.parameter_specs().len()
    }

    /// The kind code as it appears in model documents.
    pub fn code(&self) -> &'static str {
        match self {
            ElementKind::Resistor => "resistor",
            ElementKind::Capacitor => "capacitor",
            ElementKind::Inductor => "inductor",
            ElementKind::ConstantPhaseElement => "constant-phase-element",
            ElementKind::FiniteDiffusion => "finite-diffusion",
            ElementKind::WarburgImpedance => "warburg-impedance",
            ElementKind::NernstDiffusion => "nernst-diffusion",
            ElementKind::SphericalDiffusion => "spherical-diffusion",
            ElementKind::HomogenousReactionImpedance => "homogenous-reaction-impedance",
            ElementKind::YoungGoehrImpedance => "young-goehr-impedance",
        }
    }

    /// Parse a kind code; unknown codes are a validation error.
    pub fn from_code(code: &str) -> ModelResult<Self> {
        match code {
            "resistor" => Ok(ElementKind::Resistor),
            "capacitor" => Ok(ElementKind::Capacitor),
            "inductor" => Ok(ElementKind::Inductor),
            "constant-phase-element" => Ok(ElementKind::ConstantPhaseElement),
            "finite-diffusion" => Ok(ElementKind::FiniteDiffusion),
            "warburg-impedance" => Ok(ElementKind::WarburgImpedance),
            "nernst-diffusion" => Ok(ElementKind::NernstDiffusion),
            "spherical-diffusion" => Ok(ElementKind::SphericalDiffusion),
            "homogenous-reaction-impedance" => Ok(ElementKind::HomogenousReactionImpedance),
            "young-goehr-impedance" => Ok(ElementKind::YoungGoehrImpedance),
            other => Err(ModelError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }

    // Bounds beyond arity. Index 1 of a CPE is the fractional exponent.
    fn check_bounds(&self, index: usize, value: f64) -> Option<String> {
        match self {
            ElementKind::ConstantPhaseElement if index == 1 && !(0.0..=1.0).contains(&value) => {
                Some(format!("parameter 1 (α) must be in [0,1], got {value}"))
            }
            _ => None,
        }
    }
}

/// One parameter of a circuit element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Position within the owning element's parameter list.
    pub index: usize,
    /// Current (initial or fitted) value.
    pub value: f64,
    /// When true the remote fitter must not vary this value.
    #[serde(default)]
    pub fixed: bool,
}

/// Typed leaf node representing one physical component.
///
/// Pure value object, immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitElement {
    kind: ElementKind,
    name: String,
    parameters: Vec<Parameter>,
}

impl CircuitElement {
    /// Build an element, validating parameter arity and bounds against the
    /// kind's closed table.
    pub fn new(
        kind: ElementKind,
        name: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> ModelResult<Self> {
        let name = name.into();

        if parameters.len() != kind.arity() {
            return Err(ModelError::Validation {
                element: name,
                reason: format!(
                    "{} takes {} parameter(s), got {}",
                    kind.code(),
                    kind.arity(),
                    parameters.len()
                ),
            });
        }

        for (position, parameter) in parameters.iter().enumerate() {
            if parameter.index != position {
                return Err(ModelError::Validation {
                    element: name,
                    reason: format!(
                        "parameter at position {position} declares index {}",
                        parameter.index
                    ),
                });
            }
            if let Some(reason) = kind.check_bounds(parameter.index, parameter.value) {
                return Err(ModelError::Validation {
                    element: name,
                    reason,
                });
            }
        }

        Ok(Self {
            kind,
            name,
            parameters,
        })
    }

    /// The element kind.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The user-assigned element name, e.g. `R0` or `CPE7`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered parameter list.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Value of the parameter at `index`, or `None` if out of range.
    pub fn value(&self, index: usize) -> Option<f64> {
        self.parameters.get(index).map(|p| p.value)
    }

    /// Whether the parameter at `index` is fixed for the fitter.
    pub fn is_fixed(&self, index: usize) -> Option<bool> {
        self.parameters.get(index).map(|p| p.fixed)
    }

    /// Canonical name of the parameter at `index` per the kind table.
    pub fn parameter_name(&self, index: usize) -> Option<&'static str> {
        self.kind.parameter_specs().get(index).map(|s| s.name)
    }

    /// Unit of the parameter at `index` per the kind table.
    pub fn parameter_unit(&self, index: usize) -> Option<&'static str> {
        self.kind.parameter_specs().get(index).map(|s| s.unit)
    }
}
