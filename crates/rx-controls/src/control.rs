//! Compiled control layer and its evaluation.

use rx_project::{ControlDef, MeasuredDef, SignalKindDef};

use crate::error::{ControlError, ControlResult};
use crate::readout::PlantReadout;
use crate::signal::{Boundary, SignalId};
use crate::table::LookupTable;

#[derive(Debug, Clone, PartialEq)]
enum Measured {
    ReactorPower,
    FuelTemperatureAverage(Option<usize>),
    JunctionFlow(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum SignalKind {
    Time,
    Constant(f64),
    Lookup { input: SignalId, table: LookupTable },
    Sum { terms: Vec<(SignalId, f64)> },
    Measured(Measured),
}

#[derive(Debug, Clone, PartialEq)]
struct CompiledSignal {
    id: String,
    kind: SignalKind,
}

/// The control collaborator: evaluates all signals in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Control {
    signals: Vec<CompiledSignal>,
    reactor_power: Option<SignalId>,
}

impl Control {
    /// Resolve signal names and measured references into indices.
    ///
    /// `rod_ids` and `junction_ids` are the identifiers of the rods and
    /// junctions the plant actually builds, in case-file order.
    pub fn compile(def: &ControlDef, rod_ids: &[String], junction_ids: &[String]) -> ControlResult<Self> {
        let mut signals: Vec<CompiledSignal> = Vec::with_capacity(def.signals.len());
        for signal in &def.signals {
            let earlier = |name: &str| -> ControlResult<SignalId> {
                signals
                    .iter()
                    .position(|s| s.id == name)
                    .map(SignalId)
                    .ok_or_else(|| ControlError::InvalidReference {
                        what: format!("signal '{}' reads undeclared signal '{}'", signal.id, name),
                    })
            };
            let kind = match &signal.kind {
                SignalKindDef::Time => SignalKind::Time,
                SignalKindDef::Constant { value } => SignalKind::Constant(*value),
                SignalKindDef::Lookup { input, table } => SignalKind::Lookup {
                    input: earlier(input)?,
                    table: LookupTable::new(table)?,
                },
                SignalKindDef::Sum { inputs, gains } => {
                    if !gains.is_empty() && gains.len() != inputs.len() {
                        return Err(ControlError::InvalidArg {
                            what: "sum gains must match inputs",
                        });
                    }
                    let mut terms = Vec::with_capacity(inputs.len());
                    for (i, input) in inputs.iter().enumerate() {
                        let gain = if gains.is_empty() { 1.0 } else { gains[i] };
                        terms.push((earlier(input)?, gain));
                    }
                    SignalKind::Sum { terms }
                }
                SignalKindDef::Measured { reference } => {
                    SignalKind::Measured(resolve_measured(reference, &signal.id, rod_ids, junction_ids)?)
                }
            };
            signals.push(CompiledSignal {
                id: signal.id.clone(),
                kind,
            });
        }

        let mut control = Self {
            signals,
            reactor_power: None,
        };
        if let Some(name) = &def.reactor_power {
            control.reactor_power = Some(control.signal_id(name)?);
        }
        Ok(control)
    }

    /// Resolve a signal name for a physics model.
    pub fn signal_id(&self, name: &str) -> ControlResult<SignalId> {
        self.signals
            .iter()
            .position(|s| s.id == name)
            .map(SignalId)
            .ok_or_else(|| ControlError::InvalidReference {
                what: format!("unknown signal '{name}'"),
            })
    }

    /// Signal supplying normalized power when kinetics is not solved.
    pub fn reactor_power_signal(&self) -> Option<SignalId> {
        self.reactor_power
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|s| s.id.as_str())
    }

    /// Evaluate every signal at time `t` against the current plant state.
    ///
    /// The result depends only on `t` and the plant; no history is kept.
    pub fn evaluate(&self, t: f64, plant: &dyn PlantReadout) -> ControlResult<Boundary> {
        let mut values = Vec::with_capacity(self.signals.len());
        for signal in &self.signals {
            let value = match &signal.kind {
                SignalKind::Time => t,
                SignalKind::Constant(v) => *v,
                SignalKind::Lookup { input, table } => table.eval(values[input.0]),
                SignalKind::Sum { terms } => terms.iter().map(|(id, gain)| gain * values[id.0]).sum(),
                SignalKind::Measured(Measured::ReactorPower) => plant.reactor_power(),
                SignalKind::Measured(Measured::FuelTemperatureAverage(rod)) => {
                    plant.fuel_temperature_average(*rod)
                }
                SignalKind::Measured(Measured::JunctionFlow(j)) => plant.junction_flow(*j),
            };
            if !value.is_finite() {
                return Err(ControlError::NonFinite {
                    signal: signal.id.clone(),
                    t,
                });
            }
            values.push(value);
        }
        Ok(Boundary::new(t, values))
    }
}

fn resolve_measured(
    reference: &MeasuredDef,
    signal: &str,
    rod_ids: &[String],
    junction_ids: &[String],
) -> ControlResult<Measured> {
    match reference {
        MeasuredDef::ReactorPower => Ok(Measured::ReactorPower),
        MeasuredDef::FuelTemperatureAverage { rod_id: None } => {
            if rod_ids.is_empty() {
                return Err(ControlError::InvalidReference {
                    what: format!("signal '{signal}' measures fuel temperature but no rods are solved"),
                });
            }
            Ok(Measured::FuelTemperatureAverage(None))
        }
        MeasuredDef::FuelTemperatureAverage { rod_id: Some(rod) } => rod_ids
            .iter()
            .position(|r| r == rod)
            .map(|i| Measured::FuelTemperatureAverage(Some(i)))
            .ok_or_else(|| ControlError::InvalidReference {
                what: format!("signal '{signal}' measures unknown rod '{rod}'"),
            }),
        MeasuredDef::JunctionFlow { junction } => junction_ids
            .iter()
            .position(|j| j == junction)
            .map(Measured::JunctionFlow)
            .ok_or_else(|| ControlError::InvalidReference {
                what: format!("signal '{signal}' measures unknown junction '{junction}'"),
            }),
    }
}
