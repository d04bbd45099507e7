use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sweep_core::errors::{io_error, SweepError};
use sweep_core::from_yaml_slice;

use crate::builder::{build, GridLimits};
use crate::grid::ParameterGrid;
use crate::spec::ParameterSpec;

/// Sweep declaration as stored in a YAML plan file.
///
/// ```yaml
/// name: lr-scan
/// parameters:
///   - { name: lr, kind: log_range, start: -4, stop: -1, count: 4 }
///   - { name: layers, kind: list, values: [2, 4] }
/// command: [train, --epochs=10]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// Optional job name; callers fall back to the script name.
    #[serde(default)]
    pub name: Option<String>,
    /// Parameters in declaration order.
    pub parameters: Vec<ParameterSpec>,
    /// Command template, executable first.
    #[serde(default)]
    pub command: Vec<String>,
}

impl SweepPlan {
    /// Builds the grid declared by the plan.
    pub fn build_grid(&self, limits: &GridLimits) -> Result<ParameterGrid, SweepError> {
        build(&self.parameters, limits)
    }
}

/// Loads a plan from a YAML file, keeping parameters in file order.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<SweepPlan, SweepError> {
    let plan_path = path.as_ref();
    let bytes = fs::read(plan_path).map_err(|err| io_error("plan_read", plan_path, err))?;
    from_yaml_slice(&bytes)
}
