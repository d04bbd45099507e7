//! Parameter-space declarations and their expansion into an ordered grid.
//!
//! A grid is the Cartesian product of the value sequences of its parameters,
//! kept in declaration order. Task indices address grid points through a
//! mixed-radix code in which the **last-declared parameter varies fastest**,
//! the same order a nested loop over the declarations would visit them.

mod builder;
mod codec;
mod grid;
mod plan;
mod spec;
mod value;

pub use builder::{build, linspace, logspace, GridLimits};
pub use codec::{decode, digits, encode, TaskIndex};
pub use grid::{Axis, Combination, ParameterGrid};
pub use plan::{load_plan, SweepPlan};
pub use spec::{ParameterKind, ParameterSpec};
pub use value::ParamValue;
