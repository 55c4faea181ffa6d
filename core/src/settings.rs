//! Solver parameters
//!
//! The solver takes its parameters as positional arguments after the three
//! file names. Ranges and defaults match what the solver accepts.

use std::ops::RangeInclusive;

use serde::Deserialize;

use crate::error::{Result, SkinError};

pub const RESOLUTION_RANGE: RangeInclusive<u32> = 32..=256;
pub const LOOPS_RANGE: RangeInclusive<u32> = 1..=9;
pub const SAMPLES_RANGE: RangeInclusive<u32> = 32..=128;
pub const INFLUENCES_RANGE: RangeInclusive<u32> = 1..=8;
pub const FALLOFF_RANGE: RangeInclusive<f32> = 0.01..=0.99;

/// Edge curvature handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sharpness {
    Soft,
    Normal,
    #[default]
    Sharp,
    Sharpest,
}

impl Sharpness {
    /// Value passed on the solver command line
    pub fn as_arg(self) -> &'static str {
        match self {
            Sharpness::Soft => "1",
            Sharpness::Normal => "2",
            Sharpness::Sharp => "3",
            Sharpness::Sharpest => "4",
        }
    }
}

/// Parameters for one skinning job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Maximum voxel grid size. Default: 128
    pub resolution: u32,

    /// Heat diffuse passes = resolution * loops. Default: 5
    pub loops: u32,

    /// Sample rays per vertex. Default: 64
    pub samples: u32,

    /// Maximum bones influencing one vertex. Default: 4
    pub max_influences: u32,

    /// Heat diffuse falloff. Default: 0.2
    pub falloff: f32,

    /// Default: sharp
    pub sharpness: Sharpness,

    /// Keep the weights of selected vertices unchanged. Default: false
    pub protect_selected: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            resolution: 128,
            loops: 5,
            samples: 64,
            max_influences: 4,
            falloff: 0.2,
            sharpness: Sharpness::Sharp,
            protect_selected: false,
        }
    }
}

impl SolverSettings {
    /// Check every parameter against the range the solver accepts.
    pub fn validate(&self) -> Result<()> {
        check_range("resolution", self.resolution, &RESOLUTION_RANGE, "32-256")?;
        check_range("loops", self.loops, &LOOPS_RANGE, "1-9")?;
        check_range("samples", self.samples, &SAMPLES_RANGE, "32-128")?;
        check_range("max_influences", self.max_influences, &INFLUENCES_RANGE, "1-8")?;
        check_range("falloff", self.falloff, &FALLOFF_RANGE, "0.01-0.99")?;
        Ok(())
    }

    /// Full positional argument list for the solver.
    pub fn solver_args(&self, mesh_file: &str, bone_file: &str, weight_file: &str) -> Vec<String> {
        vec![
            mesh_file.to_string(),
            bone_file.to_string(),
            weight_file.to_string(),
            self.resolution.to_string(),
            self.loops.to_string(),
            self.samples.to_string(),
            self.max_influences.to_string(),
            self.falloff.to_string(),
            self.sharpness.as_arg().to_string(),
        ]
    }
}

fn check_range<T>(
    name: &'static str,
    value: T,
    range: &RangeInclusive<T>,
    range_text: &'static str,
) -> Result<()>
where
    T: PartialOrd + ToString,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SkinError::InvalidSetting {
            name,
            value: value.to_string(),
            range: range_text,
        })
    }
}
