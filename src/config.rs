/*
Run-time settings for the periodic boundary code.

Read from JSON, e.g.

    { "pbc": "auto", "center": "triclinic", "fold_workers": 4, "correct_box": true }

where "pbc" is "auto" (guess from the box) or an explicit mode: "none",
"xyz", "screw", {"1d": "z"} or {"2d": ["x", "y"]}. Missing fields take
their defaults.
*/

use crate::error::Result;
use crate::pbc::{
    check_box, correct_box, guess_periodicity, put_atoms_in_box_parallel,
    put_atoms_in_compact_unitcell, BoxGeometry, CellMatrix, CenterMode, PeriodicityMode, RVec,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PbcSelector {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(untagged)]
    Explicit(PeriodicityMode),
}

impl FromStr for PbcSelector {
    type Err = crate::error::PbcError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        if name.trim().eq_ignore_ascii_case("auto") {
            Ok(PbcSelector::Auto)
        } else {
            name.parse().map(PbcSelector::Explicit)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub pbc: PbcSelector,
    /// Center used when putting atoms in a unit cell
    pub center: CenterMode,
    /// Chunks for folding coordinates; 1 folds serially
    pub fold_workers: usize,
    /// Repair boxes that violate the unit-cell restrictions
    pub correct_box: bool,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            pbc: PbcSelector::Auto,
            center: CenterMode::Triclinic,
            fold_workers: 1,
            correct_box: true,
        }
    }
}

impl GeometryConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: GeometryConfig = serde_json::from_str(text)?;
        Ok(config)
    }

    /// Load config from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resolve_mode(&self, cell: &CellMatrix) -> PeriodicityMode {
        match self.pbc {
            PbcSelector::Auto => guess_periodicity(cell),
            PbcSelector::Explicit(mode) => mode,
        }
    }

    /// Check the box, correct it when allowed and needed, and set up the
    /// geometry for the (possibly corrected) box.
    pub fn build(&self, cell: &mut CellMatrix) -> Result<BoxGeometry> {
        let mode = self.resolve_mode(cell);
        if let Err(problem) = check_box(Some(mode), cell) {
            if !self.correct_box {
                return Err(problem);
            }
            warn!("{problem}, correcting the box");
            correct_box(cell, None);
            check_box(Some(mode), cell)?;
        }
        let geometry = BoxGeometry::new(Some(mode), cell);
        debug!("pbc geometry for {mode} pbc:\n{geometry}");
        Ok(geometry)
    }

    /// Put the atoms in the box using `fold_workers` chunks.
    pub fn fold(&self, cell: &CellMatrix, x: &mut [RVec]) {
        put_atoms_in_box_parallel(self.resolve_mode(cell), cell, x, self.fold_workers);
    }

    /// Put the atoms in the compact unit cell around the configured center.
    pub fn compact(&self, cell: &CellMatrix, x: &mut [RVec]) -> Result<()> {
        put_atoms_in_compact_unitcell(self.resolve_mode(cell), self.center, cell, x)
    }
}
