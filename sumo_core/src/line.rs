//! Line-sensor code table.
//!
//! The four corner detectors share one analog line through a resistor ladder,
//! so each of the 16 corner combinations lands in its own ADC band. The table
//! holds the upper bound of each band; a reading belongs to the first band
//! whose bound it is below, and to code 15 when it is below none.

use eyre::WrapErr;
use sumo_traits::SettingsStore;

use crate::error::{Result, SumoError};
use crate::types::EdgeFlags;
use crate::util::midpoint;

pub const CODE_COUNT: usize = 16;

/// Code 15: all four corners off the arena.
pub const CODE_OUTSIDE: u8 = 15;

pub const DEFAULT_THRESHOLDS: [i32; CODE_COUNT] = [
    1384, 1523, 1672, 1821, //
    1960, 2068, 2148, 2336, //
    2559, 2708, 2863, 3023, //
    3191, 3382, 3597, 4096,
];

/// Store keys and display names, indexed by code.
pub const CODE_LABELS: [&str; CODE_COUNT] = [
    "0000 NO_LINE",
    "0001 R_RIGHT",
    "0010 R_LEFT",
    "0011 _REAR_",
    "0100 F_RIGHT",
    "0101 _RIGHT_",
    "0110 INVALID1",
    "0111 R_RIGHT2",
    "1000 F_LEFT",
    "1001 INVALID2",
    "1010 _LEFT_",
    "1011 R_LEFT_2",
    "1100 _FRONT_",
    "1101 F_RIGHT2",
    "1110 F_LEFT_2",
    "1111 OUTSIDE",
];

/// Codes the ladder cannot produce on a real arena; their calibration level
/// is interpolated from the neighbours.
const IMPOSSIBLE_CODES: [usize; 2] = [6, 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineThresholds {
    table: [i32; CODE_COUNT],
}

impl Default for LineThresholds {
    fn default() -> Self {
        Self {
            table: DEFAULT_THRESHOLDS,
        }
    }
}

impl LineThresholds {
    /// Checked construction from an arbitrary slice.
    pub fn from_slice(t: &[i32]) -> Result<Self> {
        sumo_config::validate_thresholds(t)
            .map_err(|e| eyre::Report::new(SumoError::Config(e.to_string())))?;
        let mut table = [0; CODE_COUNT];
        table.copy_from_slice(t);
        Ok(Self { table })
    }

    /// Compute a table from the raw ADC level recorded for each code.
    ///
    /// Levels for codes 6 and 9 are replaced by their neighbours' average.
    /// Each bound is the midpoint between a level and the next one; the last
    /// bound is the midpoint to ADC full scale.
    pub fn from_recorded_levels(levels: &[i32; CODE_COUNT]) -> Self {
        let mut lv = *levels;
        for i in IMPOSSIBLE_CODES {
            lv[i] = midpoint(lv[i - 1], lv[i + 1]);
        }
        let mut table = [0; CODE_COUNT];
        for i in 0..CODE_COUNT {
            let next = lv.get(i + 1).copied().unwrap_or(sumo_config::ADC_FULL_SCALE);
            table[i] = midpoint(lv[i], next);
        }
        Self { table }
    }

    #[inline]
    pub fn table(&self) -> &[i32; CODE_COUNT] {
        &self.table
    }

    /// Map a raw ADC level to its 4-bit code.
    pub fn decode(&self, raw: u16) -> u8 {
        let raw = i32::from(raw);
        self.table
            .iter()
            .position(|&bound| raw < bound)
            .map_or(CODE_OUTSIDE, |i| i as u8)
    }

    #[inline]
    pub fn flags(&self, raw: u16) -> EdgeFlags {
        EdgeFlags::from_code(self.decode(raw))
    }

    /// `(label, bound)` pairs in code order.
    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        CODE_LABELS.iter().copied().zip(self.table.iter().copied())
    }

    /// Load the table from `store`, writing the default for any missing key.
    ///
    /// A stored table that is not strictly ascending is ignored in favour of
    /// the defaults.
    pub fn load(store: &mut dyn SettingsStore) -> Result<Self> {
        let mut table = DEFAULT_THRESHOLDS;
        let mut missing = 0usize;
        for (i, label) in CODE_LABELS.iter().enumerate() {
            match store.get(label) {
                Some(v) => table[i] = v,
                None => {
                    missing += 1;
                    store
                        .put(label, DEFAULT_THRESHOLDS[i])
                        .map_err(|e| eyre::Report::new(SumoError::Store(e.to_string())))
                        .wrap_err_with(|| format!("writing default for '{label}'"))?;
                }
            }
        }
        if missing > 0 {
            tracing::info!(missing, "line thresholds: stored defaults for missing codes");
        }
        match sumo_config::validate_thresholds(&table) {
            Ok(()) => Ok(Self { table }),
            Err(e) => {
                tracing::warn!(error = %e, "stored line thresholds rejected; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<()> {
        for (label, bound) in self.labeled() {
            store
                .put(label, bound)
                .map_err(|e| eyre::Report::new(SumoError::Store(e.to_string())))
                .wrap_err_with(|| format!("saving '{label}'"))?;
        }
        Ok(())
    }

    /// Overwrite the stored table with the defaults.
    pub fn reset_to_defaults(store: &mut dyn SettingsStore) -> Result<Self> {
        let t = Self::default();
        t.save(store)?;
        tracing::info!("line thresholds reset to defaults");
        Ok(t)
    }
}
