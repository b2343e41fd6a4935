//! Precomputed sigmoid lookup table.
//!
//! Samples `σ(x) = exp(x) / (exp(x) + 1)` at [`crate::EXP_TABLE_SIZE`]
//! evenly spaced points on `[-MAX_EXP, +MAX_EXP]`. Callers must check
//! `|x| >= MAX_EXP` themselves — this table does not clamp.

use crate::{EXP_TABLE_SIZE, MAX_EXP};

pub struct SigmoidTable {
    table: Vec<f32>,
}

impl SigmoidTable {
    pub fn new() -> Self {
        let mut table = Vec::with_capacity(EXP_TABLE_SIZE);
        for i in 0..EXP_TABLE_SIZE {
            let x = (i as f64 / EXP_TABLE_SIZE as f64 * 2.0 - 1.0) * MAX_EXP;
            let exp_x = x.exp();
            table.push((exp_x / (exp_x + 1.0)) as f32);
        }
        SigmoidTable { table }
    }

    /// Look up `σ(f)`. Caller must ensure `|f| < MAX_EXP`.
    pub fn get(&self, f: f64) -> f32 {
        let i = ((f + MAX_EXP) * (EXP_TABLE_SIZE as f64 / (2.0 * MAX_EXP))) as usize;
        self.table[i.min(EXP_TABLE_SIZE - 1)]
    }
}

impl Default for SigmoidTable {
    fn default() -> Self {
        Self::new()
    }
}
