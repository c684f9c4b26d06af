/*
 * Created on Fri Oct 16 2026
 *
 * Copyright (c) fiche contributors. Licensed under the MIT Licence.
 */

use std::sync::atomic::{AtomicU64, Ordering};

/// Process wide hit counter, starts at zero
#[derive(Debug, Default)]
pub struct HitCounter(AtomicU64);

impl HitCounter {
    /// Count one hit and return the new total
    pub fn hit(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}
