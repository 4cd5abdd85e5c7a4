//! Distance to severity classification

use malachite::Integer;
use serde::{Deserialize, Serialize};

use super::Quota;
use crate::error::{EngineError, Result};

/// Default upper bound of the normal band
pub const DEFAULT_NORMAL_THRESHOLD: u64 = 5;
/// Default upper bound of the low severity band
pub const DEFAULT_LOW_THRESHOLD: u64 = 10;
/// Default upper bound of the medium severity band
pub const DEFAULT_MID_THRESHOLD: u64 = 15;

/// Severity tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Band boundaries, each inclusive on its upper end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    normal: u64,
    low: u64,
    mid: u64,
}

impl Thresholds {
    pub fn new(normal: u64, low: u64, mid: u64) -> Result<Self> {
        if normal > low || low > mid {
            return Err(EngineError::InvalidThresholds { normal, low, mid });
        }
        Ok(Self { normal, low, mid })
    }

    pub fn normal(&self) -> u64 {
        self.normal
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn mid(&self) -> u64 {
        self.mid
    }

    /// Tier for `distance`, `None` when it is within the normal band
    pub fn severity_for(&self, distance: &Integer) -> Option<Severity> {
        if *distance <= Integer::from(self.normal) {
            None
        } else if *distance <= Integer::from(self.low) {
            Some(Severity::Low)
        } else if *distance <= Integer::from(self.mid) {
            Some(Severity::Medium)
        } else {
            Some(Severity::High)
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            normal: DEFAULT_NORMAL_THRESHOLD,
            low: DEFAULT_LOW_THRESHOLD,
            mid: DEFAULT_MID_THRESHOLD,
        }
    }
}

/// Maps distances to alerts under an emission quota
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Decide whether `distance` should raise an alert
    ///
    /// Returns `None` without touching the quota when the distance is normal,
    /// and `None` for any distance once the quota is exhausted. Otherwise one
    /// unit of quota is consumed.
    pub fn classify(&self, distance: &Integer, quota: &Quota) -> Option<Severity> {
        let severity = self.thresholds.severity_for(distance)?;
        quota.try_acquire().then_some(severity)
    }
}
