//! Severity classification and alert budgeting
//!
//! Distances are mapped to a severity tier through fixed bands, and every
//! emitted alert draws from a shared quota.

mod classifier;
mod quota;

pub use classifier::{
    Classifier, Severity, Thresholds, DEFAULT_LOW_THRESHOLD, DEFAULT_MID_THRESHOLD,
    DEFAULT_NORMAL_THRESHOLD,
};
pub use quota::{Quota, DEFAULT_QUOTA_CAPACITY};
