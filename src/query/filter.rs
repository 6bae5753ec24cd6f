//! Query eligibility

use super::target::QueryTarget;

/// Whether a target should be run
///
/// A target without a topic is the normal state of a freshly created panel,
/// not an error; it simply never opens a subscription.
pub fn is_eligible(target: &QueryTarget) -> bool {
    !target.hide && !target.topic().trim().is_empty()
}
