//! Local port allocation
//!
//! Picks the lowest free port at or above the configured base by probing
//! upward through the set of ports already claimed in state. Allocation is
//! not a reservation: the port is only held once the server record is
//! committed in the same invocation, so concurrent invocations against the
//! same state file can race (an operational constraint, not guarded here).

use std::collections::HashSet;

/// Return the lowest port >= `base` not present in `claimed`
///
/// `None` means the probe ran off the end of the valid port range.
pub fn next_free_port(claimed: &HashSet<u16>, base: u16) -> Option<u16> {
    let mut candidate = base;
    loop {
        if !claimed.contains(&candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_add(1)?;
    }
}
