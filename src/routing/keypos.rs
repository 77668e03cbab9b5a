//! Key-position resolution for variadic commands.

use super::policy::CommandPolicy;

/// Resolve the argument indices holding keys for `policy` applied to an
/// argument list of length `argc`.
///
/// Normalizes a negative `last_key` (count back from the end: -1 is the
/// last argument) and validates the shape instead of reading out of
/// bounds: the span from the first key through the resolved end must be
/// present and divide evenly into `key_step`-sized groups. `None` means
/// the argument list does not fit the command's declared key shape and
/// the command must be rejected before any shard is contacted.
///
/// Commands that touch no key (`first_key == 0`) resolve to an empty
/// list.
pub(crate) fn key_positions(policy: &CommandPolicy, argc: usize) -> Option<Vec<usize>> {
    if policy.first_key == 0 {
        return Some(Vec::new());
    }
    let last = if policy.last_key < 0 {
        argc.checked_sub(policy.last_key.unsigned_abs() as usize)?
    } else {
        policy.last_key as usize
    };
    if policy.first_key >= argc || last >= argc || last < policy.first_key {
        return None;
    }
    // `last` points at the end of the final group (its last companion
    // argument, for stepped commands), not necessarily at a key.
    let span = last - policy.first_key + 1;
    if span % policy.key_step != 0 {
        return None;
    }
    let count = span / policy.key_step;
    Some((0..count).map(|i| policy.first_key + i * policy.key_step).collect())
}
