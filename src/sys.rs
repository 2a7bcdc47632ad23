//! Platform calls that need `unsafe`. Call sites use the safe wrappers.

/// Effective user ID of this process, used to keep per-user socket paths apart.
pub fn current_uid() -> u32 {
    // SAFETY: getuid has no preconditions and cannot fail.
    unsafe { libc::getuid() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_is_stable_across_calls() {
        assert_eq!(current_uid(), current_uid());
    }
}
