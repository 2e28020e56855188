//! OTP issuance and verification state machine.
//!
//! Pure functions over [`OtpState`] with an explicit `now` so the temporal
//! invariants are testable without a clock. Persistence (and the per-user
//! serialization of writes) lives in `storage::otp`; handlers wire the two
//! together.
//!
//! State machine: Empty -> Active (issue) -> Expired (time passes, checked
//! lazily) -> Empty (successful verify) or back to Active (reissue). Issuing
//! always overwrites the previous code, so at most one code is live per user.

use crate::models::OtpState;
use rand::Rng;

/// Why a submitted code was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    /// No code was ever issued, or the last one was already consumed.
    NoActiveCode,
    /// Submitted value does not match the active code.
    WrongCode,
    /// Values match but the code is past its expiry timestamp.
    Expired,
}

/// Decide whether a new code may be issued.
///
/// Resets `attempt_count` when the window has elapsed since the last
/// issuance (the reset is persisted by the subsequent `issue` write).
/// Returns false once the count has reached `max_attempts` within the
/// current window; the caller must surface that as a rate-limit error.
pub fn can_issue(state: &mut OtpState, now: u64, window_secs: u64, max_attempts: u32) -> bool {
    if let Some(issued_at) = state.issued_at {
        if now >= issued_at.saturating_add(window_secs) {
            state.attempt_count = 0;
        }
    }
    state.attempt_count < max_attempts
}

/// Record a freshly generated code.
///
/// Overwrites any previous code (single-active-code invariant), restarts
/// the expiry timer, and counts the issuance against the window. Must only
/// be called after `can_issue` returned true.
pub fn issue(state: &mut OtpState, code: String, now: u64, ttl_secs: u64) {
    state.code = Some(code);
    state.issued_at = Some(now);
    state.expires_at = Some(now.saturating_add(ttl_secs));
    state.attempt_count += 1;
}

/// Whether the active code is past its expiry. True when no code is set.
/// Side-effect free: repeated checks at the same instant agree.
pub fn is_expired(state: &OtpState, now: u64) -> bool {
    match state.expires_at {
        Some(expires_at) => now >= expires_at,
        None => true,
    }
}

/// Check a submitted code against the state.
///
/// Mismatch is reported before expiry (a wrong, stale code reads as
/// "wrong code", matching the original flow). On success the state is
/// fully reset — consume semantics — so the same code can never be
/// accepted twice. On failure the state is left untouched.
pub fn verify(state: &mut OtpState, submitted: &str, now: u64) -> Result<(), VerifyError> {
    let code = match (&state.code, state.expires_at) {
        (Some(code), Some(_)) => code,
        _ => return Err(VerifyError::NoActiveCode),
    };

    if code != submitted {
        return Err(VerifyError::WrongCode);
    }
    if is_expired(state, now) {
        return Err(VerifyError::Expired);
    }

    state.code = None;
    state.issued_at = None;
    state.expires_at = None;
    state.attempt_count = 0;
    Ok(())
}

/// Generate a fixed-length numeric code.
///
/// Uniform over 10^len values; length comes from config so the entropy
/// budget can be tuned against the expiry window and attempt cap.
pub fn generate_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: u64 = 600;
    const MAX: u32 = 3;

    fn issued_state(code: &str, now: u64) -> OtpState {
        let mut state = OtpState::empty();
        assert!(can_issue(&mut state, now, WINDOW, MAX));
        issue(&mut state, code.to_string(), now, WINDOW);
        state
    }

    #[test]
    fn test_issue_sets_code_and_expiry() {
        let state = issued_state("482913", 100);
        assert_eq!(state.code.as_deref(), Some("482913"));
        assert_eq!(state.issued_at, Some(100));
        assert_eq!(state.expires_at, Some(700));
        assert_eq!(state.attempt_count, 1);
    }

    #[test]
    fn test_verify_then_replay_fails_no_active_code() {
        // Code issued at T=0 with 10-minute window; verify at T=5min succeeds,
        // the same code at T=6min must be rejected as consumed.
        let mut state = issued_state("482913", 0);

        assert_eq!(verify(&mut state, "482913", 300), Ok(()));
        assert_eq!(state, OtpState::empty());

        assert_eq!(
            verify(&mut state, "482913", 360),
            Err(VerifyError::NoActiveCode)
        );
    }

    #[test]
    fn test_expired_code_rejected_even_on_match() {
        // Issued at T=0, 10-minute expiry; correct value at T=11min fails.
        let mut state = issued_state("482913", 0);
        assert_eq!(verify(&mut state, "482913", 660), Err(VerifyError::Expired));
        // Failure leaves the code in place (stale until next issuance).
        assert_eq!(state.code.as_deref(), Some("482913"));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let mut state = issued_state("111111", 0);
        assert!(!is_expired(&state, 599));
        assert!(is_expired(&state, 600));
        assert_eq!(verify(&mut state, "111111", 599), Ok(()));
    }

    #[test]
    fn test_wrong_code_leaves_state_unchanged() {
        let mut state = issued_state("482913", 0);
        let before = state.clone();
        assert_eq!(
            verify(&mut state, "000000", 10),
            Err(VerifyError::WrongCode)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_wrong_and_expired_reports_wrong_code() {
        // Mismatch is checked before expiry.
        let mut state = issued_state("482913", 0);
        assert_eq!(
            verify(&mut state, "000000", 10_000),
            Err(VerifyError::WrongCode)
        );
    }

    #[test]
    fn test_verify_with_no_code_ever_issued() {
        let mut state = OtpState::empty();
        assert_eq!(
            verify(&mut state, "123456", 0),
            Err(VerifyError::NoActiveCode)
        );
    }

    #[test]
    fn test_reissue_invalidates_previous_code() {
        let mut state = issued_state("111111", 0);
        assert!(can_issue(&mut state, 60, WINDOW, MAX));
        issue(&mut state, "222222".to_string(), 60, WINDOW);

        // Old code no longer matches; new one does.
        assert_eq!(
            verify(&mut state, "111111", 120),
            Err(VerifyError::WrongCode)
        );
        assert_eq!(verify(&mut state, "222222", 120), Ok(()));
    }

    #[test]
    fn test_reissue_restarts_expiry_timer() {
        let mut state = issued_state("111111", 0);
        assert!(can_issue(&mut state, 500, WINDOW, MAX));
        issue(&mut state, "222222".to_string(), 500, WINDOW);
        assert_eq!(state.expires_at, Some(1_100));
        assert!(!is_expired(&state, 700));
    }

    #[test]
    fn test_issuance_capped_within_window() {
        // N issuances within the window succeed; the (N+1)th is refused.
        let mut state = OtpState::empty();
        for i in 0..MAX as u64 {
            assert!(can_issue(&mut state, i, WINDOW, MAX), "attempt {}", i);
            issue(&mut state, format!("{:06}", i), i, WINDOW);
        }
        assert_eq!(state.attempt_count, MAX);
        assert!(!can_issue(&mut state, MAX as u64, WINDOW, MAX));
    }

    #[test]
    fn test_attempt_count_resets_after_window() {
        let mut state = OtpState::empty();
        for i in 0..MAX as u64 {
            assert!(can_issue(&mut state, i, WINDOW, MAX));
            issue(&mut state, format!("{:06}", i), i, WINDOW);
        }
        assert!(!can_issue(&mut state, 10, WINDOW, MAX));

        // Window elapsed since the last issuance: counter resets.
        let last_issued = state.issued_at.unwrap();
        assert!(can_issue(&mut state, last_issued + WINDOW, WINDOW, MAX));
        assert_eq!(state.attempt_count, 0);
    }

    #[test]
    fn test_attempt_count_resets_on_success() {
        let mut state = issued_state("111111", 0);
        assert!(can_issue(&mut state, 1, WINDOW, MAX));
        issue(&mut state, "222222".to_string(), 1, WINDOW);
        assert_eq!(state.attempt_count, 2);

        assert_eq!(verify(&mut state, "222222", 2), Ok(()));
        assert_eq!(state.attempt_count, 0);
    }

    #[test]
    fn test_is_expired_is_idempotent() {
        let state = issued_state("482913", 0);
        let snapshot = state.clone();
        for _ in 0..3 {
            assert!(!is_expired(&state, 300));
            assert!(is_expired(&state, 900));
        }
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_issue_near_clock_max_saturates() {
        let mut state = OtpState::empty();
        assert!(can_issue(&mut state, u64::MAX - 1, WINDOW, MAX));
        issue(&mut state, "123456".to_string(), u64::MAX - 1, WINDOW);
        assert_eq!(state.expires_at, Some(u64::MAX));
        assert!(!is_expired(&state, u64::MAX - 1));
    }

    #[test]
    fn test_empty_state_reads_as_expired() {
        assert!(is_expired(&OtpState::empty(), 0));
    }

    #[test]
    fn test_generate_code_shape() {
        for len in [4, 6, 8] {
            let code = generate_code(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_code_varies() {
        // 10^6 values; 20 draws colliding every time would mean a broken RNG.
        let codes: std::collections::HashSet<String> =
            (0..20).map(|_| generate_code(6)).collect();
        assert!(codes.len() > 1);
    }
}
