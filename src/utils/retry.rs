//! Exponential backoff helper shared by outbound network clients (the ad
//! event emitter). Kept as a pure function so the backoff schedule is
//! independently testable from the client that drives it.

use std::time::Duration;

/// Calculate the next backoff duration using exponential backoff with a cap.
///
/// `new_backoff = min(current_backoff * multiplier, max_backoff)`
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use receipt_ingest::utils::retry::calculate_next_backoff;
///
/// let backoff = Duration::from_millis(100);
/// let next = calculate_next_backoff(backoff, 2.0, 30);
/// assert_eq!(next, Duration::from_millis(200));
/// ```
pub fn calculate_next_backoff(
    current_backoff: Duration,
    multiplier: f64,
    max_backoff_seconds: u64,
) -> Duration {
    Duration::from_millis((current_backoff.as_millis() as f64 * multiplier) as u64)
        .min(Duration::from_secs(max_backoff_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_cap() {
        let backoff = Duration::from_millis(100);
        let next = calculate_next_backoff(backoff, 2.0, 30);
        assert_eq!(next, Duration::from_millis(200));

        let next2 = calculate_next_backoff(next, 2.0, 30);
        assert_eq!(next2, Duration::from_millis(400));
    }

    #[test]
    fn capped_at_max() {
        let backoff = Duration::from_secs(20);
        let next = calculate_next_backoff(backoff, 2.0, 30);
        assert_eq!(next, Duration::from_secs(30));
    }
}
