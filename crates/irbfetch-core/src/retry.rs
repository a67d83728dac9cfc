//! Retry with exponential backoff for fetch attempts

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

/// Blocking pause used between attempts. Injectable so tests can record
/// pauses instead of sleeping.
pub type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Default pause: block the calling thread.
pub fn thread_sleep() -> SleepFn {
    Arc::new(std::thread::sleep)
}

/// Exponential backoff: 2^attempt seconds (1s, 2s, 4s, ...) for the
/// zero-based index of the attempt that just failed.
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

/// Retry a fallible operation with exponential backoff.
///
/// Runs `attempt_fn` up to `max_attempts` times (at least once), passing the
/// zero-based attempt index. Every failure is logged; between attempts the
/// thread pauses for [`backoff_duration`]. There is no pause after the final
/// attempt.
///
/// Returns `Ok(T)` on first success, or the error of the final attempt.
pub fn retry_with_backoff<T, E: Display>(
    label: &str,
    max_attempts: u32,
    sleep: &dyn Fn(Duration),
    mut attempt_fn: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, E> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match attempt_fn(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                log::warn!(
                    "{label}: attempt {}/{max_attempts} failed: {e}",
                    attempt + 1
                );
                if attempt + 1 >= max_attempts {
                    log::error!("{label}: all {max_attempts} attempts failed");
                    return Err(e);
                }
                sleep(backoff_duration(attempt));
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn backoff_exponential() {
        assert_eq!(backoff_duration(0), Duration::from_secs(1));
        assert_eq!(backoff_duration(1), Duration::from_secs(2));
        assert_eq!(backoff_duration(2), Duration::from_secs(4));
        assert_eq!(backoff_duration(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_saturates() {
        assert_eq!(backoff_duration(200), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn succeeds_on_third_attempt_with_two_pauses() {
        let pauses = Mutex::new(Vec::new());
        let sleep = |d: Duration| pauses.lock().unwrap().push(d);
        let mut calls = 0;

        let result: Result<&str, String> = retry_with_backoff("test", 3, &sleep, |attempt| {
            calls += 1;
            if attempt < 2 {
                Err(format!("boom {attempt}"))
            } else {
                Ok("ok")
            }
        });

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls, 3);
        assert_eq!(
            *pauses.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn exhaustion_returns_last_error_without_trailing_pause() {
        let pauses = Mutex::new(Vec::new());
        let sleep = |d: Duration| pauses.lock().unwrap().push(d);

        let result: Result<(), String> =
            retry_with_backoff("test", 3, &sleep, |attempt| Err(format!("fail {attempt}")));

        assert_eq!(result, Err("fail 2".to_string()));
        assert_eq!(pauses.lock().unwrap().len(), 2);
    }

    #[test]
    fn first_success_never_pauses() {
        let pauses = Mutex::new(Vec::new());
        let sleep = |d: Duration| pauses.lock().unwrap().push(d);

        let result: Result<u8, String> = retry_with_backoff("test", 5, &sleep, |_| Ok(7));

        assert_eq!(result, Ok(7));
        assert!(pauses.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let pauses = Mutex::new(Vec::new());
        let sleep = |d: Duration| pauses.lock().unwrap().push(d);
        let mut calls = 0;
        let result: Result<(), &str> = retry_with_backoff("test", 0, &sleep, |_| {
            calls += 1;
            Err("nope")
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert!(pauses.lock().unwrap().is_empty());
    }
}
