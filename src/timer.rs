use std::time::{Duration, Instant};

/// A running wall-clock timer. Elapsed time is only available after [`ScopedTimer::stop`].
#[derive(Debug)]
pub struct ScopedTimer {
    start: Instant,
}

/// Duration of a stopped [`ScopedTimer`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Elapsed(Duration);

impl ScopedTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn stop(self) -> Elapsed {
        Elapsed(self.start.elapsed())
    }
}

impl Elapsed {
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }
}

/// Runs `f` under a timer and returns its value with the elapsed time.
pub fn time<T>(f: impl FnOnce() -> T) -> (T, Elapsed) {
    let timer = ScopedTimer::start();
    let value = f();
    (value, timer.stop())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_operation_is_near_zero() {
        let ((), elapsed) = time(|| ());
        assert!(elapsed.as_secs_f64() >= 0.0);
        assert!(elapsed.as_secs_f64() < 0.05);
    }

    #[test]
    fn sleep_is_measured() {
        let ((), elapsed) = time(|| std::thread::sleep(Duration::from_millis(20)));
        assert!(elapsed.as_secs_f64() >= 0.02);
    }

    #[test]
    fn time_returns_closure_value() {
        let (v, _) = time(|| 41 + 1);
        assert_eq!(v, 42);
    }
}
