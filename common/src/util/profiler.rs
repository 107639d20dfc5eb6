use std::time::{Duration, Instant};

pub struct ScopedTimer {
    label: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::info!("{} took {:.3}s", self.label, self.elapsed_secs());
    }
}

/// Wall-clock budget shared by the routing phases.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// A budget of `secs` seconds from now. Non-positive or non-finite values mean no limit.
    pub fn new(secs: f64) -> Self {
        let limit = if secs > 0.0 {
            Duration::try_from_secs_f64(secs).ok()
        } else {
            None
        };
        Self {
            start: Instant::now(),
            limit,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            start: Instant::now(),
            limit: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.limit {
            Some(limit) => self.start.elapsed() >= limit,
            None => false,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        assert!(!Deadline::unbounded().is_expired());
        assert!(!Deadline::new(0.0).is_expired());
        assert!(!Deadline::new(f64::NAN).is_expired());
    }

    #[test]
    fn tiny_budget_expires() {
        let deadline = Deadline::new(1e-9);
        std::thread::sleep(Duration::from_millis(2));
        assert!(deadline.is_expired());
    }
}
