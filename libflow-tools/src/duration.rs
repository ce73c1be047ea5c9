use serde::Serialize;
use std::ops::Sub;

/// Capture timestamp, or difference between two timestamps
///
/// Panic-free and limited to microsecond precision, which is what capture
/// files provide in the common case.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Serialize)]
pub struct Duration {
    pub secs: u32,
    pub micros: u32,
}

pub const MICROS_PER_SEC: u32 = 1_000_000;

impl Duration {
    /// Build Duration from secs and micros
    pub fn new(secs: u32, micros: u32) -> Duration {
        Duration { secs, micros }
    }

    /// Test if Duration object is null
    #[inline]
    pub fn is_null(self) -> bool {
        self.secs == 0 && self.micros == 0
    }

    /// Number of seconds, as a float
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        f64::from(self.secs) + f64::from(self.micros) / f64::from(MICROS_PER_SEC)
    }
}

impl Sub for Duration {
    type Output = Duration;

    /// Saturates to zero if `other` is later than `self`
    fn sub(self, other: Duration) -> Self::Output {
        if self <= other {
            return Duration::default();
        }
        if self.micros >= other.micros {
            Duration::new(self.secs - other.secs, self.micros - other.micros)
        } else {
            Duration::new(
                self.secs - other.secs - 1,
                MICROS_PER_SEC + self.micros - other.micros,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Duration;

    #[test]
    fn duration_sub() {
        let d1 = Duration::new(1234, 5678);
        let d2 = Duration::new(1234, 6789);
        let d = d2 - d1;
        assert_eq!(d.secs, 0);
        assert_eq!(d.micros, 1111);
    }

    #[test]
    fn duration_sub_borrow() {
        let d1 = Duration::new(10, 900_000);
        let d2 = Duration::new(12, 100_000);
        assert_eq!(d2 - d1, Duration::new(1, 200_000));
        // never underflows
        assert!((d1 - d2).is_null());
    }

    #[test]
    fn duration_secs_f64() {
        assert_eq!(Duration::new(2, 500_000).as_secs_f64(), 2.5);
        assert_eq!(Duration::default().as_secs_f64(), 0.0);
    }
}
