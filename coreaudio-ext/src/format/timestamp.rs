use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimeStampFlags(pub u32);

impl TimeStampFlags {
    pub const NOTHING_VALID: Self = Self(0);
    pub const SAMPLE_TIME_VALID: Self = Self(1 << 0);
    pub const HOST_TIME_VALID: Self = Self(1 << 1);
    pub const RATE_SCALAR_VALID: Self = Self(1 << 2);
    pub const WORD_CLOCK_TIME_VALID: Self = Self(1 << 3);
    pub const SMPTE_TIME_VALID: Self = Self(1 << 4);
    pub const SAMPLE_HOST_TIME_VALID: Self =
        Self(Self::SAMPLE_TIME_VALID.0 | Self::HOST_TIME_VALID.0);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TimeStampFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Point in time on one or more of the host's clocks.
///
/// Two timestamps compare on the first clock valid in both: sample time,
/// then host time, then word clock time. With no clock in common they are
/// neither equal nor ordered.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioTimeStamp {
    pub sample_time: f64,
    pub host_time: u64,
    pub rate_scalar: f64,
    pub word_clock_time: u64,
    pub flags: TimeStampFlags,
}

impl AudioTimeStamp {
    pub fn with_sample_time(sample_time: f64) -> Self {
        Self {
            sample_time,
            flags: TimeStampFlags::SAMPLE_TIME_VALID,
            ..Default::default()
        }
    }

    pub fn with_host_time(host_time: u64) -> Self {
        Self {
            host_time,
            flags: TimeStampFlags::HOST_TIME_VALID,
            ..Default::default()
        }
    }

    pub fn with_sample_and_host_time(sample_time: f64, host_time: u64) -> Self {
        Self {
            sample_time,
            host_time,
            flags: TimeStampFlags::SAMPLE_HOST_TIME_VALID,
            ..Default::default()
        }
    }

    pub fn with_rate_scalar(sample_time: f64, host_time: u64, rate_scalar: f64) -> Self {
        Self {
            sample_time,
            host_time,
            rate_scalar,
            flags: TimeStampFlags::SAMPLE_HOST_TIME_VALID | TimeStampFlags::RATE_SCALAR_VALID,
            ..Default::default()
        }
    }

    pub fn with_word_clock_time(word_clock_time: u64) -> Self {
        Self {
            word_clock_time,
            flags: TimeStampFlags::WORD_CLOCK_TIME_VALID,
            ..Default::default()
        }
    }

    #[inline]
    pub fn sample_time_is_valid(&self) -> bool {
        self.flags.contains(TimeStampFlags::SAMPLE_TIME_VALID)
    }

    #[inline]
    pub fn host_time_is_valid(&self) -> bool {
        self.flags.contains(TimeStampFlags::HOST_TIME_VALID)
    }

    #[inline]
    pub fn rate_scalar_is_valid(&self) -> bool {
        self.flags.contains(TimeStampFlags::RATE_SCALAR_VALID)
    }

    #[inline]
    pub fn word_clock_time_is_valid(&self) -> bool {
        self.flags.contains(TimeStampFlags::WORD_CLOCK_TIME_VALID)
    }

    /// Sample time rendered as `hh:mm:ss.mmm` at `sample_rate`.
    pub fn time_string(&self, sample_rate: f64) -> Option<String> {
        (self.sample_time_is_valid() && sample_rate > 0.0)
            .then(|| time_str(self.sample_time / sample_rate))
    }
}

impl PartialEq for AudioTimeStamp {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for AudioTimeStamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.sample_time_is_valid() && other.sample_time_is_valid() {
            self.sample_time.partial_cmp(&other.sample_time)
        } else if self.host_time_is_valid() && other.host_time_is_valid() {
            Some(self.host_time.cmp(&other.host_time))
        } else if self.word_clock_time_is_valid() && other.word_clock_time_is_valid() {
            Some(self.word_clock_time.cmp(&other.word_clock_time))
        } else {
            None
        }
    }
}

impl fmt::Display for AudioTimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.sample_time_is_valid() {
            parts.push(format!("sample time {:.2}", self.sample_time));
        }
        if self.host_time_is_valid() {
            parts.push(format!("host time {}", self.host_time));
        }
        if self.rate_scalar_is_valid() {
            parts.push(format!("rate scalar {}", self.rate_scalar));
        }
        if self.word_clock_time_is_valid() {
            parts.push(format!("word clock time {}", self.word_clock_time));
        }
        if parts.is_empty() {
            f.write_str("invalid")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

pub fn time_str(sec: f64) -> String {
    let ms = sec * 1000f64;
    let hours = (ms / 3600000f64) as u64;
    let minutes = ((ms % 3600000f64) / 60000f64) as u64;
    let seconds = ((ms % 60000f64) / 1000f64) as u64;
    let milliseconds = (ms % 1000f64) as u64;

    format!(
        "{hours:0width$}:{minutes:02}:{seconds:02}.{milliseconds:03}",
        width = if hours >= 100 { 0 } else { 2 }
    )
}
