//! Pipeline stages, batch queues, and the events-per-job tables.
//!
//! Both enumerations are closed. An unrecognized stage or queue string
//! is a configuration error raised before any job is created.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// A pipeline stage (data tier).
///
/// GSD is the generation stage and has no upstream; RECO consumes GSD
/// output files, NTUP consumes RECO output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    /// GEN-SIM-DIGI: event generation, simulation, digitization.
    Gsd,
    /// Reconstruction over GSD files.
    Reco,
    /// Summary tuples over RECO files.
    Ntup,
}

impl Stage {
    /// Short tag used in file names, directory names, and the CLI.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Gsd => "GSD",
            Self::Reco => "RECO",
            Self::Ntup => "NTUP",
        }
    }

    /// Human-readable name for the setup banner.
    #[must_use]
    pub const fn long_name(self) -> &'static str {
        match self {
            Self::Gsd => "GEN-SIM-DIGI",
            Self::Reco => "RECO",
            Self::Ntup => "NTUP",
        }
    }

    /// The stage whose output files this stage consumes, if any.
    #[must_use]
    pub const fn upstream(self) -> Option<Self> {
        match self {
            Self::Gsd => None,
            Self::Reco => Some(Self::Gsd),
            Self::Ntup => Some(Self::Reco),
        }
    }

    /// Recommended event throughput for this stage, in events per hour
    /// of batch time.
    #[must_use]
    pub const fn events_per_hour(self) -> u64 {
        match self {
            Self::Gsd => 4,
            Self::Reco => 8,
            Self::Ntup => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GSD" => Ok(Self::Gsd),
            "RECO" => Ok(Self::Reco),
            "NTUP" => Ok(Self::Ntup),
            other => Err(ConfigError::UnsupportedStage {
                value: other.to_string(),
            }),
        }
    }
}

/// A supported LSF batch queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Queue {
    /// One week.
    #[serde(rename = "1nw")]
    OneWeek,
    /// Two days.
    #[serde(rename = "2nd")]
    TwoDays,
    /// One day.
    #[serde(rename = "1nd")]
    OneDay,
    /// Eight hours.
    #[serde(rename = "8nh")]
    EightHours,
    /// One hour.
    #[serde(rename = "1nh")]
    OneHour,
    /// Eight minutes.
    #[serde(rename = "8nm")]
    EightMinutes,
}

impl Queue {
    /// The queue name understood by the scheduler.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OneWeek => "1nw",
            Self::TwoDays => "2nd",
            Self::OneDay => "1nd",
            Self::EightHours => "8nh",
            Self::OneHour => "1nh",
            Self::EightMinutes => "8nm",
        }
    }

    /// Recommended number of events per job for this queue and stage.
    ///
    /// Derived from the queue wall-clock budget and the stage
    /// throughput. The eight-minute queue is too short for the hourly
    /// rates to apply and is pinned to a single event.
    #[must_use]
    pub const fn recommended_events_per_job(self, stage: Stage) -> u64 {
        let per_hour = stage.events_per_hour();
        match self {
            Self::OneWeek => 7 * 24 * per_hour,
            Self::TwoDays => 2 * 24 * per_hour,
            Self::OneDay => 24 * per_hour,
            Self::EightHours => 8 * per_hour,
            Self::OneHour => per_hour,
            Self::EightMinutes => 1,
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Queue {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1nw" => Ok(Self::OneWeek),
            "2nd" => Ok(Self::TwoDays),
            "1nd" => Ok(Self::OneDay),
            "8nh" => Ok(Self::EightHours),
            "1nh" => Ok(Self::OneHour),
            "8nm" => Ok(Self::EightMinutes),
            other => Err(ConfigError::UnsupportedQueue {
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_chain() {
        assert_eq!(Stage::Gsd.upstream(), None);
        assert_eq!(Stage::Reco.upstream(), Some(Stage::Gsd));
        assert_eq!(Stage::Ntup.upstream(), Some(Stage::Reco));
    }

    #[test]
    fn stage_round_trip() {
        for stage in [Stage::Gsd, Stage::Reco, Stage::Ntup] {
            assert_eq!(stage.tag().parse::<Stage>().unwrap(), stage);
        }
        assert!("AOD".parse::<Stage>().is_err());
        assert!("gsd".parse::<Stage>().is_err());
    }

    #[test]
    fn queue_round_trip() {
        let queues = [
            Queue::OneWeek,
            Queue::TwoDays,
            Queue::OneDay,
            Queue::EightHours,
            Queue::OneHour,
            Queue::EightMinutes,
        ];
        for queue in queues {
            assert_eq!(queue.name().parse::<Queue>().unwrap(), queue);
        }
        assert!("2nw".parse::<Queue>().is_err());
    }

    #[test]
    fn recommendation_table() {
        // Full queue x stage table, spelled out.
        let expected = [
            (Queue::OneWeek, Stage::Gsd, 672),
            (Queue::OneWeek, Stage::Reco, 1344),
            (Queue::OneWeek, Stage::Ntup, 16_800),
            (Queue::TwoDays, Stage::Gsd, 192),
            (Queue::TwoDays, Stage::Reco, 384),
            (Queue::TwoDays, Stage::Ntup, 4800),
            (Queue::OneDay, Stage::Gsd, 96),
            (Queue::OneDay, Stage::Reco, 192),
            (Queue::OneDay, Stage::Ntup, 2400),
            (Queue::EightHours, Stage::Gsd, 32),
            (Queue::EightHours, Stage::Reco, 64),
            (Queue::EightHours, Stage::Ntup, 800),
            (Queue::OneHour, Stage::Gsd, 4),
            (Queue::OneHour, Stage::Reco, 8),
            (Queue::OneHour, Stage::Ntup, 100),
            (Queue::EightMinutes, Stage::Gsd, 1),
            (Queue::EightMinutes, Stage::Reco, 1),
            (Queue::EightMinutes, Stage::Ntup, 1),
        ];
        for (queue, stage, events) in expected {
            assert_eq!(
                queue.recommended_events_per_job(stage),
                events,
                "{queue} x {stage}"
            );
        }
    }
}
