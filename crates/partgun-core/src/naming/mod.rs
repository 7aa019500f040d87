//! The canonical base-name wire format.
//!
//! Every job's outputs (config, stdout/stderr, data file) share one
//! base name that encodes the job's provenance:
//!
//! ```text
//! partGun_PDGid<particle>_x<multiplier>_<gun><min>To<max>_<stage>_<index>
//! ```
//!
//! Derived stages recover generation metadata by decoding the names of
//! discovered upstream `.root` files, so encoding and decoding must
//! stay exact inverses of each other. Thresholds tolerate both integer
//! and fractional renderings on the way in; on the way out,
//! whole-valued thresholds always carry one decimal (`1.0`, `35.0`) to
//! stay byte-compatible with names already in storage.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::particle::{GunKind, ParticleId};
use crate::stage::Stage;

/// Common prefix of every file produced by the pipeline.
pub const FILE_PREFIX: &str = "partGun";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^partGun_PDGid([0-9]+)_x([0-9]+)_(E|Pt)([0-9]*[.]?[0-9]*)To([0-9]*[.]?[0-9]*)_.*\.root$",
    )
    .expect("base name regex is valid")
});

/// A discovered file name that does not fit the naming scheme.
///
/// Fatal for the run: without the decoded metadata the current job
/// cannot be sized, and there is no partial-recovery path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// The name does not match the canonical shape at all.
    #[error("file name does not match the partGun naming scheme: {name}")]
    UnrecognizedName {
        /// The offending file name.
        name: String,
    },

    /// The shape matched but a field failed to parse.
    #[error("invalid {field} in file name {name}: {value:?}")]
    InvalidField {
        /// The offending file name.
        name: String,
        /// Which field failed.
        field: &'static str,
        /// The raw captured text.
        value: String,
    },

    /// The encoded particle id is outside the supported set.
    #[error("unsupported particle id {id} in file name {name}")]
    UnsupportedParticle {
        /// The offending file name.
        name: String,
        /// The decoded PDG id.
        id: u32,
    },
}

/// Metadata carried by a base name, minus the stage and job index.
///
/// This is what a derived stage needs from an upstream file: how many
/// events the file holds and which gun settings produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamingToken {
    /// The particle the file was generated for.
    pub particle: ParticleId,

    /// Event multiplier: events per job at generation, or
    /// `files_per_job * events_per_file` at derived stages.
    pub multiplier: u64,

    /// Gun flavor.
    pub gun: GunKind,

    /// Minimum gun threshold.
    pub threshold_min: f64,

    /// Maximum gun threshold.
    pub threshold_max: f64,
}

/// Render a base name from its parts.
#[must_use]
pub fn encode(token: &NamingToken, stage: Stage, index: u32) -> String {
    format!(
        "{FILE_PREFIX}_PDGid{}_x{}_{}{}To{}_{}_{}",
        token.particle,
        token.multiplier,
        token.gun.code(),
        Threshold(token.threshold_min),
        Threshold(token.threshold_max),
        stage,
        index
    )
}

/// Recover the generation metadata from a produced `.root` file name.
///
/// # Errors
///
/// Returns a [`FormatError`] if the name does not match the canonical
/// shape or a captured field does not parse.
pub fn decode(name: &str) -> Result<NamingToken, FormatError> {
    let caps = NAME_RE
        .captures(name)
        .ok_or_else(|| FormatError::UnrecognizedName {
            name: name.to_string(),
        })?;

    let raw_id: u32 = parse_field(name, "particle id", &caps[1])?;
    let particle = ParticleId::new(raw_id).map_err(|_| FormatError::UnsupportedParticle {
        name: name.to_string(),
        id: raw_id,
    })?;

    let multiplier: u64 = parse_field(name, "event multiplier", &caps[2])?;
    if multiplier == 0 {
        return Err(FormatError::InvalidField {
            name: name.to_string(),
            field: "event multiplier",
            value: caps[2].to_string(),
        });
    }

    let gun = match &caps[3] {
        "Pt" => GunKind::Pt,
        _ => GunKind::E,
    };

    Ok(NamingToken {
        particle,
        multiplier,
        gun,
        threshold_min: parse_field(name, "threshold min", &caps[4])?,
        threshold_max: parse_field(name, "threshold max", &caps[5])?,
    })
}

/// Shell-glob pattern selecting one particle's files at any stage.
#[must_use]
pub fn discovery_pattern(particle: ParticleId) -> String {
    format!("{FILE_PREFIX}*_PDGid{particle}_*.root")
}

fn parse_field<T: std::str::FromStr>(
    name: &str,
    field: &'static str,
    value: &str,
) -> Result<T, FormatError> {
    value.parse().map_err(|_| FormatError::InvalidField {
        name: name.to_string(),
        field,
        value: value.to_string(),
    })
}

/// Threshold rendering: whole values keep one decimal, fractional
/// values render shortest.
struct Threshold(f64);

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Render a threshold the way base names do.
#[must_use]
pub fn format_threshold(value: f64) -> String {
    Threshold(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(particle: u32, multiplier: u64, gun: GunKind, min: f64, max: f64) -> NamingToken {
        NamingToken {
            particle: ParticleId::new(particle).unwrap(),
            multiplier,
            gun,
            threshold_min: min,
            threshold_max: max,
        }
    }

    #[test]
    fn encode_gsd_shape() {
        let base = encode(&token(22, 96, GunKind::Pt, 1.0, 35.0), Stage::Gsd, 3);
        assert_eq!(base, "partGun_PDGid22_x96_Pt1.0To35.0_GSD_3");
    }

    #[test]
    fn encode_fractional_thresholds() {
        let base = encode(&token(211, 8, GunKind::E, 2.5, 17.25), Stage::Reco, 1);
        assert_eq!(base, "partGun_PDGid211_x8_E2.5To17.25_RECO_1");
    }

    #[test]
    fn decode_inverts_encode() {
        for particle in ParticleId::all() {
            for gun in [GunKind::Pt, GunKind::E] {
                for (min, max) in [(1.0, 35.0), (2.5, 17.25), (0.5, 3.0)] {
                    let original = NamingToken {
                        particle,
                        multiplier: 96,
                        gun,
                        threshold_min: min,
                        threshold_max: max,
                    };
                    let name = format!("{}.root", encode(&original, Stage::Gsd, 7));
                    let decoded = decode(&name).unwrap();
                    assert_eq!(decoded, original, "{name}");
                }
            }
        }
    }

    #[test]
    fn decode_tolerates_integer_thresholds() {
        let decoded = decode("partGun_PDGid13_x48_E2To20_GSD_1.root").unwrap();
        assert_eq!(decoded.threshold_min, 2.0);
        assert_eq!(decoded.threshold_max, 20.0);
        assert_eq!(decoded.gun, GunKind::E);
        assert_eq!(decoded.multiplier, 48);
    }

    #[test]
    fn decode_rejects_malformed_names() {
        let bad = [
            "partGun_PDGid22_x96_Pt1.0To35.0_GSD_3",      // no extension
            "partGun_PDGid22_Pt1.0To35.0_GSD_3.root",     // missing multiplier
            "partGun_PDGid22_x96_Px1.0To35.0_GSD_3.root", // unknown gun code
            "pileup_PDGid22_x96_Pt1.0To35.0_GSD_3.root",  // wrong prefix
            "partGun_PDGidmu_x96_Pt1.0To35.0_GSD_3.root", // non-numeric id
        ];
        for name in bad {
            assert!(
                matches!(decode(name), Err(FormatError::UnrecognizedName { .. })),
                "{name}"
            );
        }
    }

    #[test]
    fn decode_rejects_unsupported_particle() {
        let err = decode("partGun_PDGid2212_x96_Pt1.0To35.0_GSD_3.root").unwrap_err();
        assert!(matches!(
            err,
            FormatError::UnsupportedParticle { id: 2212, .. }
        ));
    }

    #[test]
    fn decode_rejects_zero_multiplier() {
        let err = decode("partGun_PDGid22_x0_Pt1.0To35.0_GSD_3.root").unwrap_err();
        assert!(matches!(
            err,
            FormatError::InvalidField {
                field: "event multiplier",
                ..
            }
        ));
    }

    #[test]
    fn decode_rejects_empty_threshold() {
        let err = decode("partGun_PDGid22_x96_PtTo35.0_GSD_3.root").unwrap_err();
        assert!(matches!(
            err,
            FormatError::InvalidField {
                field: "threshold min",
                ..
            }
        ));
    }

    #[test]
    fn threshold_rendering() {
        assert_eq!(format_threshold(1.0), "1.0");
        assert_eq!(format_threshold(35.0), "35.0");
        assert_eq!(format_threshold(2.5), "2.5");
        assert_eq!(format_threshold(0.1), "0.1");
    }

    #[test]
    fn discovery_pattern_shape() {
        let particle = ParticleId::new(111).unwrap();
        assert_eq!(discovery_pattern(particle), "partGun*_PDGid111_*.root");
    }
}
