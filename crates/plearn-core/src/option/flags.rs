//! Option flags and importance levels

use crate::error::{PLearnError, PResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags::bitflags! {
    /// Flags attached to a declared option
    ///
    /// Exactly one rule depends on the category bits: an option with none of
    /// BUILD, LEARNT or TUNING is a legacy option and is read into a
    /// throw-away instance during deserialization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OptionFlags: u32 {
        /// Set before `build()` to configure the object
        const BUILD = 1 << 0;
        /// Computed by training, saved with the object
        const LEARNT = 1 << 1;
        /// May be changed after `build()` without rebuilding
        const TUNING = 1 << 2;
        /// Never written by `newwrite`
        const NOSAVE = 1 << 3;
        /// Objects held by the option do not get this object as parent
        const NONPARENTABLE = 1 << 4;
        /// Graph traversal does not descend into the option
        const NONTRAVERSABLE = 1 << 5;
        /// Transmitted over remote calls even when NOSAVE is set
        const REMOTE_TRANSMIT = 1 << 6;
    }
}

const FLAG_NAMES: [(OptionFlags, &str); 7] = [
    (OptionFlags::BUILD, "buildoption"),
    (OptionFlags::LEARNT, "learntoption"),
    (OptionFlags::TUNING, "tuningoption"),
    (OptionFlags::NOSAVE, "nosave"),
    (OptionFlags::NONPARENTABLE, "nonparentable"),
    (OptionFlags::NONTRAVERSABLE, "nontraversable"),
    (OptionFlags::REMOTE_TRANSMIT, "remotetransmit"),
];

impl OptionFlags {
    /// True when none of BUILD, LEARNT, TUNING is set
    pub fn should_be_skipped(self) -> bool {
        !self.intersects(OptionFlags::BUILD | OptionFlags::LEARNT | OptionFlags::TUNING)
    }

    /// Decode the flags into their conventional names
    ///
    /// Fails when bits outside the known flags are set.
    pub fn flag_strings(self) -> PResult<Vec<&'static str>> {
        let unknown = self.bits() & !OptionFlags::all().bits();
        if unknown != 0 {
            return Err(PLearnError::UnknownFlags(unknown));
        }
        Ok(FLAG_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect())
    }
}

/// Importance tier of an option, used only to filter help output
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OptionLevel {
    /// Shown to everyone
    #[default]
    Basic,
    /// Shown to users tuning the class
    Advanced,
    /// Rarely useful outside development
    Expert,
    /// Not stable yet
    Experimental,
    /// Kept for old scripts
    Deprecated,
}

impl OptionLevel {
    /// Lower-case name of the level
    pub fn as_str(self) -> &'static str {
        match self {
            OptionLevel::Basic => "basic",
            OptionLevel::Advanced => "advanced",
            OptionLevel::Expert => "expert",
            OptionLevel::Experimental => "experimental",
            OptionLevel::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for OptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLevel {
    type Err = PLearnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(OptionLevel::Basic),
            "advanced" => Ok(OptionLevel::Advanced),
            "expert" => Ok(OptionLevel::Expert),
            "experimental" => Ok(OptionLevel::Experimental),
            "deprecated" => Ok(OptionLevel::Deprecated),
            other => Err(PLearnError::runtime(format!(
                "Unknown option level '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_be_skipped() {
        assert!(!OptionFlags::BUILD.should_be_skipped());
        assert!(!(OptionFlags::LEARNT | OptionFlags::NOSAVE).should_be_skipped());
        assert!(!OptionFlags::TUNING.should_be_skipped());
        assert!(OptionFlags::NOSAVE.should_be_skipped());
        assert!(OptionFlags::empty().should_be_skipped());
    }

    #[test]
    fn test_flag_strings() {
        let flags = OptionFlags::LEARNT | OptionFlags::NOSAVE | OptionFlags::REMOTE_TRANSMIT;
        assert_eq!(
            flags.flag_strings().unwrap(),
            vec!["learntoption", "nosave", "remotetransmit"]
        );
    }

    #[test]
    fn test_flag_strings_rejects_unknown_bits() {
        let flags = OptionFlags::from_bits_retain(OptionFlags::BUILD.bits() | 1 << 12);
        assert!(matches!(
            flags.flag_strings(),
            Err(PLearnError::UnknownFlags(bits)) if bits == 1 << 12
        ));
    }

    #[test]
    fn test_level_ordering() {
        assert!(OptionLevel::Basic < OptionLevel::Advanced);
        assert!(OptionLevel::Advanced < OptionLevel::Expert);
        assert!(OptionLevel::Expert < OptionLevel::Experimental);
        assert!(OptionLevel::Experimental < OptionLevel::Deprecated);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("Expert".parse::<OptionLevel>().unwrap(), OptionLevel::Expert);
        assert!("loud".parse::<OptionLevel>().is_err());
    }
}
