use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(BedStatus {
    Available => "available",
    Occupied => "occupied",
    Maintenance => "maintenance",
});

str_enum!(CallStage {
    First => "first",
    Second => "second",
});

/// Patient lifecycle state. Stored as an integer column; the numeric
/// codes are part of the external contract and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientState {
    Waiting,
    Serving,
    Served,
    Voided,
}

impl PatientState {
    pub fn as_i64(self) -> i64 {
        match self {
            PatientState::Waiting => 0,
            PatientState::Serving => 1,
            PatientState::Served => 2,
            PatientState::Voided => 3,
        }
    }

    pub fn from_i64(v: i64) -> Result<Self, DatabaseError> {
        match v {
            0 => Ok(PatientState::Waiting),
            1 => Ok(PatientState::Serving),
            2 => Ok(PatientState::Served),
            3 => Ok(PatientState::Voided),
            _ => Err(DatabaseError::InvalidEnum {
                field: "PatientState".into(),
                value: v.to_string(),
            }),
        }
    }

    /// Served and Voided admit no further transitions except re-registration.
    pub fn is_terminal(self) -> bool {
        matches!(self, PatientState::Served | PatientState::Voided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn bed_status_round_trip() {
        for (variant, s) in [
            (BedStatus::Available, "available"),
            (BedStatus::Occupied, "occupied"),
            (BedStatus::Maintenance, "maintenance"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(BedStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn call_stage_round_trip() {
        for (variant, s) in [(CallStage::First, "first"), (CallStage::Second, "second")] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(CallStage::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn patient_state_codes_are_stable() {
        for (variant, code) in [
            (PatientState::Waiting, 0),
            (PatientState::Serving, 1),
            (PatientState::Served, 2),
            (PatientState::Voided, 3),
        ] {
            assert_eq!(variant.as_i64(), code);
            assert_eq!(PatientState::from_i64(code).unwrap(), variant);
        }
    }

    #[test]
    fn terminal_states() {
        assert!(!PatientState::Waiting.is_terminal());
        assert!(!PatientState::Serving.is_terminal());
        assert!(PatientState::Served.is_terminal());
        assert!(PatientState::Voided.is_terminal());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(BedStatus::from_str("broken").is_err());
        assert!(CallStage::from_str("").is_err());
        assert!(PatientState::from_i64(7).is_err());
    }
}
