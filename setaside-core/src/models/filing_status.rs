use serde::{Deserialize, Serialize};

/// Filing status a bracket table applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilingStatusCode {
    Single,
    MarriedFilingJointly,
    MarriedFilingSeparately,
    HeadOfHousehold,
    QualifyingSurvivingSpouse,
}

impl FilingStatusCode {
    pub const ALL: [FilingStatusCode; 5] = [
        Self::Single,
        Self::MarriedFilingJointly,
        Self::MarriedFilingSeparately,
        Self::HeadOfHousehold,
        Self::QualifyingSurvivingSpouse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "S",
            Self::MarriedFilingJointly => "MFJ",
            Self::MarriedFilingSeparately => "MFS",
            Self::HeadOfHousehold => "HOH",
            Self::QualifyingSurvivingSpouse => "QSS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "S" => Some(Self::Single),
            "MFJ" => Some(Self::MarriedFilingJointly),
            "MFS" => Some(Self::MarriedFilingSeparately),
            "HOH" => Some(Self::HeadOfHousehold),
            "QSS" => Some(Self::QualifyingSurvivingSpouse),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::MarriedFilingJointly => "Married Filing Jointly",
            Self::MarriedFilingSeparately => "Married Filing Separately",
            Self::HeadOfHousehold => "Head of Household",
            Self::QualifyingSurvivingSpouse => "Qualifying Surviving Spouse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_code() {
        for code in FilingStatusCode::ALL {
            assert_eq!(FilingStatusCode::parse(code.as_str()), Some(code));
        }
    }

    #[test]
    fn parse_rejects_unknown_code() {
        assert_eq!(FilingStatusCode::parse("X"), None);
    }
}
