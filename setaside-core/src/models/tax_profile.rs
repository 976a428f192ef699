use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the user earns their income. Informational only; the rates drive
/// the arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxationMode {
    #[default]
    Freelancer,
    SelfEmployed,
    Contractor,
}

impl TaxationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Freelancer => "freelancer",
            Self::SelfEmployed => "self_employed",
            Self::Contractor => "contractor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "freelancer" => Some(Self::Freelancer),
            "self_employed" => Some(Self::SelfEmployed),
            "contractor" => Some(Self::Contractor),
            _ => None,
        }
    }
}

/// Day of month and time of day for the monthly set-aside reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl ReminderSettings {
    /// Builds settings with day clamped to 1..=28, hour to 0..=23 and
    /// minute to 0..=59.
    pub fn new(day: u32, hour: u32, minute: u32) -> Self {
        Self {
            day,
            hour,
            minute,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            day: self.day.clamp(1, 28),
            hour: self.hour.min(23),
            minute: self.minute.min(59),
        }
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            day: 10,
            hour: 9,
            minute: 0,
        }
    }
}

/// User-level defaults that feed every recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxProfile {
    pub country_code: String,
    pub taxation_mode: TaxationMode,
    pub default_tax_rate: Decimal,
    pub default_reserve_extra_rate: Decimal,
    pub currency_code: String,
    #[serde(default)]
    pub reminder: ReminderSettings,
}

impl Default for TaxProfile {
    fn default() -> Self {
        Self {
            country_code: "US".to_string(),
            taxation_mode: TaxationMode::Freelancer,
            default_tax_rate: Decimal::new(25, 2),
            default_reserve_extra_rate: Decimal::new(3, 2),
            currency_code: "USD".to_string(),
            reminder: ReminderSettings::default(),
        }
    }
}
