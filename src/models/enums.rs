use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
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

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
    System => "system",
});

str_enum!(ConversationStatus {
    Active => "active",
    Completed => "completed",
    Archived => "archived",
});

str_enum!(SymptomCategory {
    Pain => "pain",
    Respiratory => "respiratory",
    Gastrointestinal => "gastrointestinal",
    Neurological => "neurological",
    Cardiovascular => "cardiovascular",
    Skin => "skin",
    Constitutional => "constitutional",
    Genitourinary => "genitourinary",
    Musculoskeletal => "musculoskeletal",
    Other => "other",
});

str_enum!(SeverityLevel {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
    Critical => "critical",
});

str_enum!(ReportType {
    InitialConsultation => "initial_consultation",
    FollowUp => "follow_up",
    SymptomTracking => "symptom_tracking",
    Summary => "summary",
});

str_enum!(ReportStatus {
    InProgress => "in_progress",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(UrgencyLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
    Emergency => "emergency",
});

impl SymptomCategory {
    /// Every valid category, in presentation order.
    pub fn all() -> &'static [SymptomCategory] {
        &[
            Self::Pain,
            Self::Respiratory,
            Self::Gastrointestinal,
            Self::Neurological,
            Self::Cardiovascular,
            Self::Skin,
            Self::Constitutional,
            Self::Genitourinary,
            Self::Musculoskeletal,
            Self::Other,
        ]
    }
}

impl SeverityLevel {
    /// Map a 1-10 severity rating onto the coarse level scale.
    pub fn from_severity(severity: u8) -> Self {
        match severity {
            0..=3 => Self::Mild,
            4..=6 => Self::Moderate,
            7..=8 => Self::Severe,
            _ => Self::Critical,
        }
    }
}

impl UrgencyLevel {
    /// Coerce free-text urgency from an LLM into the closed set.
    ///
    /// Models frequently answer "moderate" or "critical"; those map onto
    /// the canonical values. Anything unrecognized degrades to Low rather
    /// than passing through raw.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" | "routine" => Self::Low,
            "medium" | "moderate" => Self::Medium,
            "high" | "urgent" => Self::High,
            "emergency" | "critical" => Self::Emergency,
            _ => Self::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn conversation_status_round_trip() {
        for (variant, s) in [
            (ConversationStatus::Active, "active"),
            (ConversationStatus::Completed, "completed"),
            (ConversationStatus::Archived, "archived"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ConversationStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn message_role_round_trip() {
        for (variant, s) in [
            (MessageRole::User, "user"),
            (MessageRole::Assistant, "assistant"),
            (MessageRole::System, "system"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(MessageRole::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn symptom_category_covers_all_ten() {
        assert_eq!(SymptomCategory::all().len(), 10);
        for category in SymptomCategory::all() {
            assert_eq!(
                SymptomCategory::from_str(category.as_str()).unwrap(),
                *category
            );
        }
    }

    #[test]
    fn severity_level_from_rating() {
        assert_eq!(SeverityLevel::from_severity(1), SeverityLevel::Mild);
        assert_eq!(SeverityLevel::from_severity(3), SeverityLevel::Mild);
        assert_eq!(SeverityLevel::from_severity(4), SeverityLevel::Moderate);
        assert_eq!(SeverityLevel::from_severity(6), SeverityLevel::Moderate);
        assert_eq!(SeverityLevel::from_severity(7), SeverityLevel::Severe);
        assert_eq!(SeverityLevel::from_severity(8), SeverityLevel::Severe);
        assert_eq!(SeverityLevel::from_severity(9), SeverityLevel::Critical);
        assert_eq!(SeverityLevel::from_severity(10), SeverityLevel::Critical);
    }

    #[test]
    fn urgency_coercion_stays_in_closed_set() {
        assert_eq!(UrgencyLevel::coerce("low"), UrgencyLevel::Low);
        assert_eq!(UrgencyLevel::coerce("moderate"), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::coerce("Medium"), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::coerce("HIGH"), UrgencyLevel::High);
        assert_eq!(UrgencyLevel::coerce("critical"), UrgencyLevel::Emergency);
        assert_eq!(UrgencyLevel::coerce("emergency"), UrgencyLevel::Emergency);
        assert_eq!(UrgencyLevel::coerce("????"), UrgencyLevel::Low);
        assert_eq!(UrgencyLevel::coerce(""), UrgencyLevel::Low);
    }

    #[test]
    fn report_type_round_trip() {
        for (variant, s) in [
            (ReportType::InitialConsultation, "initial_consultation"),
            (ReportType::FollowUp, "follow_up"),
            (ReportType::SymptomTracking, "symptom_tracking"),
            (ReportType::Summary, "summary"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ReportType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(ConversationStatus::from_str("open").is_err());
        assert!(SymptomCategory::from_str("unknown").is_err());
        assert!(ReportStatus::from_str("").is_err());
    }

    #[test]
    fn enums_serialize_snake_case() {
        let json = serde_json::to_string(&ReportType::InitialConsultation).unwrap();
        assert_eq!(json, "\"initial_consultation\"");
        let json = serde_json::to_string(&UrgencyLevel::Emergency).unwrap();
        assert_eq!(json, "\"emergency\"");
    }
}
