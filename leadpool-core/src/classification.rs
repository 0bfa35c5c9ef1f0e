//! Classification tables
//!
//! Lead types, call dispositions, teams and roles are closed enumerations.
//! Both engines read them from here: the distribution engine for tier
//! membership, the aggregation engine for zero-filled bucket labels.
//!
//! [`Classification`] is the immutable tier table built once at startup and
//! shared read-only (`Arc<Classification>`) between the engines.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};

/// A label that matches no variant of a classification table
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed enumeration with a stable display label.
///
/// The label is the wire format (JSON values and map keys) and is parsed
/// case-insensitively. Declaration order is the sort order used by every
/// rollup map.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownLabel { kind: $kind, value: wanted.to_string() })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

labelled_enum! {
    /// Business category of a lead
    LeadType, "lead type" {
        Restaurant => "Restaurant",
        Cafe => "Cafe",
        Bar => "Bar",
        Hotel => "Hotel",
        Salon => "Salon",
        Gym => "Gym",
        Bakery => "Bakery",
        BarberShop => "Barber Shop",
        Spa => "Spa",
        DentalClinic => "Dental Clinic",
        MedicalClinic => "Medical Clinic",
        Pharmacy => "Pharmacy",
        RetailStore => "Retail Store",
        Grocery => "Grocery",
        Florist => "Florist",
        AutoRepair => "Auto Repair",
        CarWash => "Car Wash",
        RealEstate => "Real Estate",
        LawFirm => "Law Firm",
        AccountingFirm => "Accounting Firm",
        Plumbing => "Plumbing",
        Electrician => "Electrician",
        CleaningService => "Cleaning Service",
    }
}

labelled_enum! {
    /// Outcome recorded by a telemarketer after calling a lead
    CallDisposition, "call disposition" {
        Booked => "Booked",
        CallBack => "Call Back",
        NoAnswer => "No Answer",
        Voicemail => "Voicemail",
        Busy => "Busy",
        NotInterested => "Not Interested",
        WrongNumber => "Wrong Number",
        DoNotCall => "Do Not Call",
        AlreadyHasProvider => "Already Has Provider",
        FollowUp => "Follow Up",
        Disconnected => "Disconnected",
        LanguageBarrier => "Language Barrier",
    }
}

labelled_enum! {
    /// Telemarketing team; bookings are rolled up per team
    Team, "team" {
        Alpha => "Alpha",
        Bravo => "Bravo",
        Charlie => "Charlie",
    }
}

labelled_enum! {
    /// Role of a user as supplied by the identity collaborator
    Role, "role" {
        Admin => "Admin",
        LeadGeneration => "Lead Generation",
        Telemarketer => "Telemarketer",
    }
}

impl Role {
    /// Non-admin users count as agents on the dashboard
    pub fn is_agent(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

/// Replenishment priority bucket of a lead type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    High,
    Low,
}

/// Immutable tier table shared by the distribution and aggregation engines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    high_priority: Vec<LeadType>,
    low_priority: Vec<LeadType>,
}

impl Classification {
    /// Tier A out of the box
    pub const DEFAULT_HIGH_PRIORITY: [LeadType; 6] = [
        LeadType::Restaurant,
        LeadType::Cafe,
        LeadType::Bar,
        LeadType::Hotel,
        LeadType::Salon,
        LeadType::Gym,
    ];

    /// Build a tier table. A type may belong to at most one tier; types in
    /// neither tier are only reachable through the backfill pass.
    pub fn new(high_priority: Vec<LeadType>, low_priority: Vec<LeadType>) -> crate::Result<Self> {
        let mut seen = HashSet::new();
        for lead_type in high_priority.iter().chain(low_priority.iter()) {
            if !seen.insert(*lead_type) {
                return Err(crate::Error::Config(format!(
                    "lead type '{}' appears more than once in the priority tiers",
                    lead_type
                )));
            }
        }
        if high_priority.is_empty() && low_priority.is_empty() {
            return Err(crate::Error::Config("priority tiers are both empty".to_string()));
        }
        Ok(Self { high_priority, low_priority })
    }

    /// Build from configured labels. Without an explicit low tier, every
    /// type outside the high tier is low priority.
    pub fn from_labels(high: &[String], low: Option<&[String]>) -> crate::Result<Self> {
        let parse = |labels: &[String]| -> crate::Result<Vec<LeadType>> {
            labels
                .iter()
                .map(|l| l.parse::<LeadType>().map_err(|e| crate::Error::Config(e.to_string())))
                .collect()
        };
        let high = parse(high)?;
        let low = match low {
            Some(labels) => parse(labels)?,
            None => complement(&high),
        };
        Self::new(high, low)
    }

    pub fn high_priority(&self) -> &[LeadType] {
        &self.high_priority
    }

    pub fn low_priority(&self) -> &[LeadType] {
        &self.low_priority
    }

    pub fn tier_of(&self, lead_type: LeadType) -> Option<Tier> {
        if self.high_priority.contains(&lead_type) {
            Some(Tier::High)
        } else if self.low_priority.contains(&lead_type) {
            Some(Tier::Low)
        } else {
            None
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        let high = Self::DEFAULT_HIGH_PRIORITY.to_vec();
        let low = complement(&high);
        Self { high_priority: high, low_priority: low }
    }
}

fn complement(high: &[LeadType]) -> Vec<LeadType> {
    LeadType::ALL.iter().copied().filter(|t| !high.contains(t)).collect()
}

/// A map with every key of `keys` set to zero
pub fn zero_filled<K: Ord + Copy>(keys: &[K]) -> BTreeMap<K, u64> {
    keys.iter().map(|k| (*k, 0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        assert_eq!(LeadType::ALL.len(), 23);
        assert_eq!(CallDisposition::ALL.len(), 12);
        assert_eq!(Team::ALL.len(), 3);
        assert_eq!(Role::ALL.len(), 3);
    }

    #[test]
    fn test_labels_parse_case_insensitively() {
        assert_eq!("dental clinic".parse::<LeadType>().unwrap(), LeadType::DentalClinic);
        assert_eq!(" Call Back ".parse::<CallDisposition>().unwrap(), CallDisposition::CallBack);
        assert_eq!("lead generation".parse::<Role>().unwrap(), Role::LeadGeneration);

        let err = "Spaceport".parse::<LeadType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown lead type: 'Spaceport'");
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&LeadType::BarberShop).unwrap();
        assert_eq!(json, "\"Barber Shop\"");
        let back: CallDisposition = serde_json::from_str("\"Do Not Call\"").unwrap();
        assert_eq!(back, CallDisposition::DoNotCall);
        assert!(serde_json::from_str::<Team>("\"Delta\"").is_err());
    }

    #[test]
    fn test_default_tiers_partition_all_types() {
        let classification = Classification::default();
        assert_eq!(classification.high_priority().len(), 6);
        assert_eq!(classification.low_priority().len(), 17);
        for lead_type in LeadType::ALL {
            assert!(classification.tier_of(*lead_type).is_some(), "{} has no tier", lead_type);
        }
        assert_eq!(classification.tier_of(LeadType::Cafe), Some(Tier::High));
        assert_eq!(classification.tier_of(LeadType::Plumbing), Some(Tier::Low));
    }

    #[test]
    fn test_overlapping_tiers_rejected() {
        let result = Classification::new(
            vec![LeadType::Cafe, LeadType::Bar],
            vec![LeadType::Bar, LeadType::Spa],
        );
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_from_labels_with_explicit_low_tier() {
        let high = vec!["Spa".to_string()];
        let low = vec!["Gym".to_string(), "Florist".to_string()];
        let classification = Classification::from_labels(&high, Some(&low)).unwrap();
        assert_eq!(classification.high_priority(), &[LeadType::Spa]);
        assert_eq!(classification.low_priority(), &[LeadType::Gym, LeadType::Florist]);
        assert_eq!(classification.tier_of(LeadType::Hotel), None);
    }

    #[test]
    fn test_from_labels_rejects_unknown_type() {
        let high = vec!["Moon Base".to_string()];
        assert!(Classification::from_labels(&high, None).is_err());
    }

    #[test]
    fn test_zero_filled_covers_every_key() {
        let map = zero_filled(CallDisposition::ALL);
        assert_eq!(map.len(), 12);
        assert!(map.values().all(|v| *v == 0));
    }
}
