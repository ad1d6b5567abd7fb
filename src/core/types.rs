use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Text written in place of an open-ended upper bound when a schedule is
/// serialized. JSON has no representation for infinity.
pub const UNBOUNDED_SENTINEL: &str = "Infinity";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BandId(Uuid);

impl BandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Upper end of a price band.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UpperBound {
    Finite(f64),
    Unbounded,
}

impl UpperBound {
    pub fn is_unbounded(self) -> bool {
        matches!(self, UpperBound::Unbounded)
    }

    pub fn finite(self) -> Option<f64> {
        match self {
            UpperBound::Finite(v) => Some(v),
            UpperBound::Unbounded => None,
        }
    }
}

impl fmt::Display for UpperBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpperBound::Finite(v) => write!(f, "{v}"),
            UpperBound::Unbounded => f.write_str("∞"),
        }
    }
}

impl Serialize for UpperBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            UpperBound::Finite(v) => serializer.serialize_f64(*v),
            UpperBound::Unbounded => serializer.serialize_str(UNBOUNDED_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for UpperBound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawNumber::deserialize(deserializer)? {
            RawNumber::Number(v) if v.is_infinite() && v > 0.0 => Ok(UpperBound::Unbounded),
            RawNumber::Number(v) => Ok(UpperBound::Finite(coerce_finite(v))),
            RawNumber::Text(text) if text.trim() == UNBOUNDED_SENTINEL => {
                Ok(UpperBound::Unbounded)
            }
            RawNumber::Text(text) => Ok(UpperBound::Finite(coerce_number(&text))),
            RawNumber::Missing => Err(de::Error::custom("upper bound must not be null")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Missing,
}

/// Parses a form field as a number. Blank, non-numeric and non-finite input
/// all read as zero.
pub fn coerce_number(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .map(coerce_finite)
        .unwrap_or(0.0)
}

pub(crate) fn coerce_finite(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Serde adapter for numeric fields that may arrive as numbers, numeric
/// strings, blanks or null.
pub mod lenient_number {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{RawNumber, coerce_finite, coerce_number};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(match RawNumber::deserialize(deserializer)? {
            RawNumber::Number(v) => coerce_finite(v),
            RawNumber::Text(text) => coerce_number(&text),
            RawNumber::Missing => 0.0,
        })
    }

    /// Like [`deserialize`] for optional fields; only an explicit `null`
    /// leaves the field unset.
    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        Ok(match RawNumber::deserialize(deserializer)? {
            RawNumber::Number(v) => Some(coerce_finite(v)),
            RawNumber::Text(text) => Some(coerce_number(&text)),
            RawNumber::Missing => None,
        })
    }
}

/// Serde adapter for optional choice fields: a value that names no known
/// variant is treated as absent instead of failing the whole payload.
pub mod lenient_choice {
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Choice<T> {
        Known(T),
        Unknown(IgnoredAny),
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(match Choice::<T>::deserialize(deserializer)? {
            Choice::Known(value) => Some(value),
            Choice::Unknown(_) => None,
        })
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerType {
    #[default]
    Domestic,
    #[serde(alias = "non-domestic", alias = "non_domestic")]
    NonDomestic,
}

/// Non-domestic adjustment category.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Lv,
    #[serde(alias = "mv-hv", alias = "mvHv")]
    MvHv,
    Streetlight,
    Water,
}

impl Category {
    pub fn code(self) -> &'static str {
        match self {
            Category::Lv => "lv",
            Category::MvHv => "mv_hv",
            Category::Streetlight => "streetlight",
            Category::Water => "water",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierResult {
    pub tier_id: BandId,
    pub from: f64,
    pub to: UpperBound,
    pub rate: f64,
    pub usage: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub tier_id: BandId,
    pub usage: f64,
    pub rate: f64,
    pub cost: f64,
}

/// A tenant's share of the tiered base charge, before adjustment and tax.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAllocation {
    pub tenant_id: TenantId,
    pub consumption: f64,
    pub breakdown: Vec<BreakdownEntry>,
    pub base_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub tiers: Vec<TierResult>,
    pub tenants: Vec<TenantAllocation>,
}

impl Allocation {
    pub fn tier_cost_total(&self) -> f64 {
        self.tiers.iter().map(|t| t.cost).sum()
    }

    pub fn total_usage(&self) -> f64 {
        self.tiers.iter().map(|t| t.usage).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantResult {
    pub tenant_id: TenantId,
    pub name: String,
    pub consumption: f64,
    pub breakdown: Vec<BreakdownEntry>,
    pub base_cost: f64,
    pub adjustment: f64,
    pub tax: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub tiers: Vec<TierResult>,
    pub tenants: Vec<TenantResult>,
    pub total_consumption: f64,
    pub base_cost: f64,
    pub adjustment_rate: f64,
    pub adjustment_label: String,
    pub adjustment: f64,
    pub tax_applies: bool,
    pub tax_rate_percent: f64,
    pub tax: f64,
    pub grand_total: f64,
}
