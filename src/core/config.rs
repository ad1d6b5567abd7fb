use serde::{Deserialize, Serialize};

use super::charges::{ChargeInputs, compute_bill};
use super::schedule::{TierBand, TierSchedule};
use super::tenants::{Tenant, TenantSet};
use super::types::{Bill, Category, CustomerType, UpperBound, lenient_choice, lenient_number};

pub const DEFAULT_TAX_RATE_PERCENT: f64 = 8.0;

/// Everything a session edits: the schedule, the tenants and the charge
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct BillConfig {
    pub schedule: TierSchedule,
    pub tenants: TenantSet,
    pub tax_rate_percent: f64,
    pub customer_type: CustomerType,
    pub category: Category,
}

impl Default for BillConfig {
    fn default() -> Self {
        Self {
            schedule: TierSchedule::default(),
            tenants: TenantSet::default(),
            tax_rate_percent: DEFAULT_TAX_RATE_PERCENT,
            customer_type: CustomerType::default(),
            category: Category::default(),
        }
    }
}

impl BillConfig {
    pub fn charge_inputs(&self) -> ChargeInputs {
        ChargeInputs {
            customer_type: self.customer_type,
            category: self.category,
            tax_rate_percent: self.tax_rate_percent,
        }
    }

    pub fn bill(&self) -> Bill {
        compute_bill(&self.schedule, &self.tenants, self.charge_inputs())
    }

    /// Strips identifiers and expression memos.
    pub fn to_portable(&self) -> PortableConfig {
        PortableConfig {
            tiers: Some(
                self.schedule
                    .bands()
                    .iter()
                    .map(|b| BandSpec {
                        from: b.from,
                        to: b.to,
                        rate: b.rate,
                    })
                    .collect(),
            ),
            tenants: Some(
                self.tenants
                    .tenants()
                    .iter()
                    .map(|t| TenantSpec {
                        name: t.name.clone(),
                        consumption: t.consumption,
                    })
                    .collect(),
            ),
            tax_rate: Some(self.tax_rate_percent),
            customer_type: Some(self.customer_type),
            category: Some(self.category),
        }
    }

    /// Rebuilds a session from portable state with fresh identifiers. Absent
    /// fields take the fresh-session defaults.
    pub fn from_portable(portable: PortableConfig) -> Self {
        Self::default().with_overrides(portable)
    }

    /// Replaces every field present in `overrides`. Bands and tenants coming
    /// from `overrides` get fresh identifiers.
    pub fn with_overrides(mut self, overrides: PortableConfig) -> Self {
        if let Some(tiers) = overrides.tiers {
            self.schedule = TierSchedule::from_bands(
                tiers
                    .into_iter()
                    .map(|b| TierBand::new(b.from, b.to, b.rate))
                    .collect(),
            );
        }
        if let Some(tenants) = overrides.tenants {
            self.tenants = TenantSet::new(
                tenants
                    .into_iter()
                    .map(|t| Tenant::new(t.name, t.consumption))
                    .collect(),
            );
        }
        if let Some(rate) = overrides.tax_rate.filter(|v| v.is_finite()) {
            self.tax_rate_percent = rate;
        }
        if let Some(customer_type) = overrides.customer_type {
            self.customer_type = customer_type;
        }
        if let Some(category) = overrides.category {
            self.category = category;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    #[serde(with = "lenient_number")]
    pub from: f64,
    pub to: UpperBound,
    #[serde(with = "lenient_number")]
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "lenient_number", alias = "kWh", alias = "kwh")]
    pub consumption: f64,
}

/// Identifier-free configuration, as carried by share tokens and API payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortableConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<BandSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenants: Option<Vec<TenantSpec>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        alias = "serviceTaxRate",
        deserialize_with = "lenient_number::deserialize_option"
    )]
    pub tax_rate: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_choice::deserialize"
    )]
    pub customer_type: Option<CustomerType>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        alias = "icptCategory",
        deserialize_with = "lenient_choice::deserialize"
    )]
    pub category: Option<Category>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_portable_config_yields_session_defaults() {
        let config = BillConfig::from_portable(PortableConfig::default());
        let defaults = BillConfig::default();

        assert_eq!(config.schedule.len(), defaults.schedule.len());
        assert_eq!(config.tenants.len(), 1);
        assert_eq!(config.tax_rate_percent, DEFAULT_TAX_RATE_PERCENT);
        assert_eq!(config.customer_type, CustomerType::Domestic);
        assert_eq!(config.category, Category::Lv);
    }

    #[test]
    fn portable_round_trip_drops_ids_and_memos() {
        let mut config = BillConfig::default();
        let id = config.tenants.tenants()[0].id;
        config.tenants.apply_expression(id, "100 + 50").expect("valid");
        config.customer_type = CustomerType::NonDomestic;
        config.category = Category::Water;

        let rebuilt = BillConfig::from_portable(config.to_portable());

        assert_ne!(rebuilt.tenants.tenants()[0].id, id);
        assert!(rebuilt.tenants.tenants()[0].expression.is_none());
        assert_eq!(rebuilt.tenants.tenants()[0].consumption, 150.0);
        assert_eq!(rebuilt.to_portable(), config.to_portable());
    }

    #[test]
    fn overrides_replace_only_present_fields() {
        let mut base = BillConfig::default();
        base.tax_rate_percent = 6.0;
        base.tenants.add_tenant("Kept", 10.0);

        let merged = base.clone().with_overrides(PortableConfig {
            customer_type: Some(CustomerType::NonDomestic),
            ..PortableConfig::default()
        });

        assert_eq!(merged.tax_rate_percent, 6.0);
        assert_eq!(merged.tenants, base.tenants);
        assert_eq!(merged.schedule, base.schedule);
        assert_eq!(merged.customer_type, CustomerType::NonDomestic);
    }

    #[test]
    fn payload_fields_are_lenient() {
        let json = r#"{
          "tiers": [
            {"from": "1", "to": 100, "rate": ""},
            {"from": 101, "to": "Infinity", "rate": 0.5}
          ],
          "tenants": [{"name": "A", "kWh": "abc"}, {"consumption": 12}],
          "serviceTaxRate": 6,
          "customerType": "nonDomestic",
          "icptCategory": "mv_hv"
        }"#;
        let portable: PortableConfig = serde_json::from_str(json).expect("payload should parse");
        let config = BillConfig::from_portable(portable);

        let bands = config.schedule.bands();
        assert_eq!(bands[0].from, 1.0);
        assert_eq!(bands[0].rate, 0.0);
        assert!(bands[1].to.is_unbounded());
        assert_eq!(config.tenants.tenants()[0].consumption, 0.0);
        assert_eq!(config.tenants.tenants()[1].name, "");
        assert_eq!(config.tenants.tenants()[1].consumption, 12.0);
        assert_eq!(config.tax_rate_percent, 6.0);
        assert_eq!(config.customer_type, CustomerType::NonDomestic);
        assert_eq!(config.category, Category::MvHv);
    }

    #[test]
    fn charge_fields_are_coerced_not_rejected() {
        let parse = |json: &str| -> PortableConfig {
            serde_json::from_str(json).expect("payload should parse")
        };

        assert_eq!(parse(r#"{"taxRate": "6"}"#).tax_rate, Some(6.0));
        assert_eq!(parse(r#"{"taxRate": ""}"#).tax_rate, Some(0.0));
        assert_eq!(parse(r#"{"taxRate": "eight"}"#).tax_rate, Some(0.0));
        assert_eq!(parse(r#"{"taxRate": null}"#).tax_rate, None);

        let unknown = parse(r#"{"customerType": "industrial", "category": 7}"#);
        assert_eq!(unknown.customer_type, None);
        assert_eq!(unknown.category, None);

        let mut base = BillConfig::default();
        base.category = Category::Water;
        let merged = base.with_overrides(parse(r#"{"taxRate": "", "category": "bogus"}"#));
        assert_eq!(merged.tax_rate_percent, 0.0);
        assert_eq!(merged.category, Category::Water);
    }
}
