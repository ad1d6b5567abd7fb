use super::engine::allocate;
use super::schedule::TierSchedule;
use super::tenants::TenantSet;
use super::types::{Allocation, Bill, Category, CustomerType, TenantResult};

/// Aggregate consumption above which sales tax is charged.
pub const TAX_EXEMPTION_KWH: f64 = 600.0;

#[derive(Debug, Clone, Copy)]
pub struct AdjustmentBand {
    pub max: f64,
    pub rate: f64,
    pub label: &'static str,
}

/// Domestic adjustment bands, ascending by threshold. The first band whose
/// `max` covers the aggregate consumption applies.
pub static DOMESTIC_ADJUSTMENT_BANDS: [AdjustmentBand; 3] = [
    AdjustmentBand {
        max: 600.0,
        rate: -0.02,
        label: "≤600 kWh (Rebate)",
    },
    AdjustmentBand {
        max: 1500.0,
        rate: 0.0,
        label: "601-1500 kWh",
    },
    AdjustmentBand {
        max: f64::INFINITY,
        rate: 0.10,
        label: ">1500 kWh",
    },
];

pub fn non_domestic_rate(category: Category) -> f64 {
    match category {
        Category::Lv => 0.027,
        Category::MvHv => 0.16,
        Category::Streetlight => 0.09,
        Category::Water => 0.027,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChargeInputs {
    pub customer_type: CustomerType,
    pub category: Category,
    pub tax_rate_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub rate: f64,
    pub label: String,
    pub amount: f64,
}

pub fn regulatory_adjustment(
    total_consumption: f64,
    customer_type: CustomerType,
    category: Category,
) -> Adjustment {
    let (rate, label) = match customer_type {
        CustomerType::Domestic => {
            let band = DOMESTIC_ADJUSTMENT_BANDS
                .iter()
                .find(|b| total_consumption <= b.max)
                .unwrap_or(&DOMESTIC_ADJUSTMENT_BANDS[DOMESTIC_ADJUSTMENT_BANDS.len() - 1]);
            (band.rate, format!("Domestic: {}", band.label))
        }
        CustomerType::NonDomestic => (
            non_domestic_rate(category),
            format!("Non-Domestic: {}", category.code().to_uppercase()),
        ),
    };
    Adjustment {
        rate,
        label,
        amount: total_consumption * rate,
    }
}

pub fn tax_applies(total_consumption: f64) -> bool {
    total_consumption > TAX_EXEMPTION_KWH
}

/// Tax on the aggregate bill; zero at or below the exemption threshold.
pub fn sales_tax(
    total_consumption: f64,
    tier_cost_total: f64,
    adjustment: f64,
    tax_rate_percent: f64,
) -> f64 {
    if tax_applies(total_consumption) {
        (tier_cost_total + adjustment) * tax_rate_percent / 100.0
    } else {
        0.0
    }
}

/// Fraction of the aggregate a tenant carries. Zero when nothing was
/// consumed at all.
pub fn consumption_share(consumption: f64, total_consumption: f64) -> f64 {
    if total_consumption > 0.0 {
        consumption / total_consumption
    } else {
        0.0
    }
}

/// Layers adjustment and tax on an allocation and apportions both by
/// consumption share. Nothing is rounded here.
pub fn compute_charges(allocation: Allocation, tenants: &TenantSet, inputs: ChargeInputs) -> Bill {
    let total_consumption: f64 = allocation.tenants.iter().map(|t| t.consumption).sum();
    let base_cost = allocation.tier_cost_total();
    let adjustment = regulatory_adjustment(total_consumption, inputs.customer_type, inputs.category);
    let tax = sales_tax(
        total_consumption,
        base_cost,
        adjustment.amount,
        inputs.tax_rate_percent,
    );

    let tenant_results = allocation
        .tenants
        .into_iter()
        .enumerate()
        .map(|(idx, tenant)| {
            let share = consumption_share(tenant.consumption, total_consumption);
            let tenant_adjustment = adjustment.amount * share;
            let tenant_tax = tax * share;
            TenantResult {
                tenant_id: tenant.tenant_id,
                name: tenants.display_name(idx),
                consumption: tenant.consumption,
                total: tenant.base_cost + tenant_adjustment + tenant_tax,
                breakdown: tenant.breakdown,
                base_cost: tenant.base_cost,
                adjustment: tenant_adjustment,
                tax: tenant_tax,
            }
        })
        .collect();

    Bill {
        tiers: allocation.tiers,
        tenants: tenant_results,
        total_consumption,
        base_cost,
        adjustment_rate: adjustment.rate,
        adjustment_label: adjustment.label,
        adjustment: adjustment.amount,
        tax_applies: tax_applies(total_consumption),
        tax_rate_percent: inputs.tax_rate_percent,
        tax,
        grand_total: base_cost + adjustment.amount + tax,
    }
}

/// Full pass: allocation followed by charges.
pub fn compute_bill(schedule: &TierSchedule, tenants: &TenantSet, inputs: ChargeInputs) -> Bill {
    compute_charges(allocate(schedule, tenants), tenants, inputs)
}
