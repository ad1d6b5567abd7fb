mod charges;
pub mod codec;
mod config;
mod engine;
pub mod expr;
mod schedule;
mod tenants;
mod types;

pub use charges::{
    Adjustment, AdjustmentBand, ChargeInputs, DOMESTIC_ADJUSTMENT_BANDS, TAX_EXEMPTION_KWH,
    compute_bill, compute_charges, consumption_share, non_domestic_rate, regulatory_adjustment,
    sales_tax, tax_applies,
};
pub use codec::{CodecError, SHARE_PARAM};
pub use config::{BandSpec, BillConfig, DEFAULT_TAX_RATE_PERCENT, PortableConfig, TenantSpec};
pub use engine::allocate;
pub use expr::ExprError;
pub use schedule::{BandField, DEFAULT_NEW_BAND_RATE, TierBand, TierSchedule};
pub use tenants::{Tenant, TenantSet};
pub use types::{
    Allocation, BandId, Bill, BreakdownEntry, Category, CustomerType, TenantAllocation, TenantId,
    TenantResult, TierResult, UNBOUNDED_SENTINEL, UpperBound, coerce_number,
};
