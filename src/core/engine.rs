use tracing::trace;

use super::schedule::TierSchedule;
use super::tenants::TenantSet;
use super::types::{Allocation, BreakdownEntry, TenantAllocation, TierResult};

/// Per-run scratch state for one tenant. Built fresh on every call.
#[derive(Debug)]
struct TenantState {
    remaining: f64,
    usage: Vec<f64>,
}

/// Pushes aggregate demand through the bands in schedule order. Within a
/// band, tenants with less outstanding demand are filled completely before
/// anyone receives more than an equal share of what is left (max-min fair).
pub fn allocate(schedule: &TierSchedule, tenants: &TenantSet) -> Allocation {
    let bands = schedule.bands();
    let mut states: Vec<TenantState> = tenants
        .tenants()
        .iter()
        .map(|t| TenantState {
            remaining: t.consumption.max(0.0),
            usage: vec![0.0; bands.len()],
        })
        .collect();

    let mut tiers = Vec::with_capacity(bands.len());
    for (tier_idx, band) in bands.iter().enumerate() {
        let remaining_demand: f64 = states.iter().map(|s| s.remaining).sum();
        let capacity = band.capacity().unwrap_or(f64::INFINITY);
        let usage = if capacity >= remaining_demand {
            absorb_all(&mut states, tier_idx)
        } else {
            water_fill(&mut states, tier_idx, capacity)
        };

        tiers.push(TierResult {
            tier_id: band.id,
            from: band.from,
            to: band.to,
            rate: band.rate,
            usage,
            cost: usage * band.rate,
        });
    }

    let tenants = tenants
        .tenants()
        .iter()
        .zip(states)
        .map(|(tenant, state)| {
            let breakdown: Vec<BreakdownEntry> = bands
                .iter()
                .zip(state.usage)
                .map(|(band, usage)| BreakdownEntry {
                    tier_id: band.id,
                    usage,
                    rate: band.rate,
                    cost: usage * band.rate,
                })
                .collect();
            let base_cost = breakdown.iter().map(|b| b.cost).sum();
            TenantAllocation {
                tenant_id: tenant.id,
                consumption: tenant.consumption.max(0.0),
                breakdown,
                base_cost,
            }
        })
        .collect();

    Allocation { tiers, tenants }
}

/// The band can take everything still outstanding, which is where the
/// equal-share rounds converge anyway: every tenant is drained.
fn absorb_all(states: &mut [TenantState], tier_idx: usize) -> f64 {
    let mut taken = 0.0;
    for state in states.iter_mut().filter(|s| s.remaining > 0.0) {
        state.usage[tier_idx] += state.remaining;
        taken += state.remaining;
        state.remaining = 0.0;
    }
    taken
}

fn water_fill(states: &mut [TenantState], tier_idx: usize, capacity: f64) -> f64 {
    let intake = capacity.max(0.0);
    let mut left = intake;
    let mut rounds = 0_u32;

    while left > 0.0 {
        let active = states.iter().filter(|s| s.remaining > 0.0).count();
        if active == 0 {
            break;
        }
        let share = left / active as f64;
        let mut allocated = 0.0;
        for state in states.iter_mut().filter(|s| s.remaining > 0.0) {
            let take = state.remaining.min(share);
            state.usage[tier_idx] += take;
            state.remaining -= take;
            allocated += take;
        }
        rounds += 1;
        // Floating-point residue can shrink `share` to nothing.
        if allocated <= 0.0 {
            break;
        }
        left -= allocated;
    }

    trace!(tier_idx, rounds, intake, left, "water-fill pass");
    intake - left.max(0.0)
}
