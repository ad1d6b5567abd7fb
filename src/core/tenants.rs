use serde::Serialize;

use super::expr::{ExprError, evaluate_consumption};
use super::types::{TenantId, coerce_number};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub consumption: f64,
    /// Expression the consumption was last evaluated from. Display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl Tenant {
    pub fn new(name: impl Into<String>, consumption: f64) -> Self {
        Self {
            id: TenantId::new(),
            name: name.into(),
            consumption: clamp_consumption(consumption),
            expression: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TenantSet {
    tenants: Vec<Tenant>,
}

impl Default for TenantSet {
    /// A fresh session starts with one blank tenant.
    fn default() -> Self {
        Self {
            tenants: vec![Tenant::new("", 0.0)],
        }
    }
}

impl TenantSet {
    pub fn new(tenants: Vec<Tenant>) -> Self {
        Self { tenants }
    }

    pub fn empty() -> Self {
        Self {
            tenants: Vec::new(),
        }
    }

    pub fn tenants(&self) -> &[Tenant] {
        &self.tenants
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn get(&self, id: TenantId) -> Option<&Tenant> {
        self.tenants.iter().find(|t| t.id == id)
    }

    pub fn total_consumption(&self) -> f64 {
        self.tenants.iter().map(|t| t.consumption).sum()
    }

    pub fn add_tenant(&mut self, name: impl Into<String>, consumption: f64) -> TenantId {
        let tenant = Tenant::new(name, consumption);
        let id = tenant.id;
        self.tenants.push(tenant);
        id
    }

    pub fn remove_tenant(&mut self, id: TenantId) -> bool {
        let before = self.tenants.len();
        self.tenants.retain(|t| t.id != id);
        self.tenants.len() != before
    }

    pub fn rename(&mut self, id: TenantId, name: impl Into<String>) -> bool {
        match self.tenant_mut(id) {
            Some(tenant) => {
                tenant.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Stores a raw consumption field. Text that is not a number reads as zero.
    pub fn set_consumption_text(&mut self, id: TenantId, text: &str) -> bool {
        match self.tenant_mut(id) {
            Some(tenant) => {
                tenant.consumption = clamp_consumption(coerce_number(text));
                tenant.expression = None;
                true
            }
            None => false,
        }
    }

    /// Evaluates `expression` and stores the result as the tenant's
    /// consumption. On failure the stored consumption is left untouched.
    /// Returns `Ok(None)` when no tenant has that id.
    pub fn apply_expression(
        &mut self,
        id: TenantId,
        expression: &str,
    ) -> Result<Option<f64>, ExprError> {
        let Some(tenant) = self.tenant_mut(id) else {
            return Ok(None);
        };
        let value = evaluate_consumption(expression)?;
        tenant.consumption = value;
        tenant.expression = Some(expression.trim().to_string());
        Ok(Some(value))
    }

    /// Name used when presenting a tenant; blank names fall back to a
    /// positional label.
    pub fn display_name(&self, index: usize) -> String {
        match self.tenants.get(index) {
            Some(tenant) if !tenant.name.trim().is_empty() => tenant.name.clone(),
            _ => format!("Unit {}", index + 1),
        }
    }

    fn tenant_mut(&mut self, id: TenantId) -> Option<&mut Tenant> {
        self.tenants.iter_mut().find(|t| t.id == id)
    }
}

fn clamp_consumption(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
