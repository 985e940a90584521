use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Platform subscription tier of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Starter,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starter" => Ok(Plan::Starter),
            "pro" => Ok(Plan::Pro),
            "enterprise" => Ok(Plan::Enterprise),
            other => Err(format!("unknown plan '{other}'")),
        }
    }
}

/// Gateway price id → plan.
#[derive(Debug, Clone, Default)]
pub struct PlanTable {
    prices: HashMap<String, Plan>,
}

impl PlanTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, price_id: impl Into<String>, plan: Plan) -> Self {
        let price_id = price_id.into();
        if !price_id.is_empty() {
            self.prices.insert(price_id, plan);
        }
        self
    }

    /// Unknown or missing price ids fall back to the starter plan.
    pub fn plan_for(&self, price_id: Option<&str>) -> Plan {
        price_id
            .and_then(|id| self.prices.get(id).copied())
            .unwrap_or_default()
    }

    /// Like [`plan_for`](Self::plan_for) but without the fallback.
    pub fn lookup(&self, price_id: &str) -> Option<Plan> {
        self.prices.get(price_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_price_defaults_to_starter() {
        let table = PlanTable::new()
            .with_price("price_pro", Plan::Pro)
            .with_price("", Plan::Enterprise);
        assert_eq!(table.plan_for(Some("price_pro")), Plan::Pro);
        assert_eq!(table.plan_for(Some("price_other")), Plan::Starter);
        assert_eq!(table.plan_for(None), Plan::Starter);
        assert_eq!(table.lookup(""), None);
    }
}
