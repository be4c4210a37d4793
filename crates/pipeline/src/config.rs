//! Pipeline run configuration.

use metrics_core::{Error, Result, SuppressionRule};
use serde::{Deserialize, Serialize};

use crate::family::EntityFamily;

/// Suppression thresholds per family. A row is published only when its
/// cohort size is strictly greater than the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_job_offers_threshold")]
    pub job_offers: f64,
    #[serde(default = "default_partners_threshold")]
    pub partners: f64,
    #[serde(default = "default_users_threshold")]
    pub users: f64,
}

fn default_job_offers_threshold() -> f64 {
    20.0
}

fn default_partners_threshold() -> f64 {
    30.0
}

fn default_users_threshold() -> f64 {
    20.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            job_offers: default_job_offers_threshold(),
            partners: default_partners_threshold(),
            users: default_users_threshold(),
        }
    }
}

impl Thresholds {
    pub fn for_family(&self, family: EntityFamily) -> f64 {
        match family {
            EntityFamily::JobOffers => self.job_offers,
            EntityFamily::Partners => self.partners,
            EntityFamily::Users => self.users,
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Database the tables are published into
    #[serde(default = "default_output_namespace")]
    pub output_namespace: String,
    /// Run families as concurrent tasks
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Families to run, in report order
    #[serde(default = "default_families")]
    pub families: Vec<EntityFamily>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_output_namespace() -> String {
    "dev".to_string()
}

fn default_parallel() -> bool {
    true
}

fn default_families() -> Vec<EntityFamily> {
    EntityFamily::ALL.to_vec()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_namespace: default_output_namespace(),
            parallel: default_parallel(),
            families: default_families(),
            thresholds: Thresholds::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.output_namespace = namespace.into();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_families(mut self, families: Vec<EntityFamily>) -> Self {
        self.families = families;
        self
    }

    /// Suppression rule applied to `family`'s published table.
    pub fn rule(&self, family: EntityFamily) -> SuppressionRule {
        SuppressionRule::new(family.cohort_column(), self.thresholds.for_family(family))
    }

    /// Enabled families, first occurrence wins.
    pub fn enabled_families(&self) -> Vec<EntityFamily> {
        let mut seen = Vec::with_capacity(self.families.len());
        for family in &self.families {
            if !seen.contains(family) {
                seen.push(*family);
            }
        }
        seen
    }

    pub fn validate(&self) -> Result<()> {
        let ns = &self.output_namespace;
        if ns.is_empty() || !ns.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::config(format!("invalid output namespace: {:?}", ns)));
        }
        if self.families.is_empty() {
            return Err(Error::config("no entity families enabled"));
        }
        for family in EntityFamily::ALL {
            let threshold = self.thresholds.for_family(family);
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(Error::config(format!(
                    "invalid suppression threshold for {}: {}",
                    family, threshold
                )));
            }
        }
        Ok(())
    }
}
