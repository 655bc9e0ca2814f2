//! Métriques d'impact des projets financés

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::error::DaoError;
use super::DaoResult;

/// Longueur maximale de la référence du rapport
pub const MAX_REPORT_REFERENCE_LENGTH: usize = 512;

/// Impact déclaré d'un projet exécuté
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImpactMetrics {
    /// CO2 compensé (tonnes)
    pub co2_offset_tonnes: u64,
    pub trees_planted: u64,
    /// Énergie propre produite (kWh)
    pub energy_generated_kwh: u64,
    pub people_reached: u64,
    /// Référence libre vers le rapport (URL, CID, ...)
    pub report_reference: String,
    /// Dernière mise à jour, fixée par la DAO
    pub updated_at: Option<DateTime<Utc>>,
}

impl ImpactMetrics {
    pub fn validate(&self) -> DaoResult<()> {
        let length = self.report_reference.chars().count();
        if length > MAX_REPORT_REFERENCE_LENGTH {
            return Err(DaoError::FieldTooLong {
                field: "report_reference",
                length,
                max: MAX_REPORT_REFERENCE_LENGTH,
            });
        }
        Ok(())
    }
}

/// Impact cumulé sur l'ensemble des projets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub co2_offset_tonnes: u64,
    pub trees_planted: u64,
    pub energy_generated_kwh: u64,
    pub people_reached: u64,
    pub reporting_projects: usize,
}

impl ImpactSummary {
    pub fn accumulate(&mut self, metrics: &ImpactMetrics) {
        self.co2_offset_tonnes = self.co2_offset_tonnes.saturating_add(metrics.co2_offset_tonnes);
        self.trees_planted = self.trees_planted.saturating_add(metrics.trees_planted);
        self.energy_generated_kwh = self.energy_generated_kwh.saturating_add(metrics.energy_generated_kwh);
        self.people_reached = self.people_reached.saturating_add(metrics.people_reached);
        self.reporting_projects += 1;
    }
}
