use rusqlite::types::Value;
use rusqlite::ToSql;
use thiserror::Error;
use tracing::info;

use crate::database::repo::{LocalStore, QueryError, QueryResult};
use crate::reports::catalog::{ChartHint, ParamKind, ReportDefinition, CATALOG};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unknown report '{0}'. Run `reports` to list the catalog")]
    NotFound(String),
    #[error("report '{report}' has no parameter '{param}'")]
    UnknownParam { report: String, param: String },
    #[error("parameter '{param}' expects an integer, got '{value}'")]
    InvalidParam { param: String, value: String },
    #[error(transparent)]
    Query(#[from] QueryError),
}

#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub definition: &'static ReportDefinition,
    pub result: QueryResult,
}

impl ReportOutput {
    pub fn chart(&self) -> Option<ChartHint> {
        self.definition.chart
    }
}

pub struct ReportEngine {
    catalog: &'static [ReportDefinition],
}

impl Default for ReportEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEngine {
    pub fn new() -> Self {
        Self { catalog: CATALOG }
    }

    #[cfg(test)]
    pub fn with_catalog(catalog: &'static [ReportDefinition]) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'static [ReportDefinition] {
        self.catalog
    }

    pub fn find(&self, id: &str) -> Result<&'static ReportDefinition, ReportError> {
        self.catalog
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ReportError::NotFound(id.to_string()))
    }

    /// Runs a catalog report. Parameters not given fall back to their defaults.
    pub fn run(
        &self,
        store: &LocalStore,
        id: &str,
        params: &[(String, String)],
    ) -> Result<ReportOutput, ReportError> {
        let definition = self.find(id)?;

        if let Some((name, _)) = params
            .iter()
            .find(|(name, _)| !definition.params.iter().any(|p| p.name == name))
        {
            return Err(ReportError::UnknownParam {
                report: id.to_string(),
                param: name.clone(),
            });
        }

        let mut bound: Vec<(String, Value)> = Vec::with_capacity(definition.params.len());
        for spec in definition.params {
            let raw = params
                .iter()
                .rev()
                .find(|(name, _)| name == spec.name)
                .map(|(_, v)| v.as_str())
                .unwrap_or(spec.default);
            let value = match spec.kind {
                ParamKind::Text => Value::Text(raw.to_string()),
                ParamKind::Integer => Value::Integer(raw.trim().parse().map_err(|_| ReportError::InvalidParam {
                    param: spec.name.to_string(),
                    value: raw.to_string(),
                })?),
            };
            bound.push((format!(":{}", spec.name), value));
        }

        let named: Vec<(&str, &dyn ToSql)> = bound
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();
        let result = store.query(definition.sql, &named)?;
        info!(report = id, rows = result.rows.len(), "Report generated");

        Ok(ReportOutput { definition, result })
    }
}
