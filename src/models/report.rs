// src/models/report.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// O que regenerar para um tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    Day(NaiveDate),
    AllHistory,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_report_request"))]
pub struct GenerateReportsPayload {
    #[schema(example = "2024-05-10")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub all_dates: bool,
}

fn validate_report_request(payload: &GenerateReportsPayload) -> Result<(), ValidationError> {
    if !payload.all_dates && payload.date.is_none() {
        let mut err = ValidationError::new("date_required");
        err.message = Some("Informe a data ou marque allDates.".into());
        return Err(err);
    }
    Ok(())
}

impl GenerateReportsPayload {
    pub fn scope(&self) -> ReportScope {
        match (self.all_dates, self.date) {
            (false, Some(date)) => ReportScope::Day(date),
            _ => ReportScope::AllHistory,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRunSummary {
    pub dates_processed: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSummary {
    pub transitioned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_resolves_scope() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

        let day = GenerateReportsPayload { date: Some(date), all_dates: false };
        assert!(day.validate().is_ok());
        assert_eq!(day.scope(), ReportScope::Day(date));

        let all = GenerateReportsPayload { date: Some(date), all_dates: true };
        assert_eq!(all.scope(), ReportScope::AllHistory);

        let empty = GenerateReportsPayload { date: None, all_dates: false };
        assert!(empty.validate().is_err());
    }
}
