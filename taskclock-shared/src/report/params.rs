/// Report filter parsing
///
/// Query parameters arrive as raw strings. Every parameter is parsed before
/// any error is returned, so a request with several bad parameters gets all
/// of them reported at once.

use crate::error::{DomainError, DomainResult, FieldError};
use crate::models::time_log::LogWindow;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

/// Raw report query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportParams {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub top: Option<String>,
    pub user: Option<String>,
}

/// Parsed report filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportFilters {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub top: Option<i64>,
    /// Report on this user instead of the caller
    pub user: Option<Uuid>,
}

/// Fully resolved report request; also the cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportQuery {
    /// Whose logs are reported
    pub subject: Uuid,
    pub window: LogWindow,
    /// Positive limit on the number of tasks
    pub top: Option<usize>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ReportParams {
    /// Parses all parameters, collecting every invalid one
    pub fn parse(&self) -> DomainResult<ReportFilters> {
        let mut errors = Vec::new();
        let mut filters = ReportFilters::default();

        for (field, raw, slot) in [
            ("date_from", &self.date_from, &mut filters.date_from),
            ("date_to", &self.date_to, &mut filters.date_to),
        ] {
            if let Some(raw) = present(raw) {
                match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                    Ok(date) => *slot = Some(date),
                    Err(_) => errors.push(FieldError::new(field, "Enter a valid date.")),
                }
            }
        }

        if let Some(raw) = present(&self.top) {
            match raw.parse::<i64>() {
                Ok(top) => filters.top = Some(top),
                Err(_) => errors.push(FieldError::new("top", "Enter a number.")),
            }
        }

        if let Some(raw) = present(&self.user) {
            match Uuid::parse_str(raw) {
                Ok(user) => filters.user = Some(user),
                Err(_) => errors.push(FieldError::new("user", "Enter a valid UUID.")),
            }
        }

        if errors.is_empty() {
            Ok(filters)
        } else {
            Err(DomainError::Validation(errors))
        }
    }
}

impl ReportFilters {
    /// Resolves defaults against the caller and the current UTC date
    ///
    /// With neither date given the window is the current month up to
    /// `today`. A single bound leaves the other side open. `top <= 0` means
    /// no limit.
    pub fn resolve(&self, caller: Uuid, today: NaiveDate) -> ReportQuery {
        let window = match (self.date_from, self.date_to) {
            (None, None) => LogWindow::EndDate {
                from: today.with_day(1),
                to: Some(today),
            },
            (from, to) => LogWindow::EndDate { from, to },
        };

        ReportQuery {
            subject: self.user.unwrap_or(caller),
            window,
            top: self.top.filter(|top| *top > 0).map(|top| top as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(date_from: &str, date_to: &str, top: &str, user: &str) -> ReportParams {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ReportParams {
            date_from: opt(date_from),
            date_to: opt(date_to),
            top: opt(top),
            user: opt(user),
        }
    }

    #[test]
    fn test_parse_valid() {
        let user = Uuid::new_v4();
        let filters = params("2024-11-01", "2024-11-07", "3", &user.to_string())
            .parse()
            .unwrap();

        assert_eq!(filters.date_from, NaiveDate::from_ymd_opt(2024, 11, 1));
        assert_eq!(filters.date_to, NaiveDate::from_ymd_opt(2024, 11, 7));
        assert_eq!(filters.top, Some(3));
        assert_eq!(filters.user, Some(user));
    }

    #[test]
    fn test_parse_collects_all_errors() {
        let err = params("invalid", "also-invalid", "not-a-number", "nope")
            .parse()
            .unwrap_err();

        match err {
            DomainError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["date_from", "date_to", "top", "user"]);
                assert_eq!(fields[0].message, "Enter a valid date.");
                assert_eq!(fields[2].message, "Enter a number.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_values_are_absent() {
        let filters = ReportParams {
            date_from: Some(String::new()),
            top: Some("  ".to_string()),
            ..Default::default()
        }
        .parse()
        .unwrap();
        assert_eq!(filters, ReportFilters::default());
    }

    #[test]
    fn test_default_window_is_month_to_date() {
        let caller = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2024, 11, 18).unwrap();
        let query = ReportFilters::default().resolve(caller, today);

        assert_eq!(query.subject, caller);
        assert_eq!(
            query.window,
            LogWindow::EndDate {
                from: NaiveDate::from_ymd_opt(2024, 11, 1),
                to: Some(today),
            }
        );
        assert_eq!(query.top, None);
    }

    #[test]
    fn test_single_bound_leaves_other_side_open() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 18).unwrap();
        let filters = ReportFilters {
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };

        assert_eq!(
            filters.resolve(Uuid::new_v4(), today).window,
            LogWindow::EndDate {
                from: NaiveDate::from_ymd_opt(2024, 1, 1),
                to: None,
            }
        );
    }

    #[test]
    fn test_non_positive_top_means_no_limit() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 18).unwrap();
        for top in [0, -1] {
            let filters = ReportFilters {
                top: Some(top),
                ..Default::default()
            };
            assert_eq!(filters.resolve(Uuid::new_v4(), today).top, None);
        }
    }

    #[test]
    fn test_user_filter_replaces_caller() {
        let other = Uuid::new_v4();
        let filters = ReportFilters {
            user: Some(other),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 11, 18).unwrap();
        assert_eq!(filters.resolve(Uuid::new_v4(), today).subject, other);
    }
}
