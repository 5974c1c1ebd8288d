use std::str::FromStr;

use chrono::{DateTime, Datelike, Month, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use store::{PopularItem, ReportBucket, SalesReports, SalesTotal};

use crate::error::{Result, ValidationError};

/// Granularity of the orders-by-period report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    /// One bucket per day of a month.
    Day,
    /// One bucket per month of a year.
    Month,
}

impl FromStr for ReportPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(ReportPeriod::Day),
            "month" => Ok(ReportPeriod::Month),
            _ => Err(ValidationError::InvalidPeriod(s.to_string())),
        }
    }
}

/// Orders placed in one day or month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodCount {
    pub key: String,
    pub count: u64,
}

/// Order counts for every day of a month or every month of a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodReport {
    pub period: ReportPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    pub year: i32,
    pub ordered_items: Vec<PeriodCount>,
}

/// Read-only aggregates over committed orders.
pub struct ReportService<R> {
    reports: R,
}

impl<R: SalesReports> ReportService<R> {
    pub const DEFAULT_POPULAR_LIMIT: usize = 10;
    pub const MAX_POPULAR_LIMIT: usize = 100;

    pub fn new(reports: R) -> Self {
        Self { reports }
    }

    /// Revenue over closed orders.
    #[tracing::instrument(skip(self))]
    pub async fn total_sales(&self) -> Result<SalesTotal> {
        Ok(self.reports.total_sales().await?)
    }

    /// Best sellers; `limit` defaults to 10 and is capped at 100.
    #[tracing::instrument(skip(self))]
    pub async fn popular_items(&self, limit: Option<usize>) -> Result<Vec<PopularItem>> {
        let limit = match limit {
            None | Some(0) => Self::DEFAULT_POPULAR_LIMIT,
            Some(n) => n.min(Self::MAX_POPULAR_LIMIT),
        };
        Ok(self.reports.popular_items(limit).await?)
    }

    /// Quantity ordered per product between two calendar days, both
    /// inclusive. Either end may be left open.
    #[tracing::instrument(skip(self))]
    pub async fn ordered_items(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PopularItem>> {
        if let (Some(start), Some(end)) = (start, end)
            && start > end
        {
            return Err(ValidationError::InvalidDateRange { start, end }.into());
        }

        let from = start.map(midnight);
        let to = end.and_then(|d| d.succ_opt()).map(midnight);
        Ok(self.reports.ordered_items_between(from, to).await?)
    }

    /// Orders placed per day of `month`, or per month of the year.
    ///
    /// `month` accepts a name ("march", "Mar") or a number and is required
    /// for the daily breakdown. `year` defaults to the current one.
    #[tracing::instrument(skip(self))]
    pub async fn ordered_items_by_period(
        &self,
        period: &str,
        month: Option<&str>,
        year: Option<i32>,
    ) -> Result<PeriodReport> {
        let period: ReportPeriod = period.parse()?;
        let year = year.unwrap_or_else(|| Utc::now().year());

        match period {
            ReportPeriod::Day => {
                let month = parse_month(month.ok_or(ValidationError::MonthRequired)?)?;
                let first = first_of(year, month.number_from_month())?;
                let next = next_month(first)?;
                let counts = self
                    .reports
                    .order_counts(ReportBucket::DayOfMonth, midnight(first), midnight(next))
                    .await?;
                let days = next.signed_duration_since(first).num_days() as u32;

                Ok(PeriodReport {
                    period,
                    month: Some(month.name().to_lowercase()),
                    year,
                    ordered_items: (1..=days)
                        .map(|day| PeriodCount {
                            key: day.to_string(),
                            count: counts.get(&day).copied().unwrap_or(0),
                        })
                        .collect(),
                })
            }
            ReportPeriod::Month => {
                let first = first_of(year, 1)?;
                let next = first_of(
                    year.checked_add(1)
                        .ok_or(ValidationError::InvalidYear { year })?,
                    1,
                )?;
                let counts = self
                    .reports
                    .order_counts(ReportBucket::Month, midnight(first), midnight(next))
                    .await?;

                Ok(PeriodReport {
                    period,
                    month: None,
                    year,
                    ordered_items: (1..=12u32)
                        .filter_map(|n| Month::try_from(n as u8).ok())
                        .map(|month| PeriodCount {
                            key: month.name().to_lowercase(),
                            count: counts
                                .get(&month.number_from_month())
                                .copied()
                                .unwrap_or(0),
                        })
                        .collect(),
                })
            }
        }
    }
}

fn parse_month(raw: &str) -> std::result::Result<Month, ValidationError> {
    let invalid = || ValidationError::InvalidMonth(raw.to_string());
    match raw.trim().parse::<u8>() {
        Ok(n) => Month::try_from(n).map_err(|_| invalid()),
        Err(_) => raw.trim().parse::<Month>().map_err(|_| invalid()),
    }
}

fn first_of(year: i32, month: u32) -> std::result::Result<NaiveDate, ValidationError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(ValidationError::InvalidYear { year })
}

fn next_month(first: NaiveDate) -> std::result::Result<NaiveDate, ValidationError> {
    if first.month() == 12 {
        let year = first.year();
        first_of(year.checked_add(1).ok_or(ValidationError::InvalidYear { year })?, 1)
    } else {
        first_of(first.year(), first.month() + 1)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
