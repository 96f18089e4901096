//! Highest open-interest option contracts per expiration window.

use crate::error::ApiError;
use crate::fetch::{BatchRunner, aggregate};
use crate::models::{FailureDetail, HighOpenInterestResponse, OptionContract, OptionType};
use crate::upstream::{AlpacaClient, ExpirationWindow, UpstreamError};
use chrono::{Days, NaiveDate};
use std::cmp::Reverse;
use tracing::{info, warn};

/// Days from today covered by the short-term window.
pub const SHORT_TERM_DAYS: (u64, u64) = (1, 60);
/// Days from today covered by the LEAP window.
pub const LEAP_DAYS: (u64, u64) = (365, 730);

fn window(label: &str, today: NaiveDate, (from, to): (u64, u64)) -> Result<ExpirationWindow, ApiError> {
    let shift = |days| {
        today
            .checked_add_days(Days::new(days))
            .ok_or_else(|| ApiError::Internal(format!("date overflow adding {days} days to {today}")))
    };
    Ok(ExpirationWindow {
        label: label.to_string(),
        start: shift(from)?,
        end: shift(to)?,
    })
}

/// Short-term and LEAP windows relative to `today`.
///
/// # Errors
/// Returns [`ApiError::Internal`] if the dates overflow the calendar.
pub fn expiration_windows(today: NaiveDate) -> Result<Vec<ExpirationWindow>, ApiError> {
    Ok(vec![
        window("short_term", today, SHORT_TERM_DAYS)?,
        window("leap", today, LEAP_DAYS)?,
    ])
}

/// Contract with the largest open interest; the first one listed wins ties.
#[must_use]
pub fn highest_open_interest(contracts: Vec<OptionContract>) -> Option<OptionContract> {
    contracts
        .into_iter()
        .min_by_key(|c| Reverse(c.open_interest_value()))
}

/// Options service. Without Alpaca credentials every call fails.
#[derive(Debug, Clone)]
pub struct OptionsService {
    client: Option<AlpacaClient>,
    runner: BatchRunner,
}

impl OptionsService {
    /// Creates the service. `client` is `None` when credentials are missing.
    #[must_use]
    pub fn new(client: Option<AlpacaClient>, runner: BatchRunner) -> Self {
        Self { client, runner }
    }

    /// Finds the highest open-interest contract in each window.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidRequest`] when Alpaca rejects the ticker,
    /// [`ApiError::AggregateFailure`] when every window failed otherwise, and
    /// [`ApiError::Internal`] when credentials are not configured.
    pub async fn high_open_interest(
        &self,
        ticker: &str,
        option_type: OptionType,
        today: NaiveDate,
    ) -> Result<HighOpenInterestResponse, ApiError> {
        let Some(client) = &self.client else {
            return Err(ApiError::Internal(
                "Alpaca API credentials are not configured".to_string(),
            ));
        };

        let windows = expiration_windows(today)?;
        let result = self
            .runner
            .run(windows, |window: ExpirationWindow| async move {
                client
                    .option_contracts(ticker, option_type, &window)
                    .await
                    .map(highest_open_interest)
            })
            .await;

        let invalid_ticker = !result.is_empty()
            && result.iter().all(|entry| {
                matches!(
                    &entry.outcome,
                    Err(failure) if matches!(failure.last_error, UpstreamError::InvalidTicker(_))
                )
            });
        if invalid_ticker {
            warn!(ticker, "invalid ticker symbol");
            return Err(UpstreamError::InvalidTicker(ticker.to_string()).into());
        }

        let report = aggregate(result);
        if report.is_complete_failure {
            return Err(ApiError::AggregateFailure {
                message: format!("Failed to fetch option contracts for {ticker}"),
                failures: report.failed.into_iter().map(FailureDetail::from).collect(),
            });
        }

        let failures: Vec<FailureDetail> =
            report.failed.iter().cloned().map(FailureDetail::from).collect();
        let error = report.is_partial_failure.then(|| {
            let labels: Vec<&str> = failures.iter().map(|f| f.label.as_str()).collect();
            format!("Failed to load expiration windows: {}", labels.join(", "))
        });

        let mut short_term = None;
        let mut leap = None;
        for item in report.succeeded {
            match item.index {
                0 => short_term = item.value,
                _ => leap = item.value,
            }
        }

        info!(
            ticker,
            %option_type,
            short_term = short_term.is_some(),
            leap = leap.is_some(),
            "high open-interest lookup finished"
        );

        Ok(HighOpenInterestResponse {
            ticker: ticker.to_string(),
            option_type,
            short_term,
            leap,
            error,
            failures,
        })
    }
}
