//! Single-lookup engine: one end-to-end page interaction per phone number.
//!
//! The contract is deliberate: [`PhoneLookup::lookup`] never fails. Every
//! failure path is rendered into the `error` field of the returned result,
//! so a batch driver can iterate without branching on item outcomes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use phonescout_shared::{CarrierGatewayTable, LookupConfig, PhoneLookupResult};

use crate::error::LookupError;
use crate::page::PageDriver;
use crate::selectors::{
    COMPANY_VALUE, LINE_TYPE_VALUE, LOCATION_VALUE, PHONE_INPUT_CHAIN, PHONE_NUMBER_LABEL,
    REPORT_DATE_LABEL, SEARCH_BUTTON_CHAIN, Selector,
};
use crate::session::{SessionProvider, WebDriverSessions};

/// One phone-number lookup against the external page.
#[async_trait]
pub trait PhoneLookup: Send + Sync {
    /// Look up a single number. Never fails; inspect `error` on the result.
    /// Cancellation is observed at every suspension point and reported like
    /// any other failure.
    async fn lookup(&self, phone: &str, cancel: &CancellationToken) -> PhoneLookupResult;
}

// ---------------------------------------------------------------------------
// LookupEngine
// ---------------------------------------------------------------------------

/// Engine tying a session provider to the page-interaction sequence.
pub struct LookupEngine<S: SessionProvider> {
    sessions: S,
    policy: LookupConfig,
    gateways: CarrierGatewayTable,
}

impl<S: SessionProvider> LookupEngine<S> {
    pub fn new(sessions: S, policy: LookupConfig) -> Self {
        Self {
            sessions,
            policy,
            gateways: CarrierGatewayTable::builtin(),
        }
    }
}

/// The production engine: one WebDriver session per lookup.
pub type WebDriverLookup = LookupEngine<WebDriverSessions>;

impl WebDriverLookup {
    pub fn from_config(config: LookupConfig) -> Self {
        Self::new(WebDriverSessions::new(config.clone()), config)
    }
}

#[async_trait]
impl<S: SessionProvider> PhoneLookup for LookupEngine<S> {
    async fn lookup(&self, phone: &str, cancel: &CancellationToken) -> PhoneLookupResult {
        if phone.trim().is_empty() {
            return PhoneLookupResult::empty_input(phone);
        }

        let mut page = match self.sessions.acquire(cancel).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "could not acquire a browser session");
                return PhoneLookupResult::failure(phone, e.to_string());
            }
        };

        let result = drive_lookup(&mut page, phone, &self.policy, &self.gateways, cancel).await;

        // Release on every path. Failures are already recorded in `result`.
        self.sessions.release(page).await;
        result
    }
}

// ---------------------------------------------------------------------------
// Page-interaction sequence
// ---------------------------------------------------------------------------

/// Drive the full interaction sequence on an already-acquired page.
///
/// Extraction stops at the first field that cannot be read; fields captured
/// before that point stay on the result alongside the error.
#[instrument(skip_all, fields(phone = %phone))]
pub async fn drive_lookup<P: PageDriver>(
    page: &mut P,
    phone: &str,
    policy: &LookupConfig,
    gateways: &CarrierGatewayTable,
    cancel: &CancellationToken,
) -> PhoneLookupResult {
    let mut result = PhoneLookupResult {
        phone: phone.to_string(),
        ..Default::default()
    };

    if let Err(e) = run_sequence(page, phone, policy, cancel, &mut result).await {
        warn!(error = %e, "lookup failed");
        result.error = e.to_string();
    }

    result.with_derived(gateways)
}

async fn run_sequence<P: PageDriver>(
    page: &mut P,
    phone: &str,
    policy: &LookupConfig,
    cancel: &CancellationToken,
    result: &mut PhoneLookupResult,
) -> Result<(), LookupError> {
    if cancel.is_cancelled() {
        return Err(LookupError::Cancelled);
    }

    let opened = tokio::select! {
        _ = cancel.cancelled() => return Err(LookupError::Cancelled),
        r = tokio::time::timeout(policy.results_timeout, page.open(&policy.target_url)) => r,
    };
    match opened {
        Ok(Ok(())) => debug!(url = %policy.target_url, "loaded lookup page"),
        Ok(Err(e)) => return Err(LookupError::navigation(&policy.target_url, e)),
        Err(_) => {
            return Err(LookupError::navigation(
                &policy.target_url,
                "page load timed out",
            ));
        }
    }

    let input = locate(page, &PHONE_INPUT_CHAIN, policy, cancel)
        .await?
        .ok_or(LookupError::InputFieldNotFound)?;
    debug!(selector = %input, "found input field");

    page.fill(&input, phone)
        .await
        .map_err(|e| LookupError::Fill(e.to_string()))?;
    sleep_or_cancel(policy.fill_settle, cancel).await?;

    let button = locate(page, &SEARCH_BUTTON_CHAIN, policy, cancel)
        .await?
        .ok_or(LookupError::SearchButtonNotFound)?;
    debug!(selector = %button, "found search button");

    page.click(&button)
        .await
        .map_err(|e| LookupError::Submit(e.to_string()))?;

    // The echoed number doubles as the render signal for the results panel,
    // so it gets the long timeout; the remaining fields are already on the
    // page once it appears.
    result.phone =
        extract(page, "phone number", &PHONE_NUMBER_LABEL, policy.results_timeout, cancel).await?;
    result.report_date =
        extract(page, "report date", &REPORT_DATE_LABEL, policy.extract_timeout, cancel).await?;
    result.line_type =
        extract(page, "line type", &LINE_TYPE_VALUE, policy.extract_timeout, cancel).await?;
    result.company =
        extract(page, "company", &COMPANY_VALUE, policy.extract_timeout, cancel).await?;
    result.location =
        extract(page, "location", &LOCATION_VALUE, policy.extract_timeout, cancel).await?;

    debug!("extracted all result fields");
    Ok(())
}

/// Walk a selector chain until one candidate probes as usable, polling up to
/// the configured element timeout. `Ok(None)` means the chain never matched.
async fn locate<P: PageDriver>(
    page: &mut P,
    chain: &[Selector],
    policy: &LookupConfig,
    cancel: &CancellationToken,
) -> Result<Option<Selector>, LookupError> {
    let deadline = Instant::now() + policy.element_timeout;
    loop {
        for selector in chain {
            if page.probe(selector).await {
                return Ok(Some(*selector));
            }
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep_or_cancel(policy.poll_interval, cancel).await?;
    }
}

/// Read one result field, racing the page wait against cancellation.
async fn extract<P: PageDriver>(
    page: &mut P,
    field: &'static str,
    selector: &Selector,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, LookupError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(LookupError::Cancelled),
        read = page.read_text(selector, timeout) => read
            .map(|text| text.trim().to_string())
            .map_err(|e| LookupError::extraction(field, e)),
    }
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<(), LookupError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(LookupError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
