//! REST API client for the brokerage

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};
use url::Url;

use super::auth::{password_grant, BearerToken};
use super::messages::*;
use crate::common::errors::{ClientError, Result};
use crate::common::traits::{Brokerage, MAX_FUNDAMENTALS_BATCH};
use crate::common::types::{
    Fundamentals, Historical, Instrument, Interval, OrderIntent, OrderResult, Position, Quote,
    Span,
};
use crate::config::types::BrokerageConfig;

/// Upper bound on pages followed for a single list request
const MAX_PAGES: usize = 50;

/// REST API client for the brokerage
#[derive(Debug, Clone)]
pub struct BrokerageRestClient {
    /// HTTP client
    client: Client,
    /// API root, always ending in `/`
    base_url: Url,
    /// Credentials for authenticated endpoints
    token: Option<BearerToken>,
    /// Account URL, looked up before the first order
    account_url: std::sync::Arc<OnceCell<String>>,
}

impl BrokerageRestClient {
    /// Create a new REST client (unauthenticated)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Internal(e.to_string()))?;

        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;

        Ok(Self {
            client,
            base_url,
            token: None,
            account_url: std::sync::Arc::new(OnceCell::new()),
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn with_token(mut self, token: BearerToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Build a client from configuration, logging in when only a
    /// username/password pair is configured
    pub async fn connect(config: &BrokerageConfig) -> Result<Self> {
        let client = Self::with_timeout(
            &config.base_url,
            Duration::from_secs(config.request_timeout_seconds),
        )?;

        if let Some(token) = &config.access_token {
            return Ok(client.with_token(BearerToken::new(token.clone())));
        }

        match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                let token = password_grant(
                    &client.client,
                    &client.base_url,
                    &config.client_id,
                    username,
                    password,
                )
                .await?;
                Ok(client.with_token(token))
            }
            _ => Err(ClientError::Configuration(
                "no brokerage credentials: set an access token or a username and password"
                    .to_string(),
            )),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Refuse to send credentials anywhere but the configured API host
    fn same_origin(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw).map_err(|e| {
            ClientError::InvalidResponse(format!("malformed reference {:?}: {}", raw, e))
        })?;
        if url.origin() != self.base_url.origin() {
            return Err(ClientError::InvalidResponse(format!(
                "refusing to follow reference outside {}: {}",
                self.base_url, raw
            )));
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => token.apply_to_request(request),
            None => request,
        }
    }

    /// Map non-success statuses into errors
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after_seconds = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimit {
                message: body,
                retry_after_seconds,
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClientError::Authentication(format!("Server returned status {}: {}", status, body))
            }
            StatusCode::NOT_FOUND => ClientError::NotFound(url),
            _ => ClientError::InvalidResponse(format!(
                "Server returned status {}: {}",
                status, body
            )),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("Fetching {}", url);
        let response = self.authorize(self.client.get(url)).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Follow `next` links until the list is exhausted
    async fn get_all<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                warn!(pages, "Stopped following pagination");
                break;
            }
            let page: Paginated<T> = self.get_json(url).await?;
            items.extend(page.results);
            next = match page.next {
                Some(raw) => Some(self.same_origin(&raw)?),
                None => None,
            };
        }

        Ok(items)
    }

    /// Look up (once) the account orders are placed against
    async fn account_url(&self) -> Result<&str> {
        let url = self
            .account_url
            .get_or_try_init(|| async {
                let accounts: Paginated<AccountResponse> =
                    self.get_json(self.endpoint("accounts/")?).await?;
                accounts
                    .results
                    .into_iter()
                    .next()
                    .map(|a| a.url)
                    .ok_or_else(|| ClientError::NotFound("no brokerage account".to_string()))
            })
            .await?;
        Ok(url.as_str())
    }

    /// Fetch one chunk of fundamentals
    async fn fundamentals_chunk(&self, symbols: &[String]) -> Result<Vec<Fundamentals>> {
        let mut url = self.endpoint("fundamentals/")?;
        url.query_pairs_mut()
            .append_pair("symbols", &symbols.join(","));
        let page: Paginated<Option<FundamentalsResponse>> = self.get_json(url).await?;
        page.results
            .into_iter()
            .flatten()
            .map(FundamentalsResponse::into_fundamentals)
            .collect()
    }
}

#[async_trait]
impl Brokerage for BrokerageRestClient {
    #[instrument(skip(self))]
    async fn get_positions(&self) -> Result<Vec<Position>> {
        let mut url = self.endpoint("positions/")?;
        url.query_pairs_mut().append_pair("nonzero", "true");
        let positions: Vec<PositionResponse> = self.get_all(url).await?;
        positions
            .into_iter()
            .map(PositionResponse::into_position)
            .collect()
    }

    #[instrument(skip(self), fields(count = symbols.len()))]
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        if symbols.is_empty() {
            return Err(ClientError::InvalidResponse(
                "0 symbols provided".to_string(),
            ));
        }
        let mut url = self.endpoint("quotes/")?;
        url.query_pairs_mut()
            .append_pair("symbols", &symbols.join(","));
        let page: Paginated<Option<QuoteResponse>> = self.get_json(url).await?;
        page.results
            .into_iter()
            .flatten()
            .map(QuoteResponse::into_quote)
            .collect()
    }

    #[instrument(skip(self), fields(count = symbols.len()))]
    async fn get_fundamentals(&self, symbols: &[String]) -> Result<Vec<Fundamentals>> {
        let mut fundamentals = Vec::with_capacity(symbols.len());
        for chunk in symbols.chunks(MAX_FUNDAMENTALS_BATCH) {
            fundamentals.extend(self.fundamentals_chunk(chunk).await?);
        }
        Ok(fundamentals)
    }

    #[instrument(skip(self))]
    async fn get_instrument(&self, symbol: &str) -> Result<Instrument> {
        let mut url = self.endpoint("instruments/")?;
        url.query_pairs_mut().append_pair("symbol", symbol);
        let page: Paginated<InstrumentResponse> = self.get_json(url).await?;
        page.results
            .into_iter()
            .next()
            .map(Instrument::from)
            .ok_or_else(|| ClientError::NotFound(format!("instrument {}", symbol)))
    }

    #[instrument(skip(self))]
    async fn get_instrument_by_reference(&self, reference: &str) -> Result<Instrument> {
        let url = self.same_origin(reference)?;
        let instrument: InstrumentResponse = self.get_json(url).await?;
        Ok(instrument.into())
    }

    #[instrument(skip(self))]
    async fn get_historical(
        &self,
        interval: Interval,
        span: Span,
        symbol: &str,
    ) -> Result<Historical> {
        let mut url = self.endpoint("quotes/historicals/")?;
        url.query_pairs_mut()
            .append_pair("interval", interval.as_str())
            .append_pair("span", span.as_str())
            .append_pair("symbols", symbol);
        let response: HistoricalsResponse = self.get_json(url).await?;
        match response.results.into_iter().flatten().next() {
            Some(bars) => bars.into_historical(),
            // Nothing traded yet for this window
            None => Ok(Historical {
                symbol: symbol.to_string(),
                interval: interval.as_str().to_string(),
                span: span.as_str().to_string(),
                records: Vec::new(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn submit_order(
        &self,
        instrument_ref: &str,
        symbol: &str,
        intent: OrderIntent,
    ) -> Result<OrderResult> {
        let account = self.account_url().await?;
        let body = OrderRequest::limit(account, instrument_ref, symbol, intent);
        let url = self.endpoint("orders/")?;

        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let reason = response.text().await.unwrap_or_default();
            return Err(ClientError::OrderRejected {
                symbol: symbol.to_string(),
                reason,
            });
        }

        let response = Self::check_status(response).await?;
        let order: OrderResponse = response.json().await?;
        order.into_result(symbol)
    }

    fn name(&self) -> &'static str {
        "brokerage-rest"
    }
}
