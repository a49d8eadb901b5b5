use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;

use crate::config::ApiSettings;
use crate::error::{AppError, Context, Result};

use super::client::{PriceHistoryApi, PriceHistoryPage, PriceHistoryRequest};

/// JSON-over-HTTP client for one region's price-history endpoint.
pub struct HttpPriceHistoryClient {
    region: String,
    url: String,
    client: Client,
    authorization: Option<HeaderValue>,
}

impl HttpPriceHistoryClient {
    pub fn new(region: &str, settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to construct price-history HTTP client")?;

        let authorization = match &settings.auth_header {
            Some(template) => {
                let value = expand_env_vars(template)?;
                let mut header = HeaderValue::from_str(&value)
                    .context("Invalid value for price-history Authorization header")?;
                header.set_sensitive(true);
                Some(header)
            }
            None => None,
        };

        Ok(Self {
            region: region.to_string(),
            url: render_endpoint(&settings.endpoint, region),
            client,
            authorization,
        })
    }
}

#[async_trait]
impl PriceHistoryApi for HttpPriceHistoryClient {
    async fn describe_spot_price_history(
        &self,
        request: &PriceHistoryRequest,
    ) -> Result<PriceHistoryPage> {
        let mut builder = self
            .client
            .get(&self.url)
            .query(&query_pairs(request))
            .header(ACCEPT, "application/json");

        if let Some(value) = &self.authorization {
            builder = builder.header(AUTHORIZATION, value.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                region: self.region.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let page = serde_json::from_str(&body).with_context(|| {
            format!(
                "Failed to parse price-history response from {}",
                self.region
            )
        })?;
        Ok(page)
    }
}

/// Build a region-keyed factory for a [`super::client::ClientRegistry`].
pub fn http_client_factory(
    settings: ApiSettings,
) -> impl Fn(&str) -> Result<Arc<dyn PriceHistoryApi>> + Send + Sync {
    move |region: &str| -> Result<Arc<dyn PriceHistoryApi>> {
        Ok(Arc::new(HttpPriceHistoryClient::new(region, &settings)?))
    }
}

fn render_endpoint(template: &str, region: &str) -> String {
    template.replace("{region}", region)
}

fn query_pairs(request: &PriceHistoryRequest) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::with_capacity(8);
    for instance_type in &request.instance_types {
        pairs.push(("InstanceType", instance_type.clone()));
    }
    for product in &request.product_descriptions {
        pairs.push(("ProductDescription", product.clone()));
    }
    if let Some(zone) = &request.availability_zone {
        pairs.push(("AvailabilityZone", zone.clone()));
    }
    pairs.push(("StartTime", request.start_time.to_rfc3339()));
    pairs.push(("EndTime", request.end_time.to_rfc3339()));
    pairs.push(("MaxResults", request.max_results.to_string()));
    if let Some(token) = &request.next_token {
        pairs.push(("NextToken", token.clone()));
    }
    pairs
}

/// Replace `${NAME}` placeholders with environment values.
pub fn expand_env_vars(value: &str) -> Result<String> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == '}' {
                    closed = true;
                    break;
                }
                name.push(next);
            }

            if name.is_empty() {
                return Err(AppError::message(
                    "Encountered empty environment placeholder in header",
                ));
            }

            if !closed {
                return Err(AppError::message(
                    "Unterminated environment placeholder in header",
                ));
            }

            let value = std::env::var(&name).with_context(|| {
                format!(
                    "Environment variable {} required by request header is not set",
                    name
                )
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
