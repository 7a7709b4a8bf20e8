use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::config::PlaidConfig;
use crate::plaid::{
    Account, AccountDetails, Aggregator, AggregatorError, LinkToken, SyncPage,
};

const PRODUCTS: [&str; 2] = ["auth", "transactions"];
const COUNTRY_CODES: [&str; 1] = ["US"];

#[derive(Serialize)]
struct LinkTokenUser<'a> {
    client_user_id: &'a str,
}

#[derive(Serialize)]
struct LinkTokenCreateRequest<'a> {
    user: LinkTokenUser<'a>,
    client_name: &'a str,
    products: &'a [&'a str],
    country_codes: &'a [&'a str],
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

#[derive(Serialize)]
struct PublicTokenExchangeRequest<'a> {
    public_token: &'a str,
}

#[derive(Deserialize)]
struct PublicTokenExchangeResponse {
    access_token: String,
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
struct AccountsResponse {
    accounts: Vec<Account>,
}

#[derive(Serialize)]
struct TransactionsSyncRequest<'a> {
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

/// Plaid's error body.
#[derive(Deserialize)]
struct ErrorResponse {
    error_type: String,
    error_code: String,
    error_message: String,
}

pub struct PlaidClient {
    client: Client,
    base_url: String,
    client_id: String,
    secret: String,
    client_name: String,
    redirect_uri: Option<String>,
}

impl PlaidClient {
    const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(config: &PlaidConfig) -> Result<PlaidClient, anyhow::Error> {
        Self::with_base_url(config, config.environment.base_url())
    }

    pub fn with_base_url(config: &PlaidConfig, base_url: &str) -> Result<PlaidClient, anyhow::Error> {
        let client = Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .context("Unable to create HTTP client")?;

        Ok(PlaidClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            client_name: config.client_name.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, AggregatorError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("PLAID-CLIENT-ID", &self.client_id)
            .header("PLAID-SECRET", &self.secret)
            .json(body)
            .send()
            .await
            .map_err(AggregatorError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let error = match response.json::<ErrorResponse>().await {
                Ok(body) => AggregatorError::Api {
                    status: status.as_u16(),
                    error_type: body.error_type,
                    error_code: body.error_code,
                    message: body.error_message,
                },
                Err(e) => AggregatorError::InvalidResponse(e),
            };
            warn!(path, %status, %error, "Plaid request failed");
            return Err(error);
        }

        response
            .json::<Resp>()
            .await
            .map_err(AggregatorError::InvalidResponse)
    }
}

#[async_trait]
impl Aggregator for PlaidClient {
    #[instrument(skip(self))]
    async fn create_link_token(&self, client_user_id: &str) -> Result<LinkToken, AggregatorError> {
        let request = LinkTokenCreateRequest {
            user: LinkTokenUser { client_user_id },
            client_name: &self.client_name,
            products: &PRODUCTS,
            country_codes: &COUNTRY_CODES,
            language: "en",
            redirect_uri: self.redirect_uri.as_deref(),
        };
        self.post("/link/token/create", &request).await
    }

    #[instrument(skip_all)]
    async fn exchange_public_token(&self, public_token: &str) -> Result<String, AggregatorError> {
        let response: PublicTokenExchangeResponse = self
            .post(
                "/item/public_token/exchange",
                &PublicTokenExchangeRequest { public_token },
            )
            .await?;
        Ok(response.access_token)
    }

    #[instrument(skip_all)]
    async fn get_balances(&self, access_token: &str) -> Result<Vec<Account>, AggregatorError> {
        let response: AccountsResponse = self
            .post("/accounts/balance/get", &AccessTokenRequest { access_token })
            .await?;
        Ok(response.accounts)
    }

    #[instrument(skip_all)]
    async fn get_account_details(
        &self,
        access_token: &str,
    ) -> Result<AccountDetails, AggregatorError> {
        self.post("/auth/get", &AccessTokenRequest { access_token })
            .await
    }

    #[instrument(skip(self, access_token))]
    async fn sync_transactions(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, AggregatorError> {
        self.post(
            "/transactions/sync",
            &TransactionsSyncRequest {
                access_token,
                cursor,
            },
        )
        .await
    }
}
