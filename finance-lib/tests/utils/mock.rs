use std::str::FromStr;
use std::sync::Mutex;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::HttpMessage;
use async_trait::async_trait;
use chrono::NaiveDate;
use finance_lib::advisor::{LanguageModel, LanguageModelError};
use finance_lib::plaid::{
    Account, AccountDetails, AccountNumbers, Aggregator, AggregatorError, Balances, LinkToken,
    SyncPage, Transaction,
};
use finance_lib::user::UserId;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use rust_decimal::Decimal;

pub struct MockAuthentication {
    pub user_id: UserId,
}

impl<S, B> Transform<S, ServiceRequest> for MockAuthentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = MockAuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MockAuthenticationMiddleware {
            service,
            user_id: self.user_id.clone(),
        }))
    }
}

pub struct MockAuthenticationMiddleware<S> {
    service: S,
    user_id: UserId,
}

impl<S, B> Service<ServiceRequest> for MockAuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        req.extensions_mut().insert::<UserId>(self.user_id.clone());
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}

pub fn transaction(id: &str, merchant: &str, amount: &str) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        account_id: "checking".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        name: merchant.to_uppercase(),
        merchant_name: Some(merchant.to_string()),
        category: None,
        personal_finance_category: None,
        amount: Decimal::from_str(amount).unwrap(),
        iso_currency_code: Some("USD".to_string()),
        pending: false,
    }
}

enum Script {
    Pages(Vec<Vec<Transaction>>),
    Endless,
    Failing,
}

/// An [Aggregator] that serves pre-arranged transaction pages. Cursors are `page-<n>`, where `n`
/// is the index of the next page to serve.
pub struct MockAggregator {
    script: Script,
    access_tokens: Mutex<Vec<String>>,
}

impl MockAggregator {
    pub fn with_pages(pages: Vec<Vec<Transaction>>) -> MockAggregator {
        Self::new(Script::Pages(pages))
    }

    /// Always reports more pages.
    pub fn endless() -> MockAggregator {
        Self::new(Script::Endless)
    }

    /// Every call fails with an `ITEM_LOGIN_REQUIRED` error.
    pub fn failing() -> MockAggregator {
        Self::new(Script::Failing)
    }

    fn new(script: Script) -> MockAggregator {
        MockAggregator {
            script,
            access_tokens: Mutex::new(Vec::new()),
        }
    }

    /// Access tokens used for sync calls, in call order.
    pub fn access_tokens(&self) -> Vec<String> {
        self.access_tokens.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), AggregatorError> {
        match self.script {
            Script::Failing => Err(AggregatorError::Api {
                status: 400,
                error_type: "ITEM_ERROR".to_string(),
                error_code: "ITEM_LOGIN_REQUIRED".to_string(),
                message: "the login details of this item have changed".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn page_index(cursor: Option<&str>) -> usize {
    cursor
        .and_then(|c| c.strip_prefix("page-"))
        .map(|n| n.parse().unwrap())
        .unwrap_or(0)
}

#[async_trait]
impl Aggregator for MockAggregator {
    async fn create_link_token(&self, client_user_id: &str) -> Result<LinkToken, AggregatorError> {
        self.check()?;
        Ok(LinkToken {
            link_token: format!("link-sandbox-{}", client_user_id),
            expiration: "2024-03-01T12:00:00Z".to_string(),
        })
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<String, AggregatorError> {
        self.check()?;
        Ok(format!("access-sandbox-{}", public_token))
    }

    async fn get_balances(&self, _access_token: &str) -> Result<Vec<Account>, AggregatorError> {
        self.check()?;
        Ok(vec![Account {
            account_id: "checking".to_string(),
            name: "Plaid Checking".to_string(),
            official_name: None,
            mask: Some("0000".to_string()),
            account_type: "depository".to_string(),
            subtype: Some("checking".to_string()),
            balances: Balances {
                available: Some(Decimal::from(100)),
                current: Some(Decimal::from(110)),
                limit: None,
                iso_currency_code: Some("USD".to_string()),
            },
        }])
    }

    async fn get_account_details(
        &self,
        access_token: &str,
    ) -> Result<AccountDetails, AggregatorError> {
        Ok(AccountDetails {
            accounts: self.get_balances(access_token).await?,
            numbers: AccountNumbers::default(),
        })
    }

    async fn sync_transactions(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, AggregatorError> {
        self.check()?;
        self.access_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());

        let index = page_index(cursor);
        match &self.script {
            Script::Pages(pages) => Ok(SyncPage {
                added: pages.get(index).cloned().unwrap_or_default(),
                next_cursor: Some(format!("page-{}", index + 1)),
                has_more: index + 1 < pages.len(),
            }),
            _ => Ok(SyncPage {
                added: vec![transaction(&format!("tx-{}", index), "Coffee", "3.50")],
                next_cursor: Some(format!("page-{}", index + 1)),
                has_more: true,
            }),
        }
    }
}

/// A [LanguageModel] with a canned reply that records the prompts it receives.
pub struct MockLanguageModel {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLanguageModel {
    pub fn replying(reply: &str) -> MockLanguageModel {
        MockLanguageModel {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> MockLanguageModel {
        MockLanguageModel {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String, LanguageModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(LanguageModelError::Status(503))
    }
}
