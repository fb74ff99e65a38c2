//! Company directory lookups.

use serde_json::json;
use tracing::{info, warn};

use crate::auth::AccessToken;
use crate::client::ApiClient;
use crate::error::FetchError;
use crate::http::endpoints;
use crate::models::{Company, CompanyListResponse};

impl ApiClient {
    /// Fetch every company the backend has indexed.
    pub async fn fetch_companies(
        &self,
        token: &AccessToken,
        base_url: &str,
    ) -> Result<Vec<Company>, FetchError> {
        let result = async {
            let response = self
                .post(
                    base_url,
                    endpoints::COMPANY_LIST,
                    Some(token.as_str()),
                    json!({}),
                    self.timeouts().auth,
                )
                .await?
                .ok()?;
            response.json::<CompanyListResponse>()
        }
        .await;

        match result {
            Ok(list) => {
                info!(count = list.companies.len(), "Fetched company list");
                Ok(list.companies)
            }
            Err(e) => {
                warn!(error = %e, "Company list unavailable");
                Err(FetchError::Api(e))
            }
        }
    }
}
