//! Recent activity query.
//!
//! The same fixed query is answered locally from a [`Store`] and remotely by
//! [`SubgraphClient`] against a hosted subgraph deployment.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::store::{ApyUpdated, EntityKind, OwnershipTransferred, Store};

/// Number of records of each kind returned by the recent activity query.
pub const RECENT_ACTIVITY_SIZE: usize = 5;

/// Recent activity query in the subgraph GraphQL dialect.
pub const RECENT_ACTIVITY_QUERY: &str = r#"{
  apyupdateds(first: 5, orderBy: blockNumber, orderDirection: desc) {
    id
    newAPY
    blockNumber
    blockTimestamp
    transactionHash
  }
  ownershipTransferreds(first: 5, orderBy: blockNumber, orderDirection: desc) {
    id
    previousOwner
    newOwner
    blockNumber
    blockTimestamp
    transactionHash
  }
}"#;

/// Most recent APY updates and ownership transfers, newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub apyupdateds: Vec<ApyUpdated>,
    pub ownership_transferreds: Vec<OwnershipTransferred>,
}

impl RecentActivity {
    /// Answers the query from the local store, `first` records of each kind.
    pub fn from_store(store: &Store, first: usize) -> Self {
        Self {
            apyupdateds: store.recent_as(EntityKind::ApyUpdated, first),
            ownership_transferreds: store.recent_as(EntityKind::OwnershipTransferred, first),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubgraphError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response status: {0}")]
    Status(reqwest::StatusCode),

    #[error("query failed: {0}")]
    Query(String),

    #[error("empty response")]
    NoData,
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct GraphqlResponse<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

impl<D> GraphqlResponse<D> {
    fn into_result(self) -> Result<D, SubgraphError> {
        if !self.errors.is_empty() {
            return Err(SubgraphError::Query(
                self.errors.into_iter().map(|e| e.message).join("; "),
            ));
        }
        self.data.ok_or(SubgraphError::NoData)
    }
}

/// Client of a hosted subgraph deployment indexing the perpetual contract.
#[derive(Clone, Debug)]
pub struct SubgraphClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl SubgraphClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Runs the fixed recent activity query.
    pub async fn recent_activity(&self) -> Result<RecentActivity, SubgraphError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&GraphqlRequest {
                query: RECENT_ACTIVITY_QUERY,
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubgraphError::Status(status));
        }

        let body: GraphqlResponse<RecentActivity> = response.json().await?;
        let activity = body.into_result()?;
        debug!(
            apy_updates = activity.apyupdateds.len(),
            ownership_transfers = activity.ownership_transferreds.len(),
            "Recent activity fetched"
        );
        Ok(activity)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256};

    use super::*;
    use crate::{mapping, testing, types::StateInstant};

    #[test]
    fn test_recent_activity_from_store() {
        let store = Store::new();
        for block in 1..=7u64 {
            let ctx = testing::create_apy_updated_event(U256::from(block * 100))
                .with_tx_hash(alloy::primitives::TxHash::with_last_byte(block as u8));
            mapping::handle(&store, StateInstant::new(block, block * 12), &ctx).unwrap();
        }
        let ctx = testing::create_ownership_transferred_event(
            Address::ZERO,
            Address::repeat_byte(0x0a),
        );
        mapping::handle(&store, StateInstant::new(1, 12), &ctx).unwrap();

        let activity = RecentActivity::from_store(&store, RECENT_ACTIVITY_SIZE);
        let values: Vec<_> = activity
            .apyupdateds
            .iter()
            .map(|r| r.new_apy.to::<u64>())
            .collect();
        assert_eq!(values, vec![700, 600, 500, 400, 300]);
        assert_eq!(activity.ownership_transferreds.len(), 1);
        assert_eq!(
            activity.ownership_transferreds[0].new_owner,
            Address::repeat_byte(0x0a)
        );
    }

    #[test]
    fn test_graphql_response_decoding() {
        let body = r#"{
            "data": {
                "apyupdateds": [{
                    "id": "0xa16081f360e3847006db660bae1c6d1b2e17ec2a01000000",
                    "newAPY": "3150000000000000000",
                    "blockNumber": "5678",
                    "blockTimestamp": "1727000000",
                    "transactionHash": "0x000000000000000000000000a16081f360e3847006db660bae1c6d1b2e17ec2a"
                }],
                "ownershipTransferreds": []
            }
        }"#;
        let response: GraphqlResponse<RecentActivity> = serde_json::from_str(body).unwrap();
        let activity = response.into_result().unwrap();
        assert_eq!(activity.apyupdateds.len(), 1);
        assert_eq!(
            activity.apyupdateds[0].new_apy,
            U256::from(3_150_000_000_000_000_000u128)
        );
        assert_eq!(activity.apyupdateds[0].meta.block_number, 5678);
        assert!(activity.ownership_transferreds.is_empty());
    }

    #[test]
    fn test_graphql_errors_are_reported() {
        let body = r#"{
            "errors": [{"message": "indexing_error"}, {"message": "store error"}]
        }"#;
        let response: GraphqlResponse<RecentActivity> = serde_json::from_str(body).unwrap();
        assert!(matches!(
            response.into_result(),
            Err(SubgraphError::Query(msg)) if msg == "indexing_error; store error"
        ));

        let response: GraphqlResponse<RecentActivity> = serde_json::from_str("{}").unwrap();
        assert!(matches!(response.into_result(), Err(SubgraphError::NoData)));
    }
}
