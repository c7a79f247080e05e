//! DynamoDB-backed catalog table.
//!
//! Rows live under a single partition value (`"files"`) with the catalog
//! index as the numeric sort key. Attribute names for both keys are
//! configurable; `s3_key` and `uploaded` are fixed.

use crate::error::{CatalogError, CatalogResult};
use crate::table::{BATCH_WRITE_LIMIT, CatalogTable, S3_KEY_COLUMN, UPLOADED_COLUMN};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use s3share_core::config::DEFAULT_REGION;
use s3share_core::{CatalogEntry, PARTITION_VALUE};
use std::collections::HashMap;
use tracing::instrument;

type Item = HashMap<String, AttributeValue>;

fn map_dynamo_error<E>(err: E) -> CatalogError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CatalogError::Dynamo(Box::new(err))
}

/// DynamoDB catalog table.
pub struct DynamoTable {
    client: Client,
    table: String,
    partition_key: String,
    sort_key: String,
}

impl std::fmt::Debug for DynamoTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoTable")
            .field("table", &self.table)
            .field("partition_key", &self.partition_key)
            .field("sort_key", &self.sort_key)
            .finish_non_exhaustive()
    }
}

impl DynamoTable {
    /// Create a new DynamoDB catalog table client.
    ///
    /// Explicit credentials take precedence; otherwise the AWS default
    /// credential chain is used.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        table: &str,
        endpoint: Option<String>,
        region: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        partition_key: &str,
        sort_key: &str,
    ) -> CatalogResult<Self> {
        let resolved_region = region.unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut config_builder = match (access_key_id, secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials = aws_sdk_dynamodb::config::Credentials::new(
                    key_id,
                    secret,
                    None,
                    None,
                    "s3share-config",
                );
                aws_sdk_dynamodb::config::Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(Region::new(resolved_region))
                    .credentials_provider(credentials)
            }
            (None, None) => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(resolved_region))
                    .load()
                    .await;
                aws_sdk_dynamodb::config::Builder::from(&shared)
            }
            _ => {
                return Err(CatalogError::Config(
                    "dynamodb config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ));
            }
        };

        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        Ok(Self {
            client: Client::from_conf(config_builder.build()),
            table: table.to_string(),
            partition_key: partition_key.to_string(),
            sort_key: sort_key.to_string(),
        })
    }

    fn item_for(&self, entry: &CatalogEntry) -> Item {
        HashMap::from([
            (
                self.partition_key.clone(),
                AttributeValue::S(PARTITION_VALUE.to_string()),
            ),
            (
                self.sort_key.clone(),
                AttributeValue::N(entry.index.to_string()),
            ),
            (
                S3_KEY_COLUMN.to_string(),
                AttributeValue::S(entry.s3_key.clone()),
            ),
            (
                UPLOADED_COLUMN.to_string(),
                AttributeValue::N(entry.uploaded.to_string()),
            ),
        ])
    }

    fn entry_from_item(&self, item: &Item) -> CatalogResult<CatalogEntry> {
        entry_from_item(item, &self.sort_key)
    }
}

fn number_attribute<'a>(item: &'a Item, name: &str) -> CatalogResult<&'a str> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .map(String::as_str)
        .ok_or_else(|| CatalogError::MalformedRow(format!("missing numeric attribute '{name}'")))
}

/// Decode a catalog row. Numbers arrive as decimal strings.
fn entry_from_item(item: &Item, sort_key: &str) -> CatalogResult<CatalogEntry> {
    let raw_index = number_attribute(item, sort_key)?;
    let index = raw_index
        .parse::<u64>()
        .map_err(|_| CatalogError::MalformedRow(format!("invalid index {raw_index:?}")))?;

    let raw_uploaded = number_attribute(item, UPLOADED_COLUMN)?;
    let uploaded = raw_uploaded.parse::<i64>().map_err(|_| {
        CatalogError::MalformedRow(format!("invalid upload time {raw_uploaded:?} at index {index}"))
    })?;

    let s3_key = item
        .get(S3_KEY_COLUMN)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| {
            CatalogError::MalformedRow(format!("missing '{S3_KEY_COLUMN}' at index {index}"))
        })?;

    Ok(CatalogEntry::new(index, s3_key, uploaded))
}

#[async_trait]
impl CatalogTable for DynamoTable {
    #[instrument(skip(self), fields(backend = "dynamodb", table = %self.table))]
    async fn entries_after(&self, index: u64) -> CatalogResult<Vec<CatalogEntry>> {
        let mut items = self
            .client
            .query()
            .table_name(&self.table)
            .consistent_read(true)
            .key_condition_expression("#pk = :pk AND #sk > :after")
            .expression_attribute_names("#pk", &self.partition_key)
            .expression_attribute_names("#sk", &self.sort_key)
            .expression_attribute_values(":pk", AttributeValue::S(PARTITION_VALUE.to_string()))
            .expression_attribute_values(":after", AttributeValue::N(index.to_string()))
            .into_paginator()
            .items()
            .send();

        let mut entries = Vec::new();
        while let Some(item) = items.next().await {
            let item = item.map_err(map_dynamo_error)?;
            entries.push(self.entry_from_item(&item)?);
        }
        Ok(entries)
    }

    #[instrument(skip(self, entry), fields(backend = "dynamodb", table = %self.table, index = entry.index))]
    async fn append(&self, entry: &CatalogEntry) -> CatalogResult<()> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(self.item_for(entry)))
            .condition_expression("attribute_not_exists(#sk)")
            .expression_attribute_names("#sk", &self.sort_key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                if let SdkError::ServiceError(ref service_err) = err
                    && service_err.err().is_conditional_check_failed_exception()
                {
                    return Err(CatalogError::Conflict { index: entry.index });
                }
                Err(map_dynamo_error(err))
            }
        }
    }

    #[instrument(skip(self, entries), fields(backend = "dynamodb", table = %self.table, count = entries.len()))]
    async fn put_batch(&self, entries: &[CatalogEntry]) -> CatalogResult<()> {
        for chunk in entries.chunks(BATCH_WRITE_LIMIT) {
            let requests = chunk
                .iter()
                .map(|entry| {
                    let put = PutRequest::builder()
                        .set_item(Some(self.item_for(entry)))
                        .build()
                        .map_err(map_dynamo_error)?;
                    Ok(WriteRequest::builder().put_request(put).build())
                })
                .collect::<CatalogResult<Vec<_>>>()?;

            // The service may accept only part of a batch; the remainder comes
            // back as unprocessed items and belongs to the same batch.
            let mut pending = HashMap::from([(self.table.clone(), requests)]);
            while !pending.is_empty() {
                let output = self
                    .client
                    .batch_write_item()
                    .set_request_items(Some(pending))
                    .send()
                    .await
                    .map_err(map_dynamo_error)?;

                pending = output.unprocessed_items().cloned().unwrap_or_default();
                pending.retain(|_, requests| !requests.is_empty());
                if !pending.is_empty() {
                    tracing::debug!(
                        unprocessed = pending.values().map(Vec::len).sum::<usize>(),
                        "resubmitting unprocessed batch items"
                    );
                }
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }

    async fn health_check(&self) -> CatalogResult<()> {
        self.client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
            .map_err(map_dynamo_error)?;
        Ok(())
    }
}
