//! DynamoDB-backed store

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::{
    error::DisplayErrorContext,
    operation::scan::builders::ScanFluentBuilder,
    types::{AttributeValue, ReturnValue, Select},
    Client,
};
use futures::stream::{self, TryStreamExt};
use restodir_common::record::{FieldValue, Record, RecordError};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};

use super::{Condition, Key, Store, StoreError, StoreResult};
use crate::config::StoreConfig;

/// Parallel writes issued by `put_many`
const PUT_CONCURRENCY: usize = 8;

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Build a client from the standard AWS configuration chain
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            debug!(endpoint = %endpoint, "Using custom DynamoDB endpoint");
            builder = builder.endpoint_url(endpoint);
        }

        info!(region = ?sdk_config.region(), "DynamoDB client initialized");

        Ok(Self::from_client(Client::from_conf(builder.build())))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// One page of a strongly consistent count scan
    fn count_page(&self, table: &str, start_key: Option<Item>) -> ScanFluentBuilder {
        self.client
            .scan()
            .table_name(table)
            .select(Select::Count)
            .consistent_read(true)
            .set_exclusive_start_key(start_key)
    }
}

fn encode_value(field: &str, value: &FieldValue) -> Result<AttributeValue, RecordError> {
    Ok(match value {
        FieldValue::Null => AttributeValue::Null(true),
        FieldValue::Bool(b) => AttributeValue::Bool(*b),
        FieldValue::Number(n) if n.is_finite() => AttributeValue::N(n.to_string()),
        FieldValue::Number(n) => {
            return Err(RecordError::Unsupported {
                field: field.to_string(),
                reason: format!("non-finite number {}", n),
            })
        },
        FieldValue::String(s) => AttributeValue::S(s.clone()),
        FieldValue::List(items) => AttributeValue::L(
            items
                .iter()
                .map(|v| encode_value(field, v))
                .collect::<Result<_, _>>()?,
        ),
        FieldValue::Map(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), encode_value(k, v)?)))
                .collect::<Result<_, RecordError>>()?,
        ),
    })
}

fn encode_record(record: &Record) -> Result<Item, RecordError> {
    record
        .iter()
        .map(|(k, v)| Ok((k.clone(), encode_value(k, v)?)))
        .collect()
}

fn parse_number(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|e| format!("invalid number '{}': {}", raw, e))
}

fn decode_value(value: &AttributeValue) -> Result<FieldValue, String> {
    Ok(match value {
        AttributeValue::Null(_) => FieldValue::Null,
        AttributeValue::Bool(b) => FieldValue::Bool(*b),
        AttributeValue::N(n) => FieldValue::Number(parse_number(n)?),
        AttributeValue::S(s) => FieldValue::String(s.clone()),
        AttributeValue::L(items) => {
            FieldValue::List(items.iter().map(decode_value).collect::<Result<_, _>>()?)
        },
        AttributeValue::M(map) => FieldValue::Map(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
                .collect::<Result<BTreeMap<_, _>, String>>()?,
        ),
        AttributeValue::Ss(set) => {
            FieldValue::List(set.iter().cloned().map(FieldValue::String).collect())
        },
        AttributeValue::Ns(set) => FieldValue::List(
            set.iter()
                .map(|n| parse_number(n).map(FieldValue::Number))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::B(_) | AttributeValue::Bs(_) => {
            return Err("binary attributes are not supported".to_string())
        },
        other => return Err(format!("unsupported attribute kind: {:?}", other)),
    })
}

fn decode_item(table: &str, item: &Item) -> StoreResult<Record> {
    item.iter()
        .map(|(k, v)| {
            decode_value(v)
                .map(|value| (k.clone(), value))
                .map_err(|reason| StoreError::decode(table, format!("field '{}': {}", k, reason)))
        })
        .collect()
}

/// Filter expression with placeholder maps for a conjunction of conditions
#[derive(Debug)]
struct FilterExpression {
    expression: String,
    names: HashMap<String, String>,
    values: Item,
}

fn build_filter(conditions: &[Condition]) -> StoreResult<Option<FilterExpression>> {
    if conditions.is_empty() {
        return Ok(None);
    }

    let mut clauses = Vec::with_capacity(conditions.len());
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    for (i, condition) in conditions.iter().enumerate() {
        condition.validate()?;
        let name = format!("#f{}", i);
        let value = format!(":v{}", i);
        clauses.push(format!("{} {} {}", name, condition.operator.as_str(), value));
        names.insert(name, condition.field.clone());
        values.insert(value, encode_value(&condition.field, &condition.value)?);
    }

    Ok(Some(FilterExpression {
        expression: clauses.join(" AND "),
        names,
        values,
    }))
}

fn key_item(key: &Key) -> Item {
    HashMap::from([(key.field.clone(), AttributeValue::S(key.value.clone()))])
}

#[async_trait]
impl Store for DynamoStore {
    #[instrument(skip(self, record))]
    async fn put(&self, table: &str, record: Record) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(encode_record(&record)?))
            .send()
            .await
            .map_err(|e| StoreError::backend(table, DisplayErrorContext(&e)))?;
        Ok(())
    }

    #[instrument(skip(self, record))]
    async fn put_if_absent(&self, table: &str, key: &Key, record: Record) -> StoreResult<bool> {
        let result = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(encode_record(&record)?))
            .condition_expression("attribute_not_exists(#k)")
            .expression_attribute_names("#k", &key.field)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                debug!(table = %table, key = %key.value, "Conditional put lost: key exists");
                Ok(false)
            },
            Err(err) => Err(StoreError::backend(table, DisplayErrorContext(&err))),
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, table: &str, key: &Key) -> StoreResult<Option<Record>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key_item(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::backend(table, DisplayErrorContext(&e)))?;

        output.item().map(|item| decode_item(table, item)).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &str, key: &Key) -> StoreResult<bool> {
        let output = self
            .client
            .delete_item()
            .table_name(table)
            .set_key(Some(key_item(key)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| StoreError::backend(table, DisplayErrorContext(&e)))?;

        Ok(output.attributes().is_some_and(|a| !a.is_empty()))
    }

    #[instrument(skip(self, conditions), fields(conditions = conditions.len()))]
    async fn scan(&self, table: &str, conditions: &[Condition]) -> StoreResult<Vec<Record>> {
        let mut request = self.client.scan().table_name(table);
        if let Some(filter) = build_filter(conditions)? {
            request = request
                .filter_expression(filter.expression)
                .set_expression_attribute_names(Some(filter.names))
                .set_expression_attribute_values(Some(filter.values));
        }

        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let output = request
                .clone()
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::backend(table, DisplayErrorContext(&e)))?;

            for item in output.items() {
                records.push(decode_item(table, item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!(table = %table, count = records.len(), "Scan completed");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn count(&self, table: &str) -> StoreResult<u64> {
        let mut total: u64 = 0;
        let mut start_key: Option<Item> = None;
        loop {
            let output = self
                .count_page(table, start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::backend(table, DisplayErrorContext(&e)))?;

            total += output.count().max(0) as u64;

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(total)
    }

    async fn put_many(&self, table: &str, records: Vec<Record>) -> StoreResult<usize> {
        let total = records.len();
        stream::iter(records.into_iter().map(Ok::<_, StoreError>))
            .try_for_each_concurrent(PUT_CONCURRENCY, |record| self.put(table, record))
            .await?;
        Ok(total)
    }
}
