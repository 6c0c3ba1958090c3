//! Qdrant-backed indexes, one collection per namespace.

use std::{collections::HashMap, sync::Arc};

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance,
		Filter, GetPointsBuilder, ListValue, PointId, PointStruct, PointsIdsList, Query,
		QueryPointsBuilder, RetrievedPoint, ScrollPointsBuilder, SetPayloadPointsBuilder, Struct,
		UpsertPointsBuilder, Value, VectorParamsBuilder, value::Kind, vector_output,
		vectors_output::VectorsOptions,
	},
};
use serde_json::{Number, Value as JsonValue};
use uuid::Uuid;

use crate::{
	BoxFuture, Error, IndexBackend, IndexEntry, IndexHit, IndexRecord, Metadata, MetadataFilter,
	Result, VectorIndex,
};

pub const ENTRY_ID_KEY: &str = "entry_id";
pub const DOCUMENT_KEY: &str = "document";

const SCROLL_PAGE_SIZE: u32 = 256;

pub struct QdrantBackend {
	client: Arc<Qdrant>,
	collection_prefix: String,
	vector_dim: u32,
}
impl QdrantBackend {
	pub fn new(cfg: &ctxg_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client: Arc::new(client),
			collection_prefix: cfg.collection_prefix.clone(),
			vector_dim: cfg.vector_dim,
		})
	}

	/// Collection name for a namespace. Namespaces are filesystem paths, so they are hashed into
	/// a name Qdrant accepts.
	pub fn collection_name(&self, namespace: &str) -> String {
		collection_name(&self.collection_prefix, namespace)
	}

	async fn ensure_collection(&self, collection: &str) -> Result<()> {
		if self.client.collection_exists(collection).await? {
			return Ok(());
		}

		let created = self
			.client
			.create_collection(CreateCollectionBuilder::new(collection).vectors_config(
				VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Euclid),
			))
			.await;

		match created {
			Ok(_) => {
				tracing::info!(
					collection,
					vector_dim = self.vector_dim,
					"Created Qdrant collection."
				);

				Ok(())
			},
			// Another process may have created it between the check and the create.
			Err(err) =>
				if self.client.collection_exists(collection).await? {
					Ok(())
				} else {
					Err(err.into())
				},
		}
	}
}

impl IndexBackend for QdrantBackend {
	fn open<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<Arc<dyn VectorIndex>>> {
		Box::pin(async move {
			let collection = self.collection_name(namespace);

			self.ensure_collection(&collection).await?;

			tracing::debug!(namespace, collection, "Opened Qdrant trace index.");

			let index = QdrantIndex {
				client: self.client.clone(),
				collection,
				vector_dim: self.vector_dim as usize,
			};

			Ok(Arc::new(index) as Arc<dyn VectorIndex>)
		})
	}
}

pub struct QdrantIndex {
	client: Arc<Qdrant>,
	collection: String,
	vector_dim: usize,
}
impl QdrantIndex {
	fn check_dim(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.vector_dim {
			return Err(Error::DimensionMismatch {
				expected: self.vector_dim,
				actual: vector.len(),
			});
		}

		Ok(())
	}

	async fn fetch(&self, id: &str, with_vectors: bool) -> Result<Option<RetrievedPoint>> {
		let response = self
			.client
			.get_points(
				GetPointsBuilder::new(self.collection.as_str(), vec![point_id(id)])
					.with_payload(true)
					.with_vectors(with_vectors),
			)
			.await?;

		Ok(response.result.into_iter().next())
	}
}

impl VectorIndex for QdrantIndex {
	fn count(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move {
			let response = self
				.client
				.count(CountPointsBuilder::new(self.collection.as_str()).exact(true))
				.await?;

			Ok(response.result.map(|result| result.count).unwrap_or(0))
		})
	}

	fn insert(&self, entry: IndexEntry) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			self.check_dim(&entry.vector)?;

			let mut payload = to_payload(&entry.metadata);

			payload.insert(ENTRY_ID_KEY.to_string(), Value::from(entry.id.clone()));
			payload.insert(DOCUMENT_KEY.to_string(), Value::from(entry.text));

			let point =
				PointStruct::new(point_uuid(&entry.id), entry.vector, Payload::from(payload));

			self.client
				.upsert_points(
					UpsertPointsBuilder::new(self.collection.as_str(), vec![point]).wait(true),
				)
				.await?;

			Ok(())
		})
	}

	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.client
				.delete_points(
					DeletePointsBuilder::new(self.collection.as_str())
						.points(PointsIdsList { ids: vec![point_id(id)] })
						.wait(true),
				)
				.await?;

			Ok(())
		})
	}

	fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<IndexEntry>>> {
		Box::pin(async move {
			let Some(point) = self.fetch(id, true).await? else { return Ok(None) };
			let vector = point_vector(&point).ok_or_else(|| Error::InvalidRecord {
				id: id.to_string(),
				message: "point has no dense vector".to_string(),
			})?;
			let record = to_record(point.payload)?;

			Ok(Some(IndexEntry {
				id: record.id,
				vector,
				text: record.text,
				metadata: record.metadata,
			}))
		})
	}

	fn scan_all(&self) -> BoxFuture<'_, Result<Vec<IndexRecord>>> {
		Box::pin(async move {
			let mut records = Vec::new();
			let mut offset: Option<PointId> = None;

			loop {
				let mut builder = ScrollPointsBuilder::new(self.collection.as_str())
					.limit(SCROLL_PAGE_SIZE)
					.with_payload(true)
					.with_vectors(false);

				if let Some(offset) = offset.take() {
					builder = builder.offset(offset);
				}

				let response = self.client.scroll(builder).await?;

				for point in response.result {
					records.push(to_record(point.payload)?);
				}

				match response.next_page_offset {
					Some(next) => offset = Some(next),
					None => break,
				}
			}

			Ok(records)
		})
	}

	fn knn<'a>(
		&'a self,
		vector: &'a [f32],
		k: u64,
		filter: &'a MetadataFilter,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(async move {
			self.check_dim(vector)?;

			let mut builder = QueryPointsBuilder::new(self.collection.as_str())
				.query(Query::new_nearest(vector.to_vec()))
				.limit(k)
				.with_payload(true);

			if !filter.is_empty() {
				builder = builder.filter(to_filter(filter));
			}

			let response = self.client.query(builder).await?;
			let mut hits = Vec::with_capacity(response.result.len());

			for point in response.result {
				let record = to_record(point.payload)?;

				hits.push(IndexHit {
					id: record.id,
					text: record.text,
					metadata: record.metadata,
					// Euclid collections report the distance as the score.
					distance: Some(point.score),
				});
			}

			Ok(hits)
		})
	}

	fn replace_metadata<'a>(
		&'a self,
		id: &'a str,
		metadata: Metadata,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let Some(point) = self.fetch(id, false).await? else { return Ok(false) };
			let mut payload = to_payload(&metadata);

			for key in [ENTRY_ID_KEY, DOCUMENT_KEY] {
				if let Some(value) = point.payload.get(key) {
					payload.insert(key.to_string(), value.clone());
				}
			}

			self.client
				.overwrite_payload(
					SetPayloadPointsBuilder::new(self.collection.as_str(), Payload::from(payload))
						.points_selector(PointsIdsList { ids: vec![point_id(id)] })
						.wait(true),
				)
				.await?;

			Ok(true)
		})
	}
}

pub fn collection_name(prefix: &str, namespace: &str) -> String {
	let hash = blake3::hash(namespace.as_bytes()).to_hex();

	format!("{prefix}_{}", &hash.as_str()[..16])
}

/// Qdrant only accepts integers and UUIDs as point ids, so entry ids map to a name-based UUID.
pub fn point_uuid(id: &str) -> String {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
}

fn point_id(id: &str) -> PointId {
	PointId::from(point_uuid(id))
}

fn point_vector(point: &RetrievedPoint) -> Option<Vec<f32>> {
	let VectorsOptions::Vector(vector) = point.vectors.as_ref()?.vectors_options.as_ref()? else {
		return None;
	};

	if let Some(vector_output::Vector::Dense(dense)) = &vector.vector {
		return Some(dense.data.clone());
	}

	#[allow(deprecated)]
	let data = vector.data.clone();

	if data.is_empty() { None } else { Some(data) }
}

fn to_filter(filter: &MetadataFilter) -> Filter {
	Filter::must(
		filter
			.conditions()
			.iter()
			.map(|(key, value)| Condition::matches(key.as_str(), value.clone())),
	)
}

fn to_payload(metadata: &Metadata) -> HashMap<String, Value> {
	metadata.iter().map(|(key, value)| (key.clone(), Value::from(value.clone()))).collect()
}

fn to_record(mut payload: HashMap<String, Value>) -> Result<IndexRecord> {
	let id = payload.remove(ENTRY_ID_KEY).and_then(|value| payload_string(&value));
	let Some(id) = id else {
		return Err(Error::InvalidRecord {
			id: String::new(),
			message: format!("payload is missing {ENTRY_ID_KEY}"),
		});
	};
	let Some(text) = payload.remove(DOCUMENT_KEY).and_then(|value| payload_string(&value)) else {
		return Err(Error::InvalidRecord {
			id,
			message: format!("payload is missing {DOCUMENT_KEY}"),
		});
	};
	let metadata = payload.into_iter().map(|(key, value)| (key, to_json(value))).collect();

	Ok(IndexRecord { id, text, metadata })
}

fn payload_string(value: &Value) -> Option<String> {
	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

fn to_json(value: Value) -> JsonValue {
	match value.kind {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(flag)) => JsonValue::Bool(flag),
		Some(Kind::IntegerValue(number)) => JsonValue::from(number),
		Some(Kind::DoubleValue(number)) =>
			Number::from_f64(number).map(JsonValue::Number).unwrap_or(JsonValue::Null),
		Some(Kind::StringValue(text)) => JsonValue::String(text),
		Some(Kind::ListValue(ListValue { values })) =>
			JsonValue::Array(values.into_iter().map(to_json).collect()),
		Some(Kind::StructValue(Struct { fields })) =>
			JsonValue::Object(
				fields.into_iter().map(|(key, value)| (key, to_json(value))).collect(),
			),
	}
}
