pub const DENSE_VECTOR_NAME: &str = "dense";

pub const PAYLOAD_PASSAGE_ID: &str = "passage_id";
pub const PAYLOAD_SCOPE: &str = "scope";
pub const PAYLOAD_ORGANIZATION_ID: &str = "organization_id";
pub const PAYLOAD_CATEGORY: &str = "category";
pub const PAYLOAD_TITLE: &str = "title";
pub const PAYLOAD_CONTENT: &str = "content";
pub const PAYLOAD_TAGS: &str = "tags";
pub const PAYLOAD_CHUNK_INDEX: &str = "chunk_index";
pub const PAYLOAD_TOTAL_CHUNKS: &str = "total_chunks";

use crate::Result;

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &lexa_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}
}
