use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RegionBoundary {
	pub id: Uuid,
	pub metro: String,
	pub region_name: String,
	/// Borough the region belongs to.
	pub parent_region: Option<String>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RegionEmbedding {
	pub region_id: Uuid,
	pub model: String,
	pub embedding: Vec<f32>,
	pub text_hash: String,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct LocationAlias {
	pub alias_id: Uuid,
	pub metro: String,
	pub alias_normalized: String,
	pub region_boundary_id: Option<Uuid>,
	pub candidate_region_ids: Vec<Uuid>,
	pub source: String,
	pub status: String,
	pub confidence: f32,
	pub user_count: i64,
	pub alias_type: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl LocationAlias {
	pub fn is_ambiguous(&self) -> bool {
		self.region_boundary_id.is_none() && !self.candidate_region_ids.is_empty()
	}

	/// Anything other than an unreviewed LLM guess. LLM write-back never touches these.
	pub fn is_curated(&self) -> bool {
		self.source != "llm" || self.status != "pending_review"
	}
}

#[derive(Clone, Debug)]
pub struct NewLlmAlias<'a> {
	pub metro: &'a str,
	pub alias_normalized: &'a str,
	pub region_boundary_id: Uuid,
	pub confidence: f32,
	pub alias_type: &'a str,
	pub now: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct UnresolvedLocationQuery {
	pub metro: String,
	pub query_normalized: String,
	pub original_query: String,
	pub search_count: i64,
	pub first_seen_at: OffsetDateTime,
	pub last_seen_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct InstructorMetrics {
	pub instructor_id: Uuid,
	pub last_active_at: Option<OffsetDateTime>,
	pub is_founding_instructor: bool,
	pub has_photo: bool,
	pub has_bio: bool,
	pub background_check_verified: bool,
	pub identity_verified: bool,
	pub response_rate: Option<f32>,
	pub review_count: i64,
	pub average_rating: Option<f32>,
}
