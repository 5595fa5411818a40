use async_trait::async_trait;
use sqlx::{FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    NewPostParams, PostFilter, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(FromRow)]
struct PostRow {
    id: Uuid,
    text: String,
    author_id: Uuid,
    group_id: Option<Uuid>,
    image_path: Option<String>,
    pub_date: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            author_id: row.author_id,
            group_id: row.group_id,
            image_path: row.image_path,
            pub_date: row.pub_date,
        }
    }
}

const POST_COLUMNS: &str = "p.id, p.text, p.author_id, p.group_id, p.image_path, p.pub_date";

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            qb.push(" AND p.group_id = ");
            qb.push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            qb.push(" AND p.author_id = ");
            qb.push_bind(author_id);
        }
        PostFilter::AuthorAmong(author_ids) => {
            qb.push(" AND p.author_id = ANY(");
            qb.push_bind(author_ids);
            qb.push(")");
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_page(
        &self,
        filter: &PostFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        if matches!(filter, PostFilter::AuthorAmong(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut qb =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE 1=1 "));
        apply_filter(&mut qb, filter);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(limit.clamp(1, 100)));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        if matches!(filter, PostFilter::AuthorAmong(ids) if ids.is_empty()) {
            return Ok(0);
        }

        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        apply_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|_| RepoError::Integrity {
            message: "negative row count".to_string(),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError> {
        let NewPostParams {
            text,
            author_id,
            group_id,
            image_path,
        } = params;

        let row = sqlx::query_as::<_, PostRow>(
            "INSERT INTO posts (id, text, author_id, group_id, image_path, pub_date) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, text, author_id, group_id, image_path, pub_date",
        )
        .bind(Uuid::new_v4())
        .bind(text)
        .bind(author_id)
        .bind(group_id)
        .bind(image_path)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            text,
            group_id,
            image_path,
        } = params;

        // COALESCE keeps the stored image when the edit form carried none.
        let row = sqlx::query_as::<_, PostRow>(
            "UPDATE posts SET text = $2, group_id = $3, \
             image_path = COALESCE($4, image_path) \
             WHERE id = $1 \
             RETURNING id, text, author_id, group_id, image_path, pub_date",
        )
        .bind(id)
        .bind(text)
        .bind(group_id)
        .bind(image_path)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        // Comments go with the post via ON DELETE CASCADE.
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
