//! Database repository for user and banner operations.
//!
//! Uses prepared statements and transactions for data integrity.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{timestamp, Banner, Content, FilterQuery, NewBanner, NewUser, Role, TagSet, User};

const BANNER_COLUMNS: &str =
    "b.id, b.tag_key, b.feature_id, b.title, b.text, b.url, b.is_active, b.created_at, b.updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool, waiting for connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ==================== USER OPERATIONS ====================

    /// Insert a new user and return its id.
    pub async fn insert_user(&self, user: &NewUser) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (nickname, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.nickname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_as(e, "User with this nickname or email already exists"))?;

        Ok(result.last_insert_rowid())
    }

    /// Find a user holding either the nickname or the email.
    pub async fn find_user_by_identity_or_email(
        &self,
        nickname: &str,
        email: &str,
    ) -> Result<Option<i64>, AppError> {
        let row = sqlx::query("SELECT id FROM users WHERE nickname = ? OR email = ? LIMIT 1")
            .bind(nickname)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.try_get("id")).transpose()?)
    }

    /// Get the stored password hash for a nickname.
    pub async fn get_password_hash(&self, nickname: &str) -> Result<String, AppError> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE nickname = ?")
            .bind(nickname)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", nickname)))?;

        Ok(row.try_get("password_hash")?)
    }

    /// Get a user by nickname and the exact stored password hash.
    pub async fn get_user_by_identity_and_hash(
        &self,
        nickname: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let row = sqlx::query(
            "SELECT id, nickname, role FROM users WHERE nickname = ? AND password_hash = ?",
        )
        .bind(nickname)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", nickname)))?;

        user_from_row(&row)
    }

    // ==================== BANNER OPERATIONS ====================

    /// Whether a banner with exactly this tag set and feature exists.
    pub async fn banner_exists(&self, tag_ids: &TagSet, feature_id: i64) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM banners WHERE tag_key = ? AND feature_id = ?) AS found",
        )
        .bind(tag_ids.key())
        .bind(feature_id)
        .fetch_one(&self.pool)
        .await?;

        let found: i64 = row.try_get("found")?;
        Ok(found != 0)
    }

    /// Insert a banner and its tag memberships, returning the new id.
    pub async fn insert_banner(&self, banner: &NewBanner) -> Result<i64, AppError> {
        let created_at = timestamp::format(&banner.created_at);
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO banners (tag_key, feature_id, title, text, url, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(banner.tag_ids.key())
        .bind(banner.feature_id)
        .bind(&banner.content.title)
        .bind(&banner.content.text)
        .bind(&banner.content.url)
        .bind(banner.is_active)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_as(e, BANNER_CONFLICT))?;

        let id = result.last_insert_rowid();
        insert_tags(&mut tx, id, &banner.tag_ids).await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Get a banner by id.
    pub async fn get_banner(&self, id: i64) -> Result<Banner, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM banners b WHERE b.id = ?", BANNER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Banner {} not found", id)))?;

        banner_from_row(&row)
    }

    /// Replace the stored state of a banner.
    pub async fn update_banner(&self, id: i64, banner: &Banner) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE banners SET tag_key = ?, feature_id = ?, title = ?, text = ?, url = ?, is_active = ?, updated_at = ? WHERE id = ?"
        )
        .bind(banner.tag_ids.key())
        .bind(banner.feature_id)
        .bind(&banner.content.title)
        .bind(&banner.content.text)
        .bind(&banner.content.url)
        .bind(banner.is_active)
        .bind(timestamp::format(&banner.updated_at))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_as(e, BANNER_CONFLICT))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Banner {} not found", id)));
        }

        sqlx::query("DELETE FROM banner_tags WHERE banner_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_tags(&mut tx, id, &banner.tag_ids).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a banner.
    pub async fn delete_banner(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM banner_tags WHERE banner_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM banners WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Banner {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Content of the lowest-id banner tagged with `tag_id` for `feature_id`.
    pub async fn find_content(
        &self,
        tag_id: i64,
        feature_id: i64,
        active_only: bool,
    ) -> Result<Content, AppError> {
        let row = sqlx::query(
            r#"
            SELECT b.title, b.text, b.url
            FROM banners b
            JOIN banner_tags t ON t.banner_id = b.id
            WHERE t.tag_id = ? AND b.feature_id = ? AND (b.is_active = 1 OR ? = 0)
            ORDER BY b.id
            LIMIT 1
            "#,
        )
        .bind(tag_id)
        .bind(feature_id)
        .bind(active_only)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No banner for tag {} and feature {}",
                tag_id, feature_id
            ))
        })?;

        Ok(Content {
            title: row.try_get("title")?,
            text: row.try_get("text")?,
            url: row.try_get("url")?,
        })
    }

    /// List banners tagged with the filter's tag or carrying its feature.
    pub async fn list_banners(&self, filter: &FilterQuery) -> Result<Vec<Banner>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM banners b
            WHERE (? IS NULL AND ? IS NULL)
               OR (? IS NOT NULL AND EXISTS (
                       SELECT 1 FROM banner_tags t WHERE t.banner_id = b.id AND t.tag_id = ?))
               OR (? IS NOT NULL AND b.feature_id = ?)
            ORDER BY b.id
            LIMIT ? OFFSET ?
            "#,
            BANNER_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(filter.tag_id)
            .bind(filter.feature_id)
            .bind(filter.tag_id)
            .bind(filter.tag_id)
            .bind(filter.feature_id)
            .bind(filter.feature_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(banner_from_row).collect()
    }
}

const BANNER_CONFLICT: &str = "Banner with these tag_ids and feature_id already exists";

// Helper functions for row conversion

async fn insert_tags(
    conn: &mut SqliteConnection,
    banner_id: i64,
    tag_ids: &TagSet,
) -> Result<(), AppError> {
    for tag_id in tag_ids.iter() {
        sqlx::query("INSERT INTO banner_tags (banner_id, tag_id) VALUES (?, ?)")
            .bind(banner_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Convert an error into a store error, naming the conflict if it is one.
fn conflict_as(err: sqlx::Error, message: &str) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict(message.to_string()),
        other => other,
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        nickname: row.try_get("nickname")?,
        role: role
            .parse::<Role>()
            .map_err(|_| AppError::Storage(format!("Corrupt role '{}' in store", role)))?,
    })
}

fn banner_from_row(row: &SqliteRow) -> Result<Banner, AppError> {
    let tag_key: String = row.try_get("tag_key")?;
    let is_active: i64 = row.try_get("is_active")?;
    Ok(Banner {
        banner_id: row.try_get("id")?,
        tag_ids: TagSet::from_key(&tag_key)?,
        feature_id: row.try_get("feature_id")?,
        content: Content {
            title: row.try_get("title")?,
            text: row.try_get("text")?,
            url: row.try_get("url")?,
        },
        is_active: is_active != 0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
