use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::protocol::{timestamp, Session, User};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite, Transaction,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
/// Older builds wrote the credential under this key as well.
pub const LEGACY_TOKEN_KEY: &str = "accessToken";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub session: Session,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open session database '{database_url}'"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Loads the persisted session, moving a legacy `accessToken` entry under `token` first.
    ///
    /// A user record that no longer decodes is dropped so the caller refetches it.
    pub async fn load_session(&self) -> Result<Option<StoredSession>> {
        let mut tx = self.pool.begin().await?;
        migrate_legacy_token(&mut tx).await?;

        let token_row = sqlx::query("SELECT value, updated_at FROM session_entries WHERE key = ?")
            .bind(TOKEN_KEY)
            .fetch_optional(&mut *tx)
            .await?;
        let user_raw: Option<String> =
            sqlx::query_scalar("SELECT value FROM session_entries WHERE key = ?")
                .bind(USER_KEY)
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;

        let Some(token_row) = token_row else {
            return Ok(None);
        };
        let token: String = token_row.try_get("value")?;
        let updated_at: Option<String> = token_row.try_get("updated_at")?;
        let user = user_raw.and_then(|raw| serde_json::from_str::<User>(&raw).ok());

        Ok(Some(StoredSession {
            session: Session { token, user },
            updated_at: updated_at.as_deref().and_then(timestamp::parse),
        }))
    }

    pub async fn save_session(&self, session: &Session) -> Result<()> {
        let user_json = session
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("failed to serialize session user")?;

        let mut tx = self.pool.begin().await?;
        put_entry(&mut tx, TOKEN_KEY, &session.token).await?;
        match user_json {
            Some(raw) => put_entry(&mut tx, USER_KEY, &raw).await?,
            None => {
                delete_entries(&mut tx, &[USER_KEY]).await?;
            }
        }
        delete_entries(&mut tx, &[LEGACY_TOKEN_KEY]).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn save_user(&self, user: Option<&User>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        match user {
            Some(user) => {
                let raw = serde_json::to_string(user).context("failed to serialize user")?;
                put_entry(&mut tx, USER_KEY, &raw).await?;
            }
            None => {
                delete_entries(&mut tx, &[USER_KEY]).await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// Removes token, user and legacy entries together. Returns the number of rows removed.
    pub async fn clear_session(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = delete_entries(&mut tx, &[TOKEN_KEY, USER_KEY, LEGACY_TOKEN_KEY]).await?;
        tx.commit().await?;
        Ok(removed)
    }

    pub async fn raw_entry(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM session_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn put_raw_entry(&self, key: &str, value: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        put_entry(&mut tx, key, value).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn put_entry(tx: &mut Transaction<'_, Sqlite>, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO session_entries (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("failed to write session entry '{key}'"))?;
    Ok(())
}

async fn delete_entries(tx: &mut Transaction<'_, Sqlite>, keys: &[&str]) -> Result<u64> {
    let mut removed = 0;
    for key in keys {
        removed += sqlx::query("DELETE FROM session_entries WHERE key = ?")
            .bind(key)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("failed to delete session entry '{key}'"))?
            .rows_affected();
    }
    Ok(removed)
}

async fn migrate_legacy_token(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    let legacy: Option<String> =
        sqlx::query_scalar("SELECT value FROM session_entries WHERE key = ?")
            .bind(LEGACY_TOKEN_KEY)
            .fetch_optional(&mut **tx)
            .await?;
    let Some(legacy) = legacy else {
        return Ok(());
    };

    sqlx::query(
        "INSERT INTO session_entries (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO NOTHING",
    )
    .bind(TOKEN_KEY)
    .bind(&legacy)
    .execute(&mut **tx)
    .await?;
    delete_entries(tx, &[LEGACY_TOKEN_KEY]).await?;
    Ok(())
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
