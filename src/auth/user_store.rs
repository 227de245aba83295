//! User Storage
//! Mission: Securely store and manage user accounts with SQLite

use crate::auth::models::{Role, User};
use crate::db;
use anyhow::{Context, Result};
use bcrypt::{hash, verify};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

const USER_COLUMNS: &str =
    "id, email, password, role, first_name, last_name, created_at, updated_at";

/// Account seeded on first start when no admin exists.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

/// Data for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
    password_cost: u32,
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str, password_cost: u32, admin_seed: Option<&AdminSeed>) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
            password_cost,
        };
        store.init_db(admin_seed)?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self, admin_seed: Option<&AdminSeed>) -> Result<()> {
        let conn = db::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT COLLATE NOCASE,
                password TEXT,
                role TEXT,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS users_email ON users (email)",
            [],
        )?;

        if let Some(seed) = admin_seed {
            self.create_default_admin(&conn, seed)?;
        }

        Ok(())
    }

    /// Create default admin user for initial setup
    fn create_default_admin(&self, conn: &Connection, seed: &AdminSeed) -> Result<()> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin' AND deleted_at IS NULL",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count == 0 {
            let password_hash =
                hash(&seed.password, self.password_cost).context("Failed to hash password")?;
            let now = Utc::now().to_rfc3339();

            conn.execute(
                "INSERT INTO users (email, password, role, first_name, last_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, '', '', ?4, ?4)",
                params![seed.email, password_hash, Role::Admin.as_str(), now],
            )
            .context("Failed to insert admin user")?;

            info!("Default admin user created ({})", seed.email);
            warn!("Change the default admin password in production");
        }

        Ok(())
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        let role: Option<String> = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            email: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            password_hash: row.get(2)?,
            role: role.as_deref().and_then(Role::from_name).unwrap_or(Role::User),
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    /// Get a live (not deleted) user by id
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = db::open(&self.db_path)?;
        let sql = format!(
            "SELECT {} FROM users WHERE id = ?1 AND deleted_at IS NULL",
            USER_COLUMNS
        );
        conn.query_row(&sql, params![user_id], Self::user_from_row)
            .optional()
            .context("Failed to query user")
    }

    /// Get a live user by email, ignoring case
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = db::open(&self.db_path)?;
        let sql = format!(
            "SELECT {} FROM users
             WHERE email = ?1 COLLATE NOCASE AND deleted_at IS NULL ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        conn.query_row(&sql, params![email], Self::user_from_row)
            .optional()
            .context("Failed to query user by email")
    }

    /// Whether another live account already uses `email` (case-insensitive)
    pub fn email_taken(&self, email: &str, except_user_id: Option<i64>) -> Result<bool> {
        let conn = db::open(&self.db_path)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users
             WHERE email = ?1 COLLATE NOCASE AND deleted_at IS NULL AND (?2 IS NULL OR id != ?2)",
            params![email, except_user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Verify email and password, returning the user on success.
    ///
    /// Unknown email, missing password and wrong password all yield `None`.
    pub fn check_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_user_by_email(email)? else {
            return Ok(None);
        };
        let Some(password_hash) = user.password_hash.as_deref() else {
            return Ok(None);
        };

        let valid = verify(password, password_hash).context("Failed to verify password")?;
        Ok(valid.then_some(user))
    }

    /// Create a new user
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let password_hash = new_user
            .password
            .as_deref()
            .map(|p| hash(p, self.password_cost))
            .transpose()
            .context("Failed to hash password")?;
        let now = Utc::now().to_rfc3339();

        let conn = db::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO users (email, password, role, first_name, last_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                new_user.email,
                password_hash,
                new_user.role.as_str(),
                new_user.first_name,
                new_user.last_name,
                now,
            ],
        )
        .context("Failed to insert user")?;

        let user = User {
            id: conn.last_insert_rowid(),
            email: new_user.email.clone(),
            password_hash,
            role: new_user.role,
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        info!("Created user: {} ({})", user.email, user.role.as_str());
        Ok(user)
    }

    /// Apply `changes` to a live user; `None` when the user does not exist.
    ///
    /// Role changes must also revoke the user's tokens, so callers go through
    /// `AuthService::update_user`.
    pub(super) fn update_user(&self, user_id: i64, changes: &UserChanges) -> Result<Option<User>> {
        let Some(mut user) = self.get_user(user_id)? else {
            return Ok(None);
        };

        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(password) = &changes.password {
            user.password_hash =
                Some(hash(password, self.password_cost).context("Failed to hash password")?);
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(first_name) = &changes.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &changes.last_name {
            user.last_name = last_name.clone();
        }
        user.updated_at = Utc::now().to_rfc3339();

        let conn = db::open(&self.db_path)?;
        conn.execute(
            "UPDATE users SET email = ?1, password = ?2, role = ?3, first_name = ?4,
                 last_name = ?5, updated_at = ?6
             WHERE id = ?7 AND deleted_at IS NULL",
            params![
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.first_name,
                user.last_name,
                user.updated_at,
                user.id,
            ],
        )
        .context("Failed to update user")?;

        info!("Updated user: {}", user.id);
        Ok(Some(user))
    }

    /// List all live users (admin only)
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = db::open(&self.db_path)?;
        let sql = format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY id",
            USER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Soft-delete a user by ID
    pub fn delete_user(&self, user_id: i64) -> Result<()> {
        let conn = db::open(&self.db_path)?;

        let rows_affected = conn.execute(
            "UPDATE users SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![Utc::now().to_rfc3339(), user_id],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("User not found");
        }

        info!("Deleted user: {}", user_id);
        Ok(())
    }
}
