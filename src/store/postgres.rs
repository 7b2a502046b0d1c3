//! PostgreSQL repository
//!
//! Enumerations are stored as TEXT and parsed back with `FromStr`.
//! Speakers and languages of a proposal are array columns.

use super::Repository;
use crate::config::DatabaseConfig;
use crate::deliberation::DeliberationState;
use crate::error::AppError;
use crate::models::{Comment, CommentChannel, Event, Proposal, Review, Team, TeamMember, TeamRole, User};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use postgres_types::ToSql;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email VARCHAR(255) UNIQUE NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        name VARCHAR(255) NOT NULL,
        bio TEXT,
        company VARCHAR(255),
        location VARCHAR(255),
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS teams (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        slug VARCHAR(255) UNIQUE NOT NULL,
        invitation_code VARCHAR(64) UNIQUE NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS team_members (
        team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        role VARCHAR(16) NOT NULL,
        joined_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (team_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id UUID PRIMARY KEY,
        team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
        name VARCHAR(255) NOT NULL,
        slug VARCHAR(255) UNIQUE NOT NULL,
        type VARCHAR(16) NOT NULL,
        description TEXT,
        location VARCHAR(255),
        cfp_start TIMESTAMPTZ,
        cfp_end TIMESTAMPTZ,
        max_proposals INTEGER,
        review_enabled BOOLEAN NOT NULL DEFAULT true,
        display_proposals_reviews BOOLEAN NOT NULL DEFAULT true,
        display_proposals_speakers BOOLEAN NOT NULL DEFAULT true,
        api_key_hash VARCHAR(64),
        archived BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS proposals (
        id UUID PRIMARY KEY,
        event_id UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        title VARCHAR(255) NOT NULL,
        abstract TEXT NOT NULL,
        level VARCHAR(16),
        languages TEXT[] NOT NULL DEFAULT '{}',
        \"references\" TEXT,
        speakers UUID[] NOT NULL,
        deliberation_status VARCHAR(16) NOT NULL DEFAULT 'PENDING',
        publication_status VARCHAR(16) NOT NULL DEFAULT 'NOT_PUBLISHED',
        confirmation_status VARCHAR(16),
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS reviews (
        id UUID PRIMARY KEY,
        proposal_id UUID NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        feeling VARCHAR(16) NOT NULL,
        score INTEGER,
        note TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        UNIQUE (user_id, proposal_id)
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id UUID PRIMARY KEY,
        proposal_id UUID NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        channel VARCHAR(16) NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_events_team_id ON events(team_id)",
    "CREATE INDEX IF NOT EXISTS idx_proposals_event_id ON proposals(event_id)",
    "CREATE INDEX IF NOT EXISTS idx_proposals_speakers ON proposals USING GIN (speakers)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_proposal_id ON reviews(proposal_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_proposal_id ON comments(proposal_id)",
];

const USER_COLUMNS: &str =
    "id, email, password_hash, name, bio, company, location, created_at, updated_at";
const TEAM_COLUMNS: &str = "id, name, slug, invitation_code, created_at, updated_at";
const MEMBER_COLUMNS: &str = "team_id, user_id, role, joined_at";
const EVENT_COLUMNS: &str = "id, team_id, name, slug, type, description, location, cfp_start, \
     cfp_end, max_proposals, review_enabled, display_proposals_reviews, \
     display_proposals_speakers, api_key_hash, archived, created_at, updated_at";
const PROPOSAL_COLUMNS: &str = "id, event_id, title, abstract, level, languages, \"references\", \
     speakers, deliberation_status, publication_status, confirmation_status, created_at, updated_at";
const REVIEW_COLUMNS: &str =
    "id, proposal_id, user_id, feeling, score, note, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, proposal_id, user_id, channel, content, created_at";

const UPDATE_PENDING_PROPOSAL: &str = "UPDATE proposals SET title = $2, abstract = $3, level = $4, \
     languages = $5, \"references\" = $6, speakers = $7, updated_at = $8 \
     WHERE id = $1 AND deliberation_status = 'PENDING'";

const TRANSITION_PROPOSAL: &str = "UPDATE proposals SET deliberation_status = $2, \
     publication_status = $3, confirmation_status = $4, updated_at = $5 \
     WHERE id = $1 AND deliberation_status = $6 AND publication_status = $7 \
     AND confirmation_status IS NOT DISTINCT FROM $8";

/// Repository backed by a deadpool connection pool
pub struct PostgresRepository {
    pool: Pool,
}

impl PostgresRepository {
    /// Build the pool and check that the server answers
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.user = Some(config.user.clone());
        cfg.password = Some(config.password.clone());
        cfg.dbname = Some(config.database.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(config.max_pool_size));

        let pool = if config.require_tls {
            let certs = rustls_native_certs::load_native_certs();
            let mut root_store = rustls::RootCertStore::empty();
            for cert in certs.certs {
                root_store.add(cert).ok();
            }
            let tls_config = rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();
            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
            cfg.create_pool(Some(Runtime::Tokio1), tls)
        } else {
            cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        }
        .map_err(|e| AppError::Config(format!("Failed to create pool: {}", e)))?;

        let client = pool.get().await?;
        client.query_one("SELECT 1", &[]).await?;
        drop(client);

        info!(
            host = %config.host,
            database = %config.database,
            tls = config.require_tls,
            "Database connection established"
        );
        Ok(Self { pool })
    }

    /// Create the tables if they don't exist
    pub async fn migrate(&self) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        for statement in SCHEMA {
            client.execute(*statement, &[]).await?;
        }
        info!("Database tables initialized");
        Ok(())
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, AppError> {
        let client = self.pool.get().await?;
        Ok(client.query(sql, params).await?)
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, AppError> {
        let client = self.pool.get().await?;
        Ok(client.query_opt(sql, params).await?)
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, AppError> {
        let client = self.pool.get().await?;
        client.execute(sql, params).await.map_err(conflict_or_db)
    }
}

/// Map unique-key violations to `Conflict`
fn conflict_or_db(err: tokio_postgres::Error) -> AppError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        let detail = err
            .as_db_error()
            .and_then(|db| db.constraint().map(|c| c.to_string()))
            .unwrap_or_else(|| "unique key".to_string());
        debug!(constraint = %detail, "Unique constraint violated");
        return AppError::Conflict(format!("Duplicate value violates {}", detail));
    }
    AppError::Database(err)
}

fn user_from_row(row: &Row) -> Result<User, AppError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        bio: row.try_get("bio")?,
        company: row.try_get("company")?,
        location: row.try_get("location")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn team_from_row(row: &Row) -> Result<Team, AppError> {
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        invitation_code: row.try_get("invitation_code")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn member_from_row(row: &Row) -> Result<TeamMember, AppError> {
    Ok(TeamMember {
        team_id: row.try_get("team_id")?,
        user_id: row.try_get("user_id")?,
        role: row.try_get::<_, String>("role")?.parse()?,
        joined_at: row.try_get("joined_at")?,
    })
}

fn event_from_row(row: &Row) -> Result<Event, AppError> {
    Ok(Event {
        id: row.try_get("id")?,
        team_id: row.try_get("team_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        event_type: row.try_get::<_, String>("type")?.parse()?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        cfp_start: row.try_get("cfp_start")?,
        cfp_end: row.try_get("cfp_end")?,
        max_proposals: row.try_get("max_proposals")?,
        review_enabled: row.try_get("review_enabled")?,
        display_proposals_reviews: row.try_get("display_proposals_reviews")?,
        display_proposals_speakers: row.try_get("display_proposals_speakers")?,
        api_key_hash: row.try_get("api_key_hash")?,
        archived: row.try_get("archived")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn proposal_from_row(row: &Row) -> Result<Proposal, AppError> {
    let level: Option<String> = row.try_get("level")?;
    let confirmation: Option<String> = row.try_get("confirmation_status")?;
    Ok(Proposal {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        title: row.try_get("title")?,
        abstract_text: row.try_get("abstract")?,
        level: level.map(|l| l.parse()).transpose()?,
        languages: row.try_get("languages")?,
        references: row.try_get("references")?,
        speakers: row.try_get("speakers")?,
        deliberation: DeliberationState {
            deliberation_status: row.try_get::<_, String>("deliberation_status")?.parse()?,
            publication_status: row.try_get::<_, String>("publication_status")?.parse()?,
            confirmation_status: confirmation.map(|c| c.parse()).transpose()?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn review_from_row(row: &Row) -> Result<Review, AppError> {
    Ok(Review {
        id: row.try_get("id")?,
        proposal_id: row.try_get("proposal_id")?,
        user_id: row.try_get("user_id")?,
        feeling: row.try_get::<_, String>("feeling")?.parse()?,
        score: row.try_get("score")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn comment_from_row(row: &Row) -> Result<Comment, AppError> {
    Ok(Comment {
        id: row.try_get("id")?,
        proposal_id: row.try_get("proposal_id")?,
        user_id: row.try_get("user_id")?,
        channel: row.try_get::<_, String>("channel")?.parse()?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

fn collect<T>(rows: Vec<Row>, map: fn(&Row) -> Result<T, AppError>) -> Result<Vec<T>, AppError> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: User) -> Result<User, AppError> {
        self.execute(
            &format!("INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)", USER_COLUMNS),
            &[
                &user.id,
                &user.email,
                &user.password_hash,
                &user.name,
                &user.bio,
                &user.company,
                &user.location,
                &user.created_at,
                &user.updated_at,
            ],
        )
        .await?;
        Ok(user)
    }

    async fn update_user(&self, user: User) -> Result<User, AppError> {
        let updated = self
            .execute(
                "UPDATE users SET name = $2, bio = $3, company = $4, location = $5, updated_at = $6 WHERE id = $1",
                &[&user.id, &user.name, &user.bio, &user.company, &user.location, &user.updated_at],
            )
            .await?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        }
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        self.query_opt(&sql, &[&id]).await?.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        self.query_opt(&sql, &[&email]).await?.as_ref().map(user_from_row).transpose()
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        collect(self.query(&sql, &[&ids]).await?, user_from_row)
    }

    async fn create_team_with_owner(&self, team: Team, owner_id: Uuid) -> Result<Team, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        tx.execute(
            &format!("INSERT INTO teams ({}) VALUES ($1, $2, $3, $4, $5, $6)", TEAM_COLUMNS),
            &[&team.id, &team.name, &team.slug, &team.invitation_code, &team.created_at, &team.updated_at],
        )
        .await
        .map_err(conflict_or_db)?;
        tx.execute(
            &format!("INSERT INTO team_members ({}) VALUES ($1, $2, $3, $4)", MEMBER_COLUMNS),
            &[&team.id, &owner_id, &TeamRole::Owner.as_str(), &team.created_at],
        )
        .await
        .map_err(conflict_or_db)?;
        tx.commit().await?;
        Ok(team)
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, AppError> {
        let sql = format!("SELECT {} FROM teams WHERE id = $1", TEAM_COLUMNS);
        self.query_opt(&sql, &[&id]).await?.as_ref().map(team_from_row).transpose()
    }

    async fn find_team_by_slug(&self, slug: &str) -> Result<Option<Team>, AppError> {
        let sql = format!("SELECT {} FROM teams WHERE slug = $1", TEAM_COLUMNS);
        self.query_opt(&sql, &[&slug]).await?.as_ref().map(team_from_row).transpose()
    }

    async fn find_team_by_invitation_code(&self, code: &str) -> Result<Option<Team>, AppError> {
        let sql = format!("SELECT {} FROM teams WHERE invitation_code = $1", TEAM_COLUMNS);
        self.query_opt(&sql, &[&code]).await?.as_ref().map(team_from_row).transpose()
    }

    async fn list_user_teams(&self, user_id: Uuid) -> Result<Vec<(Team, TeamRole)>, AppError> {
        let rows = self
            .query(
                "SELECT t.id, t.name, t.slug, t.invitation_code, t.created_at, t.updated_at, m.role
                 FROM teams t JOIN team_members m ON m.team_id = t.id
                 WHERE m.user_id = $1 ORDER BY t.name",
                &[&user_id],
            )
            .await?;
        rows.iter()
            .map(|row| {
                let role: TeamRole = row.try_get::<_, String>("role")?.parse()?;
                Ok((team_from_row(row)?, role))
            })
            .collect()
    }

    async fn add_member(&self, member: TeamMember) -> Result<TeamMember, AppError> {
        self.execute(
            &format!("INSERT INTO team_members ({}) VALUES ($1, $2, $3, $4)", MEMBER_COLUMNS),
            &[&member.team_id, &member.user_id, &member.role.as_str(), &member.joined_at],
        )
        .await?;
        Ok(member)
    }

    async fn find_member(&self, team_id: Uuid, user_id: Uuid) -> Result<Option<TeamMember>, AppError> {
        let sql = format!(
            "SELECT {} FROM team_members WHERE team_id = $1 AND user_id = $2",
            MEMBER_COLUMNS
        );
        self.query_opt(&sql, &[&team_id, &user_id]).await?.as_ref().map(member_from_row).transpose()
    }

    async fn list_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, AppError> {
        let sql = format!(
            "SELECT {} FROM team_members WHERE team_id = $1 ORDER BY joined_at",
            MEMBER_COLUMNS
        );
        collect(self.query(&sql, &[&team_id]).await?, member_from_row)
    }

    async fn update_member_role(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> Result<Option<TeamMember>, AppError> {
        let sql = format!(
            "UPDATE team_members SET role = $3 WHERE team_id = $1 AND user_id = $2 RETURNING {}",
            MEMBER_COLUMNS
        );
        self.query_opt(&sql, &[&team_id, &user_id, &role.as_str()])
            .await?
            .as_ref()
            .map(member_from_row)
            .transpose()
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let deleted = self
            .execute(
                "DELETE FROM team_members WHERE team_id = $1 AND user_id = $2",
                &[&team_id, &user_id],
            )
            .await?;
        Ok(deleted > 0)
    }

    async fn create_event(&self, event: Event) -> Result<Event, AppError> {
        self.execute(
            &format!(
                "INSERT INTO events ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
                EVENT_COLUMNS
            ),
            &[
                &event.id,
                &event.team_id,
                &event.name,
                &event.slug,
                &event.event_type.as_str(),
                &event.description,
                &event.location,
                &event.cfp_start,
                &event.cfp_end,
                &event.max_proposals,
                &event.review_enabled,
                &event.display_proposals_reviews,
                &event.display_proposals_speakers,
                &event.api_key_hash,
                &event.archived,
                &event.created_at,
                &event.updated_at,
            ],
        )
        .await?;
        Ok(event)
    }

    async fn update_event(&self, event: Event) -> Result<Event, AppError> {
        let updated = self
            .execute(
                "UPDATE events SET name = $2, description = $3, location = $4, cfp_start = $5, \
                 cfp_end = $6, max_proposals = $7, review_enabled = $8, \
                 display_proposals_reviews = $9, display_proposals_speakers = $10, \
                 api_key_hash = $11, archived = $12, updated_at = $13 WHERE id = $1",
                &[
                    &event.id,
                    &event.name,
                    &event.description,
                    &event.location,
                    &event.cfp_start,
                    &event.cfp_end,
                    &event.max_proposals,
                    &event.review_enabled,
                    &event.display_proposals_reviews,
                    &event.display_proposals_speakers,
                    &event.api_key_hash,
                    &event.archived,
                    &event.updated_at,
                ],
            )
            .await?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("Event {} not found", event.id)));
        }
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        self.query_opt(&sql, &[&id]).await?.as_ref().map(event_from_row).transpose()
    }

    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, AppError> {
        let sql = format!("SELECT {} FROM events WHERE slug = $1", EVENT_COLUMNS);
        self.query_opt(&sql, &[&slug]).await?.as_ref().map(event_from_row).transpose()
    }

    async fn list_team_events(&self, team_id: Uuid) -> Result<Vec<Event>, AppError> {
        let sql = format!(
            "SELECT {} FROM events WHERE team_id = $1 ORDER BY created_at DESC",
            EVENT_COLUMNS
        );
        collect(self.query(&sql, &[&team_id]).await?, event_from_row)
    }

    async fn create_proposal(&self, proposal: Proposal) -> Result<Proposal, AppError> {
        let state = &proposal.deliberation;
        self.execute(
            &format!(
                "INSERT INTO proposals ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
                PROPOSAL_COLUMNS
            ),
            &[
                &proposal.id,
                &proposal.event_id,
                &proposal.title,
                &proposal.abstract_text,
                &proposal.level.map(|l| l.as_str()),
                &proposal.languages,
                &proposal.references,
                &proposal.speakers,
                &state.deliberation_status.as_str(),
                &state.publication_status.as_str(),
                &state.confirmation_status.map(|c| c.as_str()),
                &proposal.created_at,
                &proposal.updated_at,
            ],
        )
        .await?;
        Ok(proposal)
    }

    async fn update_pending_proposal(&self, proposal: Proposal) -> Result<Option<Proposal>, AppError> {
        let sql = format!("{} RETURNING {}", UPDATE_PENDING_PROPOSAL, PROPOSAL_COLUMNS);
        self.query_opt(
            &sql,
            &[
                &proposal.id,
                &proposal.title,
                &proposal.abstract_text,
                &proposal.level.map(|l| l.as_str()),
                &proposal.languages,
                &proposal.references,
                &proposal.speakers,
                &proposal.updated_at,
            ],
        )
        .await?
        .as_ref()
        .map(proposal_from_row)
        .transpose()
    }

    async fn transition_proposal(
        &self,
        expected: DeliberationState,
        proposal: Proposal,
    ) -> Result<Option<Proposal>, AppError> {
        let sql = format!("{} RETURNING {}", TRANSITION_PROPOSAL, PROPOSAL_COLUMNS);
        let state = &proposal.deliberation;
        self.query_opt(
            &sql,
            &[
                &proposal.id,
                &state.deliberation_status.as_str(),
                &state.publication_status.as_str(),
                &state.confirmation_status.map(|c| c.as_str()),
                &proposal.updated_at,
                &expected.deliberation_status.as_str(),
                &expected.publication_status.as_str(),
                &expected.confirmation_status.map(|c| c.as_str()),
            ],
        )
        .await?
        .as_ref()
        .map(proposal_from_row)
        .transpose()
    }

    async fn transition_proposals(
        &self,
        transitions: Vec<(DeliberationState, Proposal)>,
    ) -> Result<Vec<Proposal>, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let sql = format!("{} RETURNING {}", TRANSITION_PROPOSAL, PROPOSAL_COLUMNS);
        let statement = tx.prepare(&sql).await?;
        let mut applied = Vec::with_capacity(transitions.len());
        for (expected, proposal) in &transitions {
            let state = &proposal.deliberation;
            let row = tx
                .query_opt(
                    &statement,
                    &[
                        &proposal.id,
                        &state.deliberation_status.as_str(),
                        &state.publication_status.as_str(),
                        &state.confirmation_status.map(|c| c.as_str()),
                        &proposal.updated_at,
                        &expected.deliberation_status.as_str(),
                        &expected.publication_status.as_str(),
                        &expected.confirmation_status.map(|c| c.as_str()),
                    ],
                )
                .await?;
            if let Some(row) = row {
                applied.push(proposal_from_row(&row)?);
            }
        }
        tx.commit().await?;
        debug!(
            requested = transitions.len(),
            applied = applied.len(),
            "Proposal statuses updated"
        );
        Ok(applied)
    }

    async fn delete_pending_proposal(&self, id: Uuid) -> Result<bool, AppError> {
        let deleted = self
            .execute(
                "DELETE FROM proposals WHERE id = $1 AND deliberation_status = 'PENDING'",
                &[&id],
            )
            .await?;
        Ok(deleted > 0)
    }

    async fn find_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError> {
        let sql = format!("SELECT {} FROM proposals WHERE id = $1", PROPOSAL_COLUMNS);
        self.query_opt(&sql, &[&id]).await?.as_ref().map(proposal_from_row).transpose()
    }

    async fn list_event_proposals(&self, event_id: Uuid) -> Result<Vec<Proposal>, AppError> {
        let sql = format!(
            "SELECT {} FROM proposals WHERE event_id = $1 ORDER BY created_at DESC",
            PROPOSAL_COLUMNS
        );
        collect(self.query(&sql, &[&event_id]).await?, proposal_from_row)
    }

    async fn list_speaker_proposals(&self, user_id: Uuid) -> Result<Vec<Proposal>, AppError> {
        let sql = format!(
            "SELECT {} FROM proposals WHERE $1 = ANY(speakers) ORDER BY created_at DESC",
            PROPOSAL_COLUMNS
        );
        collect(self.query(&sql, &[&user_id]).await?, proposal_from_row)
    }

    async fn upsert_review(&self, review: Review) -> Result<Review, AppError> {
        let sql = format!(
            "INSERT INTO reviews ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (user_id, proposal_id) DO UPDATE
             SET feeling = EXCLUDED.feeling, score = EXCLUDED.score, note = EXCLUDED.note,
                 updated_at = EXCLUDED.updated_at
             RETURNING {cols}",
            cols = REVIEW_COLUMNS
        );
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &sql,
                &[
                    &review.id,
                    &review.proposal_id,
                    &review.user_id,
                    &review.feeling.as_str(),
                    &review.score,
                    &review.note,
                    &review.created_at,
                    &review.updated_at,
                ],
            )
            .await?;
        review_from_row(&row)
    }

    async fn list_reviews(&self, proposal_ids: &[Uuid]) -> Result<Vec<Review>, AppError> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE proposal_id = ANY($1) ORDER BY created_at",
            REVIEW_COLUMNS
        );
        collect(self.query(&sql, &[&proposal_ids]).await?, review_from_row)
    }

    async fn add_comment(&self, comment: Comment) -> Result<Comment, AppError> {
        self.execute(
            &format!("INSERT INTO comments ({}) VALUES ($1, $2, $3, $4, $5, $6)", COMMENT_COLUMNS),
            &[
                &comment.id,
                &comment.proposal_id,
                &comment.user_id,
                &comment.channel.as_str(),
                &comment.content,
                &comment.created_at,
            ],
        )
        .await?;
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        let sql = format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS);
        self.query_opt(&sql, &[&id]).await?.as_ref().map(comment_from_row).transpose()
    }

    async fn list_comments(
        &self,
        proposal_id: Uuid,
        channel: CommentChannel,
    ) -> Result<Vec<Comment>, AppError> {
        let sql = format!(
            "SELECT {} FROM comments WHERE proposal_id = $1 AND channel = $2 ORDER BY created_at",
            COMMENT_COLUMNS
        );
        collect(self.query(&sql, &[&proposal_id, &channel.as_str()]).await?, comment_from_row)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, AppError> {
        let deleted = self
            .execute("DELETE FROM comments WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }
}
