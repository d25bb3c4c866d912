//! Repository for the `sites` table.

use corral_core::history::SiteHistoryEntry;
use corral_core::site::{NewSite, Site};
use corral_core::state::SiteState;
use corral_core::types::{DbId, Timestamp};
use sqlx::types::Json;

use crate::models::decode_error;
use crate::models::history::HistoryRow;
use crate::models::site::SiteRow;
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, install_path, local_path, \
    staging_service_type, staging_service_contact, staging_service_project, staging_service_queue, \
    glidein_service_type, glidein_service_contact, glidein_service_project, glidein_service_queue, \
    condor_version, condor_package, environment, state, short_message, long_message, \
    created, last_update, subject, local_username";

fn into_site(row: SiteRow) -> Result<Site, sqlx::Error> {
    Site::try_from(row).map_err(decode_error)
}

/// Provides persistence operations for sites.
pub struct SiteRepo;

impl SiteRepo {
    /// Insert a new site in the `NEW` state, returning the created row.
    ///
    /// The first history entry is written in the same transaction.
    pub async fn create(pool: &DbPool, input: &NewSite) -> Result<Site, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO sites (name, install_path, local_path,
                staging_service_type, staging_service_contact,
                staging_service_project, staging_service_queue,
                glidein_service_type, glidein_service_contact,
                glidein_service_project, glidein_service_queue,
                condor_version, condor_package, environment,
                state, short_message, created, last_update, subject, local_username)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                ?15, 'Created', ?16, ?16, ?17, ?18)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, SiteRow>(&query)
            .bind(&input.name)
            .bind(&input.install_path)
            .bind(&input.local_path)
            .bind(input.staging_service.service_type.as_str())
            .bind(&input.staging_service.service_contact)
            .bind(&input.staging_service.project)
            .bind(&input.staging_service.queue)
            .bind(input.glidein_service.service_type.as_str())
            .bind(&input.glidein_service.service_contact)
            .bind(&input.glidein_service.project)
            .bind(&input.glidein_service.queue)
            .bind(&input.condor_version)
            .bind(&input.condor_package)
            .bind(Json(&input.environment))
            .bind(SiteState::New.as_str())
            .bind(input.created)
            .bind(&input.subject)
            .bind(&input.local_username)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO site_history (site_id, state, time) VALUES (?1, ?2, ?3)")
            .bind(row.id)
            .bind(SiteState::New.as_str())
            .bind(input.created)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        into_site(row)
    }

    /// Find a site by its ID.
    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<Site>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sites WHERE id = ?1");
        sqlx::query_as::<_, SiteRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(into_site)
            .transpose()
    }

    /// List sites ordered by ID. `None` lists every user's sites.
    pub async fn list(pool: &DbPool, user: Option<&str>) -> Result<Vec<Site>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sites
             WHERE ?1 IS NULL OR local_username = ?1
             ORDER BY id"
        );
        sqlx::query_as::<_, SiteRow>(&query)
            .bind(user)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(into_site)
            .collect()
    }

    /// IDs of all sites, used for state recovery at startup.
    pub async fn list_ids(pool: &DbPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM sites ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Record a state change and append it to the site's history.
    /// Returns `true` if the site exists; a missing site gets no history.
    pub async fn update_state(
        pool: &DbPool,
        id: DbId,
        state: SiteState,
        short_message: &str,
        long_message: Option<&str>,
        time: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE sites
             SET state = ?2, short_message = ?3, long_message = ?4, last_update = ?5
             WHERE id = ?1",
        )
        .bind(id)
        .bind(state.as_str())
        .bind(short_message)
        .bind(long_message)
        .bind(time)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(site_id = id, %state, "State change for missing site");
            return Ok(false);
        }

        sqlx::query("INSERT INTO site_history (site_id, state, time) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(state.as_str())
            .bind(time)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// State changes of a site in the order they happened. Empty if the
    /// site never existed.
    pub async fn history(pool: &DbPool, id: DbId) -> Result<Vec<SiteHistoryEntry>, sqlx::Error> {
        sqlx::query_as::<_, HistoryRow>(
            "SELECT site_id AS id, state, time FROM site_history
             WHERE site_id = ?1
             ORDER BY id",
        )
        .bind(id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.into_entry().map_err(decode_error))
        .collect()
    }

    /// Permanently delete a site (and, by cascade, its glideins).
    /// The history is kept.
    pub async fn delete(pool: &DbPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sites WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        tracing::debug!(site_id = id, deleted = result.rows_affected(), "Deleted site row");
        Ok(result.rows_affected() > 0)
    }

    /// Whether any glidein still references the site.
    pub async fn has_glideins(pool: &DbPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM glideins WHERE site_id = ?1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// IDs of the site's glideins.
    pub async fn glidein_ids(pool: &DbPool, id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM glideins WHERE site_id = ?1 ORDER BY id")
            .bind(id)
            .fetch_all(pool)
            .await
    }
}
