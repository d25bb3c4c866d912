//! Repository for the `glideins` table.

use corral_core::glidein::{Glidein, NewGlidein};
use corral_core::history::GlideinHistoryEntry;
use corral_core::state::GlideinState;
use corral_core::types::{DbId, Timestamp};

use crate::models::decode_error;
use crate::models::glidein::GlideinRow;
use crate::models::history::HistoryRow;
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, site_id, site_name, condor_host, count, host_count, wall_time, \
    num_cpus, condor_config, gcb_broker, highport, lowport, ccb_address, idle_time, \
    condor_debug, resubmit, until, resubmits, rsl, state, short_message, long_message, \
    created, last_update, submits, subject, local_username";

fn into_glidein(row: GlideinRow) -> Result<Glidein, sqlx::Error> {
    Glidein::try_from(row).map_err(decode_error)
}

/// Provides persistence operations for glideins.
pub struct GlideinRepo;

impl GlideinRepo {
    /// Insert a new glidein in the `NEW` state with zero submits, and its
    /// first history entry.
    pub async fn create(pool: &DbPool, input: &NewGlidein) -> Result<Glidein, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let req = &input.request;
        let query = format!(
            "INSERT INTO glideins (site_id, site_name, condor_host, count, host_count,
                wall_time, num_cpus, condor_config, gcb_broker, highport, lowport,
                ccb_address, idle_time, condor_debug, resubmit, until, resubmits, rsl,
                state, short_message, created, last_update, submits, subject, local_username)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19, 'Created', ?20, ?20, 0, ?21, ?22)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, GlideinRow>(&query)
            .bind(req.site_id)
            .bind(&input.site_name)
            .bind(&req.condor_host)
            .bind(req.count)
            .bind(req.host_count)
            .bind(req.wall_time)
            .bind(req.num_cpus)
            .bind(&req.condor_config)
            .bind(&req.gcb_broker)
            .bind(req.highport)
            .bind(req.lowport)
            .bind(&req.ccb_address)
            .bind(req.idle_time)
            .bind(&req.condor_debug)
            .bind(req.resubmit)
            .bind(req.until)
            .bind(req.resubmits)
            .bind(&req.rsl)
            .bind(GlideinState::New.as_str())
            .bind(input.created)
            .bind(&input.subject)
            .bind(&input.local_username)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO glidein_history (glidein_id, state, time) VALUES (?1, ?2, ?3)")
            .bind(row.id)
            .bind(GlideinState::New.as_str())
            .bind(input.created)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        into_glidein(row)
    }

    /// Find a glidein by its ID.
    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<Glidein>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM glideins WHERE id = ?1");
        sqlx::query_as::<_, GlideinRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(into_glidein)
            .transpose()
    }

    /// List glideins ordered by ID. `None` lists every user's glideins.
    pub async fn list(pool: &DbPool, user: Option<&str>) -> Result<Vec<Glidein>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM glideins
             WHERE ?1 IS NULL OR local_username = ?1
             ORDER BY id"
        );
        sqlx::query_as::<_, GlideinRow>(&query)
            .bind(user)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(into_glidein)
            .collect()
    }

    /// IDs of all glideins, used for state recovery at startup.
    pub async fn list_ids(pool: &DbPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM glideins ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// IDs of glideins currently in any of `states`.
    pub async fn list_ids_in_states(
        pool: &DbPool,
        states: &[GlideinState],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; states.len()].join(", ");
        let query = format!("SELECT id FROM glideins WHERE state IN ({placeholders}) ORDER BY id");
        let mut q = sqlx::query_scalar::<_, DbId>(&query);
        for state in states {
            q = q.bind(state.as_str());
        }
        q.fetch_all(pool).await
    }

    /// Record a state change and append it to the glidein's history.
    /// Returns `true` if the glidein exists.
    pub async fn update_state(
        pool: &DbPool,
        id: DbId,
        state: GlideinState,
        short_message: &str,
        long_message: Option<&str>,
        time: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE glideins
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
            tracing::debug!(glidein_id = id, %state, "State change for missing glidein");
            return Ok(false);
        }

        sqlx::query("INSERT INTO glidein_history (glidein_id, state, time) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(state.as_str())
            .bind(time)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// State changes of a glidein in the order they happened.
    pub async fn history(
        pool: &DbPool,
        id: DbId,
    ) -> Result<Vec<GlideinHistoryEntry>, sqlx::Error> {
        sqlx::query_as::<_, HistoryRow>(
            "SELECT glidein_id AS id, state, time FROM glidein_history
             WHERE glidein_id = ?1
             ORDER BY id",
        )
        .bind(id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.into_entry().map_err(decode_error))
        .collect()
    }

    /// Count one more submission of the glidein job.
    pub async fn increment_submits(pool: &DbPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE glideins SET submits = submits + 1 WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete a glidein by ID. The history is kept.
    pub async fn delete(pool: &DbPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM glideins WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        tracing::debug!(glidein_id = id, deleted = result.rows_affected(), "Deleted glidein row");
        Ok(result.rows_affected() > 0)
    }
}
