//! Integration tests for the site and glidein repositories.
//!
//! Exercises the repository layer against a real SQLite database:
//! - Create and reload sites and glideins
//! - Owner filtering in list queries
//! - State updates, submit counters and state-filtered ID queries
//! - Cascade delete from sites to glideins
//! - State history, which survives deletion

use chrono::{Duration, Utc};
use corral_core::glidein::{CreateGlidein, NewGlidein};
use corral_core::site::{EnvironmentVariable, ExecutionService, NewSite};
use corral_core::state::{GlideinState, ServiceType, SiteState};
use corral_db::repositories::{GlideinRepo, SiteRepo};
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn service(service_type: ServiceType) -> ExecutionService {
    ExecutionService {
        service_type,
        service_contact: "gatekeeper.example.edu/jobmanager-pbs".to_string(),
        project: Some("TG-123".to_string()),
        queue: None,
    }
}

fn new_site(name: &str, user: &str) -> NewSite {
    NewSite {
        name: name.to_string(),
        install_path: "/home/glidein".to_string(),
        local_path: "/scratch".to_string(),
        staging_service: service(ServiceType::Gt2),
        glidein_service: service(ServiceType::Gt4),
        condor_version: Some("7.2.4".to_string()),
        condor_package: None,
        environment: vec![EnvironmentVariable {
            variable: "GLOBUS_TCP_PORT_RANGE".to_string(),
            value: "40000,41000".to_string(),
        }],
        subject: format!("/CN={user}"),
        local_username: user.to_string(),
        created: Utc::now(),
    }
}

fn new_glidein(site_id: i64, site_name: &str, user: &str) -> NewGlidein {
    NewGlidein {
        request: CreateGlidein::new(site_id, "cm.example.edu"),
        site_name: site_name.to_string(),
        subject: format!("/CN={user}"),
        local_username: user.to_string(),
        created: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_site_starts_new(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();

    assert_eq!(site.state, SiteState::New);
    assert_eq!(site.short_message, "Created");
    assert_eq!(site.staging_service.service_type, ServiceType::Gt2);
    assert_eq!(site.glidein_service.service_type, ServiceType::Gt4);
    assert_eq!(site.staging_service.project.as_deref(), Some("TG-123"));
    assert_eq!(site.environment.len(), 1);
    assert_eq!(site.created, site.last_update);
}

#[sqlx::test(migrations = "./migrations")]
async fn find_missing_site_returns_none(pool: SqlitePool) {
    assert!(SiteRepo::find_by_id(&pool, 404).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn list_sites_filters_by_user(pool: SqlitePool) {
    SiteRepo::create(&pool, &new_site("a", "alice")).await.unwrap();
    SiteRepo::create(&pool, &new_site("b", "bob")).await.unwrap();
    SiteRepo::create(&pool, &new_site("c", "alice")).await.unwrap();

    let alice = SiteRepo::list(&pool, Some("alice")).await.unwrap();
    assert_eq!(alice.len(), 2);
    assert!(alice.iter().all(|s| s.local_username == "alice"));

    let all = SiteRepo::list(&pool, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(SiteRepo::list_ids(&pool).await.unwrap().len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_site_state_persists_messages(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    let later = Utc::now() + Duration::seconds(5);

    let updated = SiteRepo::update_state(
        &pool,
        site.id,
        SiteState::Failed,
        "Install job failed",
        Some("status: missing condor"),
        later,
    )
    .await
    .unwrap();
    assert!(updated);

    let reloaded = SiteRepo::find_by_id(&pool, site.id).await.unwrap().unwrap();
    assert_eq!(reloaded.state, SiteState::Failed);
    assert_eq!(reloaded.long_message.as_deref(), Some("status: missing condor"));
    assert_eq!(reloaded.last_update, later);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_missing_site_returns_false(pool: SqlitePool) {
    let updated = SiteRepo::update_state(&pool, 9, SiteState::Ready, "Installed", None, Utc::now())
        .await
        .unwrap();
    assert!(!updated);
}

// ---------------------------------------------------------------------------
// Glideins
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_glidein_links_site(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    let glidein = GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "juve"))
        .await
        .unwrap();

    assert_eq!(glidein.state, GlideinState::New);
    assert_eq!(glidein.site_name, "hpcc");
    assert_eq!(glidein.submits, 0);
    assert_eq!(glidein.wall_time, 60);

    assert!(SiteRepo::has_glideins(&pool, site.id).await.unwrap());
    assert_eq!(
        SiteRepo::glidein_ids(&pool, site.id).await.unwrap(),
        vec![glidein.id]
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn glidein_for_missing_site_violates_foreign_key(pool: SqlitePool) {
    let result = GlideinRepo::create(&pool, &new_glidein(77, "ghost", "juve")).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "./migrations")]
async fn increment_submits_counts_up(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    let g = GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "juve"))
        .await
        .unwrap();

    GlideinRepo::increment_submits(&pool, g.id).await.unwrap();
    GlideinRepo::increment_submits(&pool, g.id).await.unwrap();

    let reloaded = GlideinRepo::find_by_id(&pool, g.id).await.unwrap().unwrap();
    assert_eq!(reloaded.submits, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn list_ids_in_states_selects_matching_glideins(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let g = GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "juve"))
            .await
            .unwrap();
        ids.push(g.id);
    }
    let now = Utc::now();
    GlideinRepo::update_state(&pool, ids[0], GlideinState::Finished, "Glidein finished", None, now)
        .await
        .unwrap();
    GlideinRepo::update_state(&pool, ids[2], GlideinState::Failed, "Site failed", None, now)
        .await
        .unwrap();

    let done = GlideinRepo::list_ids_in_states(&pool, &[GlideinState::Finished, GlideinState::Failed])
        .await
        .unwrap();
    assert_eq!(done, vec![ids[0], ids[2]]);
    assert!(GlideinRepo::list_ids_in_states(&pool, &[]).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn list_glideins_filters_by_user(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "alice")).await.unwrap();
    GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "alice"))
        .await
        .unwrap();
    GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "bob"))
        .await
        .unwrap();

    assert_eq!(GlideinRepo::list(&pool, Some("bob")).await.unwrap().len(), 1);
    assert_eq!(GlideinRepo::list(&pool, None).await.unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn deleting_site_cascades_to_glideins(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    let g = GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "juve"))
        .await
        .unwrap();

    assert!(SiteRepo::delete(&pool, site.id).await.unwrap());
    assert!(GlideinRepo::find_by_id(&pool, g.id).await.unwrap().is_none());
    assert!(!SiteRepo::delete(&pool, site.id).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_last_glidein_clears_has_glideins(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    let g = GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "juve"))
        .await
        .unwrap();

    assert!(GlideinRepo::delete(&pool, g.id).await.unwrap());
    assert!(!SiteRepo::has_glideins(&pool, site.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn site_history_records_every_state(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    let staged = Utc::now() + Duration::seconds(1);
    let ready = Utc::now() + Duration::seconds(2);
    SiteRepo::update_state(&pool, site.id, SiteState::Staging, "Staging executables", None, staged)
        .await
        .unwrap();
    SiteRepo::update_state(&pool, site.id, SiteState::Ready, "Installed", None, ready)
        .await
        .unwrap();

    let history = SiteRepo::history(&pool, site.id).await.unwrap();
    let states: Vec<_> = history.iter().map(|e| e.state).collect();
    assert_eq!(states, vec![SiteState::New, SiteState::Staging, SiteState::Ready]);
    assert!(history.iter().all(|e| e.id == site.id));
    assert_eq!(history[0].time, site.created);
    assert_eq!(history[2].time, ready);
}

#[sqlx::test(migrations = "./migrations")]
async fn site_history_outlives_site(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    SiteRepo::update_state(&pool, site.id, SiteState::Deleted, "Site deleted", None, Utc::now())
        .await
        .unwrap();
    SiteRepo::delete(&pool, site.id).await.unwrap();

    let states: Vec<_> = SiteRepo::history(&pool, site.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.state)
        .collect();
    assert_eq!(states, vec![SiteState::New, SiteState::Deleted]);
}

#[sqlx::test(migrations = "./migrations")]
async fn missing_resources_have_no_history(pool: SqlitePool) {
    SiteRepo::update_state(&pool, 9, SiteState::Ready, "Installed", None, Utc::now())
        .await
        .unwrap();
    assert!(SiteRepo::history(&pool, 9).await.unwrap().is_empty());
    assert!(GlideinRepo::history(&pool, 9).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn glidein_history_is_per_glidein(pool: SqlitePool) {
    let site = SiteRepo::create(&pool, &new_site("hpcc", "juve")).await.unwrap();
    let a = GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "juve"))
        .await
        .unwrap();
    let b = GlideinRepo::create(&pool, &new_glidein(site.id, &site.name, "juve"))
        .await
        .unwrap();
    let now = Utc::now();
    for state in [GlideinState::Submitted, GlideinState::Queued, GlideinState::Running] {
        GlideinRepo::update_state(&pool, a.id, state, "", None, now).await.unwrap();
    }

    let states: Vec<_> = GlideinRepo::history(&pool, a.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.state)
        .collect();
    assert_eq!(
        states,
        vec![
            GlideinState::New,
            GlideinState::Submitted,
            GlideinState::Queued,
            GlideinState::Running
        ]
    );
    assert_eq!(GlideinRepo::history(&pool, b.id).await.unwrap().len(), 1);
}
