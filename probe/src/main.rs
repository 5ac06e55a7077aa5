mod config;

use std::process::ExitCode;

use chrono::Utc;
use plotmap_client::{
    ChunkCache, HttpChunkSource, MapEvents, MapOptions, ScreenClick, SessionToken, ViewportState,
    plan_frame,
};
use plotmap_shared::{Cell, Entity, EntityKind};
use tracing_subscriber::EnvFilter;

/// Logs what a rendering shell would react to.
struct ProbeEvents;

impl MapEvents for ProbeEvents {
    fn loading_changed(&self, loading: bool) {
        tracing::debug!(loading, "loading state changed");
    }

    fn entity_clicked(&self, cell: Cell, entity: &Entity) {
        match serde_json::to_string(entity) {
            Ok(json) => tracing::info!(%cell, kind = entity.kind().as_str(), %json, "entity clicked"),
            Err(e) => tracing::warn!(%cell, error = %e, "failed to serialize clicked entity"),
        }
    }

    fn empty_cell_clicked(&self, cell: Cell) {
        tracing::info!(%cell, "empty cell clicked");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let Some(init_data) = config::init_data() else {
        tracing::error!("PLOTMAP_INIT_DATA is required to run plotmap-probe");
        return ExitCode::FAILURE;
    };

    let options = if config::mobile() {
        MapOptions::mobile()
    } else {
        MapOptions::desktop()
    };
    let (width, height) = config::canvas_size();
    let mut view = ViewportState::new(width, height, &options);
    let center = config::center();
    if let Err(e) = view.center_on(center) {
        tracing::error!(error = %e, "invalid probe viewport");
        return ExitCode::FAILURE;
    }

    let client = match reqwest::Client::builder()
        .timeout(config::http_timeout())
        .connect_timeout(config::connect_timeout())
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let url = config::api_url();
    let planet_id = config::planet_id();
    let source = HttpChunkSource::new(client, url.clone(), SessionToken::new(init_data));
    let cache = ChunkCache::new(source, ProbeEvents, options, planet_id);

    let keys = match cache.visible_chunks(&view) {
        Ok(keys) => keys,
        Err(e) => {
            tracing::error!(error = %e, "failed to compute visible chunks");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        %url,
        planet_id,
        %center,
        scale = view.scale,
        chunks = keys.len(),
        "reconciling probe viewport"
    );

    let started = Utc::now();
    let pass = cache.reconcile(&keys);
    let requested = pass.requested().len();
    pass.await;
    let elapsed_ms = (Utc::now() - started).num_milliseconds();

    let failed = keys
        .iter()
        .filter(|key| cache.chunk_state(**key).is_none())
        .count();
    tracing::info!(
        requested,
        loaded = cache.loaded_chunk_count(),
        failed,
        points = cache.point_count(),
        elapsed_ms,
        "reconcile finished"
    );

    match plan_frame(&cache, &view) {
        Ok(plan) => {
            let count = |kind: EntityKind| plan.occupied().filter(|c| c.kind == Some(kind)).count();
            tracing::info!(
                cells = plan.cells.len(),
                users = count(EntityKind::User),
                mines = count(EntityKind::Mine),
                locks = count(EntityKind::Lock),
                "on-screen summary"
            );
        }
        Err(e) => tracing::warn!(error = %e, "failed to plan frame"),
    }

    let mid = view.center();
    match cache.handle_screen_click(mid.x, mid.y, &view) {
        Ok(ScreenClick::NoCell) => tracing::info!("canvas centre hits no cell"),
        Ok(ScreenClick::Cell { .. }) => {}
        Err(e) => tracing::warn!(error = %e, "centre click failed"),
    }

    if failed > 0 {
        tracing::error!(failed, "some visible chunks failed to load");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
