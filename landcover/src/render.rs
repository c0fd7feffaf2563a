//! Batch rendering of tiles into a directory.

use std::fmt::{self, Display, Formatter};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use futures::stream::{self, StreamExt as _, TryStreamExt as _};
use landcover_core::layer::LandCoverLayer;
use landcover_tile_utils::{TileCoord, TileKey};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::LandCoverAppResult;
use crate::output::{tile_path, write_tiff};

const PROGRESS_REPORT_EVERY: u64 = 100;

/// Counts of rendered tiles, updated while rendering runs.
#[derive(Debug)]
pub struct RenderProgress {
    start_time: Instant,
    total: u64,
    written: AtomicU64,
    empty: AtomicU64,
}

impl RenderProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            start_time: Instant::now(),
            total: total as u64,
            written: AtomicU64::default(),
            empty: AtomicU64::default(),
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Tiles written to disk.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Tiles skipped because no pixel was classified.
    #[must_use]
    pub fn empty(&self) -> u64 {
        self.empty.load(Ordering::Relaxed)
    }
}

impl Display for RenderProgress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let elapsed = self.start_time.elapsed();
        let elapsed_s = elapsed.as_secs_f32();
        let written = self.written();
        let empty = self.empty();
        let done = written + empty;
        let percent = (done * 100).checked_div(self.total).unwrap_or(100);
        let speed = if elapsed_s > 0.0 {
            done as f32 / elapsed_s
        } else {
            0.0
        };
        write!(
            f,
            "[{elapsed:.1?}] {percent}% @ {speed:.1}/s | ✓ {written} □ {empty}"
        )?;
        if done == self.total {
            f.write_str(" | done")
        } else {
            write!(f, " | {} left", self.total - done)
        }
    }
}

/// Composites `tiles` and writes them below `output_dir` as `{z}/{x}/{y}.tif`.
///
/// All coordinates are validated against the layer's profile before anything is rendered.
/// Duplicates are rendered once. Tiles without a single classified pixel are only written
/// when `keep_empty` is set. Cancelling `cancel` stops outstanding composites; tiles
/// already written stay on disk.
pub async fn render_tiles(
    layer: &LandCoverLayer,
    tiles: &[TileCoord],
    output_dir: &Path,
    concurrency: NonZeroUsize,
    keep_empty: bool,
    cancel: &CancellationToken,
) -> LandCoverAppResult<RenderProgress> {
    let mut coords = tiles.to_vec();
    coords.sort_unstable();
    coords.dedup();
    let keys = coords
        .into_iter()
        .map(|coord| layer.tile_key(coord))
        .collect::<Result<Vec<TileKey>, _>>()?;

    let progress = RenderProgress::new(keys.len());
    info!(
        "Rendering {} land cover tiles to {}",
        progress.total(),
        output_dir.display()
    );

    let progress_ref = &progress;
    stream::iter(keys)
        .map(LandCoverAppResult::Ok)
        .try_for_each_concurrent(concurrency.get(), |key| async move {
            let raster = layer.create_image(&key, cancel).await?;
            let counter = if raster.is_all_no_data() && !keep_empty {
                debug!("Tile {key} has no classified pixels, skipping it");
                &progress_ref.empty
            } else {
                let path = tile_path(output_dir, key.coord());
                write_tiff(&path, &raster)?;
                debug!("Wrote tile {key} to {}", path.display());
                &progress_ref.written
            };
            let done = counter.fetch_add(1, Ordering::Relaxed);
            if done % PROGRESS_REPORT_EVERY == PROGRESS_REPORT_EVERY - 1 {
                info!("{progress_ref}");
            }
            Ok(())
        })
        .await?;

    info!("{progress}");
    Ok(progress)
}
