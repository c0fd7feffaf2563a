//! Per-pixel priority compositing of a coverage stack into one output tile.

use landcover_tile_utils::TileKey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::Cancelled;
use crate::binding::{CoverageBinding, resolve};
use crate::raster::{OutputConfig, OutputRaster};
use crate::stack::{CoverageStack, StackEntry};

/// Per-tile state of one coverage.
enum Slot {
    /// Not needed by any pixel so far
    Pending,
    Bound(CoverageBinding),
    Absent,
}

/// Turns a sampled raw texel into an integer coverage code.
///
/// Values below `1.0` were stored normalized as `code / 255`, everything else is a literal
/// code. Non-finite values carry no code.
#[must_use]
pub fn decode_raw(raw: f32) -> Option<i64> {
    if !raw.is_finite() {
        return None;
    }
    let raw = f64::from(raw);
    let code = if raw < 1.0 {
        (raw * 255.0).round()
    } else {
        raw.round()
    };
    Some(code as i64)
}

/// Composites `stack` into a raster for `key`.
///
/// Every output pixel takes the code of the highest-priority coverage that has a mapped,
/// non-no-data value there. Coverages are resolved the first time a pixel needs them and
/// at most once per call. Cancellation is checked before each provider call and between rows.
pub async fn composite(
    key: &TileKey,
    stack: &CoverageStack,
    config: &OutputConfig,
    cancel: &CancellationToken,
) -> Result<OutputRaster, Cancelled> {
    let mut output = OutputRaster::new(config);
    if stack.maps_nothing() {
        trace!("No coverage maps any code, tile {key} is empty");
        return Ok(output);
    }

    let size = output.size();
    let step = if size > 1 {
        1.0 / f64::from(size - 1)
    } else {
        0.0
    };
    let mut slots: Vec<Slot> = stack.entries().iter().map(|_| Slot::Pending).collect();

    for row in 0..size {
        if cancel.is_cancelled() {
            debug!("Composite of tile {key} was cancelled at row {row}");
            return Err(Cancelled);
        }
        let v = f64::from(row) * step;
        for col in 0..size {
            let u = f64::from(col) * step;
            for (entry, slot) in stack.entries().iter().zip(slots.iter_mut()).rev() {
                if let Some(code) = classify(key, entry, slot, u, v, cancel).await? {
                    output.set(col, row, code as f32);
                    break;
                }
            }
        }
    }
    Ok(output)
}

/// Dictionary code one coverage assigns to `(u, v)`, binding the coverage if needed.
async fn classify(
    key: &TileKey,
    entry: &StackEntry,
    slot: &mut Slot,
    u: f64,
    v: f64,
    cancel: &CancellationToken,
) -> Result<Option<i32>, Cancelled> {
    if matches!(slot, Slot::Pending) {
        *slot = if entry.table().is_empty() {
            Slot::Absent
        } else {
            match resolve(key, entry.coverage(), cancel).await? {
                Some(binding) => Slot::Bound(binding),
                None => Slot::Absent,
            }
        };
    }
    let Slot::Bound(binding) = slot else {
        return Ok(None);
    };
    let Some(raw) = binding.sample(u, v) else {
        return Ok(None);
    };
    if entry.coverage().is_no_data(raw) || binding.raster().nodata() == Some(raw) {
        return Ok(None);
    }
    Ok(decode_raw(raw).and_then(|code| entry.table().lookup(code)))
}
