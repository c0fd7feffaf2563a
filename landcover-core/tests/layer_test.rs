use std::sync::Arc;

use async_trait::async_trait;
use landcover_core::Cancelled;
use landcover_core::cache::CompositeCache;
use landcover_core::codes::ValueMapping;
use landcover_core::coverage::Coverage;
use landcover_core::dictionary::{LandCoverClass, LandCoverDictionary};
use landcover_core::layer::LandCoverLayer;
use landcover_core::provider::{MemoryProvider, ProviderError, ProviderResult, RasterProvider};
use landcover_core::raster::{NO_DATA_VALUE, OutputConfig, OutputRaster, Precision, SourceRaster};
use landcover_tile_utils::{Profile, TileCoord, TileKey};
use rstest::rstest;
use tokio_util::sync::CancellationToken;

/// Shares a memory provider with the test so fetches can be counted after the layer owns it.
#[derive(Debug, Clone)]
struct Shared(Arc<MemoryProvider>);

#[async_trait]
impl RasterProvider for Shared {
    fn get_id(&self) -> &str {
        self.0.get_id()
    }

    async fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> ProviderResult<Option<SourceRaster>> {
        self.0.fetch(key, cancel).await
    }
}

/// Fails for one tile and serves the rest from memory.
#[derive(Debug)]
struct FailingAt(TileCoord, MemoryProvider);

#[async_trait]
impl RasterProvider for FailingAt {
    fn get_id(&self) -> &str {
        self.1.get_id()
    }

    async fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> ProviderResult<Option<SourceRaster>> {
        if key.coord() == self.0 {
            return Err(ProviderError::OtherError("storage unavailable".into()));
        }
        self.1.fetch(key, cancel).await
    }
}

/// Cancels the request while serving it.
#[derive(Debug)]
struct CancelOnFetch(MemoryProvider);

#[async_trait]
impl RasterProvider for CancelOnFetch {
    fn get_id(&self) -> &str {
        self.0.get_id()
    }

    async fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> ProviderResult<Option<SourceRaster>> {
        cancel.cancel();
        self.0.fetch(key, &CancellationToken::new()).await
    }
}

fn key(z: u8, x: u32, y: u32) -> TileKey {
    TileKey::new(Profile::GLOBAL_GEODETIC, TileCoord::new(z, x, y)).unwrap()
}

fn dictionary() -> Arc<LandCoverDictionary> {
    Arc::new(LandCoverDictionary::new(vec![
        LandCoverClass::new("forest", 12),
        LandCoverClass::new("grass", 7),
        LandCoverClass::new("urban", 99),
        LandCoverClass::new("a", 10),
        LandCoverClass::new("b", 20),
        LandCoverClass::new("c", 30),
        LandCoverClass::new("d", 40),
    ]))
}

fn filled(key: &TileKey, value: f32) -> MemoryProvider {
    MemoryProvider::new("mem").with_tile(
        key.coord(),
        SourceRaster::filled(8, 8, value, key.extent()).unwrap(),
    )
}

fn config(precision: Precision) -> OutputConfig {
    OutputConfig {
        precision,
        tile_size: 16,
    }
}

fn attached(coverages: Vec<Coverage>) -> LandCoverLayer {
    let mut layer = LandCoverLayer::open(
        Profile::GLOBAL_GEODETIC,
        config(Precision::Single),
        coverages,
    );
    layer.attach_dictionary(dictionary());
    layer
}

async fn render(layer: &LandCoverLayer, key: &TileKey) -> Arc<OutputRaster> {
    layer
        .create_image(key, &CancellationToken::new())
        .await
        .unwrap()
}

fn assert_uniform(image: &OutputRaster, expected: f32) {
    assert!(
        image.data().iter().all(|&v| v == expected),
        "expected every texel to be {expected}, got {:?}",
        &image.data()[..4]
    );
}

#[rstest]
#[case(Precision::Single, NO_DATA_VALUE)]
#[case(Precision::Half, -32768.0)]
#[tokio::test]
async fn without_dictionary_everything_is_no_data(
    #[case] precision: Precision,
    #[case] sentinel: f32,
) {
    let k = key(2, 1, 1);
    let coverage = Coverage::new("esa", Box::new(filled(&k, 5.0)))
        .with_mappings(vec![ValueMapping::new(5, "forest")]);
    let layer = LandCoverLayer::open(Profile::GLOBAL_GEODETIC, config(precision), vec![coverage]);

    let image = render(&layer, &k).await;
    assert_eq!(image.size(), 16);
    assert_uniform(&image, sentinel);
}

#[rstest]
#[case::literal(5.0)]
#[case::normalized(5.0 / 255.0)]
#[tokio::test]
async fn single_coverage_translates_codes(#[case] raw: f32) {
    let k = key(2, 1, 1);
    let layer = attached(vec![
        Coverage::new("esa", Box::new(filled(&k, raw)))
            .with_mappings(vec![ValueMapping::new(5, "forest")]),
    ]);
    assert_uniform(&*render(&layer, &k).await, 12.0);
}

#[tokio::test]
async fn raw_codes_beyond_u16_are_translated() {
    let k = key(1, 1, 0);
    let layer = attached(vec![
        Coverage::new("wide", Box::new(filled(&k, 70_000.0)))
            .with_mappings(vec![ValueMapping::new(70_000, "forest")]),
    ]);
    assert_uniform(&*render(&layer, &k).await, 12.0);
}

#[tokio::test]
async fn highest_priority_coverage_wins() {
    let k = key(3, 4, 2);
    let layer = attached(vec![
        Coverage::new("low", Box::new(filled(&k, 1.0)))
            .with_mappings(vec![ValueMapping::new(1, "urban")]),
        Coverage::new("high", Box::new(filled(&k, 1.0)))
            .with_mappings(vec![ValueMapping::new(1, "grass")]),
    ]);
    assert_uniform(&*render(&layer, &k).await, 7.0);
}

#[rstest]
#[case::unmapped_code(3.0, -f32::MAX)]
#[case::coverage_nodata(-f32::MAX, -f32::MAX)]
#[case::custom_nodata(250.0, 250.0)]
#[case::out_of_table_range(300.0, -f32::MAX)]
#[tokio::test]
async fn lower_priority_fills_gaps(#[case] high_raw: f32, #[case] high_nodata: f32) {
    let k = key(3, 4, 2);
    let layer = attached(vec![
        Coverage::new("low", Box::new(filled(&k, 1.0)))
            .with_mappings(vec![ValueMapping::new(1, "urban")]),
        Coverage::new("high", Box::new(filled(&k, high_raw)))
            .with_nodata(high_nodata)
            .with_mappings(vec![
                ValueMapping::new(1, "grass"),
                ValueMapping::new(250, "grass"),
            ]),
    ]);
    assert_uniform(&*render(&layer, &k).await, 99.0);
}

#[tokio::test]
async fn out_of_range_codes_without_fallback_are_no_data() {
    let k = key(1, 0, 0);
    let layer = attached(vec![
        Coverage::new("esa", Box::new(filled(&k, 300.0)))
            .with_mappings(vec![ValueMapping::new(5, "forest")]),
    ]);
    let image = render(&layer, &k).await;
    assert!(image.is_all_no_data());
}

#[rstest]
// north-east quarter of the root tile
#[case(key(2, 3, 0), 40.0)]
#[case(key(4, 14, 2), 40.0)]
// south-west quarter
#[case(key(2, 0, 3), 10.0)]
#[case(key(5, 1, 28), 10.0)]
#[tokio::test]
async fn finer_tiles_are_magnified_from_ancestors(#[case] requested: TileKey, #[case] expected: f32) {
    let root = key(0, 0, 0);
    // south-up rows: SW=1, SE=2, NW=3, NE=4
    let raster = SourceRaster::new(2, 2, vec![1.0, 2.0, 3.0, 4.0], root.extent()).unwrap();
    let provider = MemoryProvider::new("coarse").with_tile(root.coord(), raster);
    let layer = attached(vec![Coverage::new("coarse", Box::new(provider)).with_mappings(vec![
        ValueMapping::new(1, "a"),
        ValueMapping::new(2, "b"),
        ValueMapping::new(3, "c"),
        ValueMapping::new(4, "d"),
    ])]);
    assert_uniform(&*render(&layer, &requested).await, expected);
}

#[tokio::test]
async fn provider_failure_falls_back_to_ancestor() {
    let parent = key(1, 1, 0);
    let child = key(2, 3, 0);
    let provider = FailingAt(child.coord(), filled(&parent, 5.0));
    let layer = attached(vec![
        Coverage::new("flaky", Box::new(provider))
            .with_mappings(vec![ValueMapping::new(5, "forest")]),
    ]);
    assert_uniform(&*render(&layer, &child).await, 12.0);
}

#[tokio::test]
async fn composites_are_idempotent() {
    let k = key(3, 2, 2);
    let raster = SourceRaster::new(3, 1, vec![1.0, 5.0, 2.0], k.extent()).unwrap();
    let layer = attached(vec![
        Coverage::new("low", Box::new(filled(&k, 1.0)))
            .with_mappings(vec![ValueMapping::new(1, "urban")]),
        Coverage::new("high", Box::new(MemoryProvider::new("high").with_tile(k.coord(), raster)))
            .with_mappings(vec![ValueMapping::new(5, "forest")]),
    ]);

    let first = render(&layer, &k).await;
    let second = render(&layer, &k).await;
    let bits = |image: &OutputRaster| image.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
    assert!(first.data().contains(&12.0));
    assert!(first.data().contains(&99.0));
}

#[tokio::test]
async fn coverages_are_resolved_lazily_and_once() {
    let k = key(2, 2, 1);
    let low = Arc::new(filled(&k, 1.0));
    let high = Arc::new(filled(&k, 5.0));
    let layer = attached(vec![
        Coverage::new("low", Box::new(Shared(Arc::clone(&low))))
            .with_mappings(vec![ValueMapping::new(1, "urban")]),
        Coverage::new("high", Box::new(Shared(Arc::clone(&high))))
            .with_mappings(vec![ValueMapping::new(5, "forest")]),
    ]);

    assert_uniform(&*render(&layer, &k).await, 12.0);
    assert_eq!(high.fetch_count(), 1);
    // every pixel was answered by the higher coverage
    assert_eq!(low.fetch_count(), 0);
}

#[tokio::test]
async fn cache_serves_repeated_requests() {
    let k = key(2, 2, 1);
    let provider = Arc::new(filled(&k, 5.0));
    let layer = attached(vec![
        Coverage::new("esa", Box::new(Shared(Arc::clone(&provider))))
            .with_mappings(vec![ValueMapping::new(5, "forest")]),
    ])
    .with_cache(CompositeCache::new(1 << 20, None));

    let first = render(&layer, &k).await;
    let second = render(&layer, &k).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test]
async fn cancellation_aborts_composite() {
    let k = key(2, 2, 1);
    let cache = CompositeCache::new(1 << 20, None);
    let layer = attached(vec![
        Coverage::new("esa", Box::new(CancelOnFetch(filled(&k, 5.0))))
            .with_mappings(vec![ValueMapping::new(5, "forest")]),
    ])
    .with_cache(cache.clone());

    let cancel = CancellationToken::new();
    assert_eq!(layer.create_image(&k, &cancel).await, Err(Cancelled));
    cache.sync().await;
    assert_eq!(cache.entry_count(), 0);

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let res = layer.create_image(&k, &cancelled).await;
    assert_eq!(res, Err(Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_composites_share_the_layer() {
    let root = key(0, 0, 0);
    let layer = Arc::new(attached(vec![
        Coverage::new("esa", Box::new(filled(&root, 5.0)))
            .with_mappings(vec![ValueMapping::new(5, "forest")]),
    ]));

    let handles: Vec<_> = (0..8)
        .map(|x| {
            let layer = Arc::clone(&layer);
            tokio::spawn(async move {
                let k = key(3, x, 3);
                layer.create_image(&k, &CancellationToken::new()).await
            })
        })
        .collect();
    for handle in handles {
        let image = handle.await.unwrap().unwrap();
        assert_uniform(&image, 12.0);
    }
}
