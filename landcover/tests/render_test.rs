use std::fs::{self, File};
use std::num::NonZeroUsize;
use std::path::Path;

use indoc::formatdoc;
use landcover::config::parse_config;
use landcover::env::FauxEnv;
use landcover::output::tile_path;
use landcover::render::render_tiles;
use landcover_core::raster::{NO_DATA_VALUE, NO_DATA_VALUE_16};
use landcover_tile_utils::TileCoord;
use pretty_assertions::assert_eq;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;
use tokio_util::sync::CancellationToken;

/// Writes a north-up float tile below `root`.
fn write_source(root: &Path, coord: TileCoord, size: u32, data: &[f32]) {
    let path = tile_path(root, coord);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
    encoder
        .write_image::<colortype::Gray32Float>(size, size, data)
        .unwrap();
}

fn read_output(path: &Path) -> (Vec<f32>, f32) {
    let mut decoder = Decoder::new(File::open(path).unwrap()).unwrap();
    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .unwrap()
        .trim_end_matches('\0')
        .parse()
        .unwrap();
    let DecodingResult::F32(data) = decoder.read_image().unwrap() else {
        panic!("expected f32 samples in {}", path.display());
    };
    (data, nodata)
}

/// A base coverage with a single root tile, and a detail coverage at level 1
/// whose no-data texels let the base show through.
fn config_yaml(base: &Path, detail: &Path, bits: u8) -> String {
    formatdoc! {"
        bits: {bits}
        tile_size: 2
        dictionary:
          - {{ name: forest, value: 12 }}
          - {{ name: water, value: 40 }}
        coverages:
          - id: base
            source: {{ tiff: {base} }}
            mappings: [{{ value: 5, class: forest }}]
          - id: detail
            source: {{ tiff: {detail} }}
            nodata: 0
            min_zoom: 1
            mappings: [{{ value: 80, class: water }}]
        ",
        base = base.display(),
        detail = detail.display(),
    }
}

#[tokio::test]
async fn test_render_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base");
    let detail = dir.path().join("detail");
    let out = dir.path().join("out");
    write_source(&base, TileCoord::new(0, 0, 0), 2, &[5.0; 4]);
    write_source(&detail, TileCoord::new(1, 0, 0), 2, &[80.0, 0.0, 80.0, 0.0]);

    let yaml = config_yaml(&base, &detail, 32);
    let mut config = parse_config(&yaml, &FauxEnv::default(), Path::new("lc.yaml")).unwrap();
    config.finalize().unwrap();
    let layer = config.resolve().unwrap();

    let tiles = [TileCoord::new(1, 0, 0), TileCoord::new(1, 1, 0), TileCoord::new(1, 2, 0)];
    let progress = render_tiles(
        &layer,
        &tiles,
        &out,
        NonZeroUsize::new(2).unwrap(),
        false,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(progress.written(), 2);
    assert_eq!(progress.empty(), 1);

    // detail wins where it has data, the base root tile fills the rest
    let (data, nodata) = read_output(&tile_path(&out, TileCoord::new(1, 0, 0)));
    assert_eq!(data, vec![40.0, 12.0, 40.0, 12.0]);
    assert_eq!(nodata, NO_DATA_VALUE);

    // no detail tile here, the base is magnified
    let (data, _) = read_output(&tile_path(&out, TileCoord::new(1, 1, 0)));
    assert_eq!(data, vec![12.0; 4]);

    // eastern hemisphere has no data in any coverage
    assert!(!tile_path(&out, TileCoord::new(1, 2, 0)).exists());
}

#[tokio::test]
async fn test_render_half_precision_empty_tile() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base");
    let detail = dir.path().join("detail");
    let out = dir.path().join("out");
    fs::create_dir_all(&base).unwrap();
    fs::create_dir_all(&detail).unwrap();

    let yaml = config_yaml(&base, &detail, 16);
    let mut config = parse_config(&yaml, &FauxEnv::default(), Path::new("lc.yaml")).unwrap();
    config.finalize().unwrap();
    let layer = config.resolve().unwrap();

    let coord = TileCoord::new(2, 5, 1);
    render_tiles(
        &layer,
        &[coord],
        &out,
        NonZeroUsize::new(1).unwrap(),
        true,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let (data, nodata) = read_output(&tile_path(&out, coord));
    assert_eq!(nodata, NO_DATA_VALUE_16);
    assert_eq!(data, vec![NO_DATA_VALUE_16; 4]);
}
