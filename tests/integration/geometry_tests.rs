//! Geometry reference scenarios.

use wsi_mosaic::geometry::{zoom_factor, RequestTemplate, TileGrid};
use wsi_mosaic::store::RasterShape;

/// Reference scenario: 1000x1000 region at magnification 40 (zoom 1) with
/// 250px tiles is a 4x4 grid of 16 tiles, raster shape (1000, 1000, 3).
#[test]
fn test_reference_grid_1000px_at_native_magnification() {
    let zoom = zoom_factor(40.0);
    assert_eq!(zoom, 1);

    let grid = TileGrid::compute(1000, 1000, zoom, 250).unwrap();
    assert_eq!((grid.x_tiles, grid.y_tiles), (4, 4));
    assert_eq!(grid.total_tiles(), 16);

    let shape = RasterShape::from_grid(&grid);
    assert_eq!((shape.height, shape.width), (1000, 1000));
}

#[test]
fn test_no_under_coverage_across_magnifications() {
    for mag in [40.0, 20.0, 10.0, 5.0, 2.5, 1.0, 0.2] {
        let zoom = zoom_factor(mag);
        let grid = TileGrid::compute(3333, 777, zoom, 250).unwrap();
        assert!(grid.raster_width() >= 3333 / zoom, "mag {}", mag);
        assert!(grid.raster_height() >= 777 / zoom, "mag {}", mag);
    }
}

#[test]
fn test_requests_cover_grid_contiguously() {
    let grid = TileGrid::compute(1000, 1000, 1, 250).unwrap();
    let template = RequestTemplate::new("sample", 500, 250, &grid, 80);

    for x in 0..grid.x_tiles {
        for y in 0..grid.y_tiles {
            let req = template.tile_request(x, y);
            assert_eq!(req.src_xoff, 500 + x * 250);
            assert_eq!(req.src_yoff, 250 + y * 250);
            assert_eq!(req.tile_side, 250);
        }
    }
}
