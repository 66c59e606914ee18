use super::*;
use crate::engine::api::CrossOrigin;
use crate::net::BoxFuture;
use std::sync::atomic::AtomicUsize;

struct SolidTiles {
    color: [u8; 4],
    hits: AtomicUsize,
}

impl TileSource for SolidTiles {
    fn fetch(&self, url: &str) -> BoxFuture<'static, CityPaperResult<Vec<u8>>> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let color = self.color;
        let fail = url.contains("fail");
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if fail {
                return Err(CityPaperError::http("HTTP 503"));
            }
            Ok(png_tile(color))
        })
    }
}

fn png_tile(color: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(256, 256, image::Rgba(color));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn library(color: [u8; 4]) -> (Arc<SolidTiles>, SlippyLibrary) {
    let source = Arc::new(SolidTiles {
        color,
        hits: AtomicUsize::new(0),
    });
    let lib = SlippyLibrary::new(
        source.clone(),
        Handle::current(),
        Arc::new(usvg::fontdb::Database::new()),
    );
    (source, lib)
}

fn quiet_options() -> MapOptions {
    MapOptions {
        center: Location::new(35.6762, 139.6503).unwrap(),
        zoom: 13.0,
        zoom_control: false,
        attribution_control: false,
        animate: false,
    }
}

fn layer(template: &str, cross_origin: Option<CrossOrigin>) -> TileLayerOptions {
    TileLayerOptions {
        url_template: template.to_owned(),
        attribution: "test".to_owned(),
        cross_origin,
        retina: false,
    }
}

const TEMPLATE: &str = "https://{s}.tiles.test/{z}/{x}/{y}.png";

async fn settle(map: &dyn TileEngine) {
    for _ in 0..500 {
        if map.pending_tiles() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("tiles never settled");
}

#[tokio::test]
async fn create_map_rejects_unusable_surfaces() {
    let (_, lib) = library([0, 0, 0, 255]);

    let empty = SurfaceHandle::new(Size::ZERO);
    assert!(matches!(
        lib.create_map(&empty, quiet_options()),
        Err(CityPaperError::AttachFailed(_))
    ));

    let gone = SurfaceHandle::new(Size::new(340.0, 718.0));
    gone.detach();
    assert!(matches!(
        lib.create_map(&gone, quiet_options()),
        Err(CityPaperError::AttachFailed(_))
    ));
}

#[tokio::test]
async fn loaded_tiles_cover_the_raster_at_pixel_ratio() {
    let (source, lib) = library([200, 10, 30, 255]);
    let surface = SurfaceHandle::new(Size::new(340.0, 718.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();
    map.add_tile_layer(layer(TEMPLATE, Some(CrossOrigin::Anonymous)))
        .unwrap();
    assert!(map.pending_tiles() > 0);
    settle(map.as_ref()).await;
    assert!(source.hits.load(Ordering::SeqCst) > 0);

    let pixmap = map.rasterize(3.0).unwrap();
    assert_eq!((pixmap.width(), pixmap.height()), (1020, 2154));
    let mid = ((pixmap.height() / 2 * pixmap.width() + pixmap.width() / 2) * 4) as usize;
    assert_eq!(&pixmap.data()[mid..mid + 4], &[200, 10, 30, 255]);
}

#[tokio::test]
async fn layer_without_cross_origin_taints_raster() {
    let (_, lib) = library([1, 2, 3, 255]);
    let surface = SurfaceHandle::new(Size::new(100.0, 100.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();
    map.add_tile_layer(layer(TEMPLATE, None)).unwrap();
    settle(map.as_ref()).await;
    let err = map.rasterize(1.0).unwrap_err();
    assert!(err.to_string().contains("tainted"));
}

#[tokio::test]
async fn removing_a_layer_drops_it_and_its_tiles() {
    let (_, lib) = library([1, 2, 3, 255]);
    let surface = SurfaceHandle::new(Size::new(100.0, 100.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();
    let a = map
        .add_tile_layer(layer(TEMPLATE, Some(CrossOrigin::Anonymous)))
        .unwrap();
    assert_eq!(map.layer_count(), 1);
    assert!(map.remove_layer(a));
    assert!(!map.remove_layer(a));
    assert_eq!(map.layer_count(), 0);
    assert_eq!(map.pending_tiles(), 0);

    // Results of fetches started for the removed layer must not resurrect it.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let pixmap = map.rasterize(1.0).unwrap();
    assert!(pixmap.data().iter().all(|b| *b == 0));
}

#[tokio::test]
async fn failed_tiles_are_not_pending() {
    let (_, lib) = library([1, 2, 3, 255]);
    let surface = SurfaceHandle::new(Size::new(100.0, 100.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();
    map.add_tile_layer(layer(
        "https://tiles.test/fail/{z}/{x}/{y}.png",
        Some(CrossOrigin::Anonymous),
    ))
    .unwrap();
    settle(map.as_ref()).await;
    assert!(map.rasterize(1.0).is_ok());
}

#[tokio::test]
async fn failed_tiles_are_retried_on_the_next_view() {
    let (source, lib) = library([1, 2, 3, 255]);
    let surface = SurfaceHandle::new(Size::new(100.0, 100.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();
    map.add_tile_layer(layer(
        "https://tiles.test/fail/{z}/{x}/{y}.png",
        Some(CrossOrigin::Anonymous),
    ))
    .unwrap();
    settle(map.as_ref()).await;
    let first = source.hits.load(Ordering::SeqCst);
    assert!(first > 0);

    map.set_view(map.center(), map.zoom());
    assert_eq!(map.pending_tiles(), first);
    settle(map.as_ref()).await;
    assert_eq!(source.hits.load(Ordering::SeqCst), 2 * first);
}

#[tokio::test]
async fn bad_template_is_rejected() {
    let (_, lib) = library([1, 2, 3, 255]);
    let surface = SurfaceHandle::new(Size::new(100.0, 100.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();
    assert!(matches!(
        map.add_tile_layer(layer("https://tiles.test/{z}.png", None)),
        Err(CityPaperError::Validation(_))
    ));
    assert_eq!(map.layer_count(), 0);
}

#[tokio::test]
async fn click_handler_is_replaced_not_stacked() {
    let (_, lib) = library([1, 2, 3, 255]);
    let surface = SurfaceHandle::new(Size::new(340.0, 718.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let f = first.clone();
    map.on_click(Box::new(move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    }));
    let s = second.clone();
    map.on_click(Box::new(move |_| {
        s.fetch_add(1, Ordering::SeqCst);
    }));

    let picked = map.click(Point::new(170.0, 359.0)).unwrap();
    assert!(picked.approx_eq(map.center(), 1e-9));
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);

    let east = map.click(Point::new(300.0, 359.0)).unwrap();
    assert!(east.lng() > map.center().lng());
}

#[tokio::test]
async fn size_is_cached_until_invalidated() {
    let (_, lib) = library([1, 2, 3, 255]);
    let surface = SurfaceHandle::new(Size::new(340.0, 718.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();
    surface.resize(Size::new(340.0, 604.0));
    assert_eq!(map.size(), Size::new(340.0, 718.0));
    map.invalidate_size();
    assert_eq!(map.size(), Size::new(340.0, 604.0));
}

#[tokio::test]
async fn destroy_releases_everything() {
    let (_, lib) = library([1, 2, 3, 255]);
    let surface = SurfaceHandle::new(Size::new(100.0, 100.0));
    let mut map = lib.create_map(&surface, quiet_options()).unwrap();
    map.add_tile_layer(layer(TEMPLATE, Some(CrossOrigin::Anonymous)))
        .unwrap();
    map.destroy();
    assert_eq!(map.layer_count(), 0);
    assert!(map.click(Point::new(1.0, 1.0)).is_none());
    assert!(matches!(
        map.rasterize(1.0),
        Err(CityPaperError::EngineUnavailable(_))
    ));
    map.set_view(Location::new(0.0, 0.0).unwrap(), 12.0);
    assert_eq!(map.zoom(), 13.0);
}
