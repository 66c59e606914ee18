use super::*;
use crate::engine::mock::MockLibrary;
use crate::foundation::core::AspectRatioId;
use crate::scene::model::StyleId;
use std::sync::atomic::AtomicUsize;

fn tokyo() -> Location {
    Location::new(35.6762, 139.6503).unwrap()
}

fn fonts() -> Arc<usvg::fontdb::Database> {
    Arc::new(usvg::fontdb::Database::new())
}

async fn mounted(lib: &Arc<MockLibrary>) -> RenderSurface {
    let handle = SurfaceHandle::new(Size::new(340.0, 718.0));
    RenderSurface::mount(handle, lib.clone(), SurfaceOpts::default(), fonts())
        .await
        .unwrap()
}

fn render_default(s: &mut RenderSurface, style: StyleId, ratio: AspectRatioId) {
    s.render(
        tokyo(),
        &style.spec(),
        ViewportSpec::new(13.0, ratio),
        &default_place().label,
        true,
    )
    .unwrap();
}

#[tokio::test]
async fn mount_rejects_zero_size_with_attach_failed() {
    let lib = MockLibrary::new();
    let handle = SurfaceHandle::new(Size::ZERO);
    let err = RenderSurface::mount(handle, lib, SurfaceOpts::default(), fonts())
        .await
        .unwrap_err();
    assert!(matches!(err, CityPaperError::AttachFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn mount_times_out_when_engine_never_loads() {
    let lib = MockLibrary::unloaded();
    let handle = SurfaceHandle::new(Size::new(340.0, 718.0));
    let err = RenderSurface::mount(handle, lib, SurfaceOpts::default(), fonts())
        .await
        .unwrap_err();
    assert!(matches!(err, CityPaperError::EngineUnavailable(_)));
}

#[tokio::test]
async fn render_applies_style_before_view() {
    let lib = MockLibrary::new();
    let mut s = mounted(&lib).await;
    let views_before = lib.log().views.len();
    render_default(&mut s, StyleId::Retro, AspectRatioId::Phone9x19);
    render_default(&mut s, StyleId::Light, AspectRatioId::Phone9x19);

    let log = lib.log();
    assert_eq!(log.layers.len(), 1);
    assert_eq!(log.views.len(), views_before + 2);
    assert_eq!(
        log.events,
        ["add_layer", "view", "remove_layer", "add_layer", "view"]
    );
    drop(log);
    assert_eq!(s.layer_count(), 1);
    assert!(s.center().unwrap().approx_eq(tokyo(), 1e-12));
}

#[tokio::test]
async fn aspect_ratio_drives_capture_geometry() {
    let lib = MockLibrary::new();
    let mut s = mounted(&lib).await;
    render_default(&mut s, StyleId::Dark, AspectRatioId::Phone9x16);
    assert_eq!(s.capture_size(), Size::new(340.0, 604.0));

    let frame = s.compose(3.0, ComposeMode::Capture).unwrap();
    assert_eq!((frame.width, frame.height), (1020, 1812));
}

#[tokio::test]
async fn capture_has_square_corners_and_preview_is_framed() {
    let lib = MockLibrary::new();
    let mut s = mounted(&lib).await;
    render_default(&mut s, StyleId::Dark, AspectRatioId::Phone9x19);

    let capture = s.compose(3.0, ComposeMode::Capture).unwrap();
    assert_eq!((capture.width, capture.height), (1020, 2154));
    assert_eq!(capture.pixel(0, 0).unwrap()[3], 255);
    assert_eq!(capture.pixel(1019, 2153).unwrap()[3], 255);

    let preview = s.compose(1.0, ComposeMode::Preview).unwrap();
    assert_eq!((preview.width, preview.height), (356, 734));
    assert_eq!(preview.pixel(0, 0).unwrap()[3], 0);
    assert_eq!(preview.pixel(178, 2).unwrap(), [0x11, 0x11, 0x11, 255]);
}

#[tokio::test]
async fn compose_before_render_is_a_validation_error() {
    let lib = MockLibrary::new();
    let mut s = mounted(&lib).await;
    assert!(matches!(
        s.compose(3.0, ComposeMode::Capture),
        Err(CityPaperError::Validation(_))
    ));
}

#[tokio::test]
async fn engine_loss_is_persistent_until_remount() {
    let lib = MockLibrary::new();
    let mut s = mounted(&lib).await;
    render_default(&mut s, StyleId::Dark, AspectRatioId::Phone9x19);

    lib.loaded.store(false, Ordering::SeqCst);
    let err = s
        .render(
            tokyo(),
            &StyleId::Light.spec(),
            ViewportSpec::default(),
            &default_place().label,
            true,
        )
        .unwrap_err();
    assert!(matches!(err, CityPaperError::EngineUnavailable(_)));

    lib.loaded.store(true, Ordering::SeqCst);
    assert!(matches!(
        s.compose(3.0, ComposeMode::Capture),
        Err(CityPaperError::EngineUnavailable(_))
    ));
    assert!(s.failure().is_some());

    s.remount().await.unwrap();
    assert!(s.failure().is_none());
    assert_eq!(lib.log().created, 2);
    assert_eq!(s.layer_count(), 1);
    assert!(s.compose(1.0, ComposeMode::Capture).is_ok());
}

#[tokio::test]
async fn pick_callback_is_kept_across_remount() {
    let lib = MockLibrary::new();
    let mut s = mounted(&lib).await;
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    s.on_location_picked(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    s.pick_location(Point::new(10.0, 10.0)).unwrap();
    s.unmount();
    assert!(s.pick_location(Point::new(10.0, 10.0)).is_err());
    s.remount().await.unwrap();
    s.pick_location(Point::new(10.0, 10.0)).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn export_guard_rejects_second_claim() {
    let lib = MockLibrary::new();
    let shared = SharedSurface::new(mounted(&lib).await);

    let first = shared.try_begin_export().unwrap();
    assert!(shared.is_exporting());
    assert!(matches!(
        shared.try_begin_export(),
        Err(CityPaperError::ExportInProgress)
    ));
    drop(first);
    assert!(!shared.is_exporting());
    assert!(shared.try_begin_export().is_ok());
}

#[tokio::test(start_paused = true)]
async fn sync_size_forwards_host_resize_once_and_counts_as_mutation() {
    let lib = MockLibrary::new();
    let mut s = mounted(&lib).await;
    render_default(&mut s, StyleId::Dark, AspectRatioId::Phone9x19);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!s.sync_size().unwrap());

    s.handle().resize(Size::new(340.0, 765.0));
    assert!(s.sync_size().unwrap());
    assert!(s.since_last_mutation() < Duration::from_millis(1));
    assert_eq!(lib.log().invalidations, 1);
    assert!(!s.sync_size().unwrap());
}
