use super::*;
use crate::engine::mock::MockLibrary;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn tokyo() -> Location {
    Location::new(35.6762, 139.6503).unwrap()
}

fn surface() -> SurfaceHandle {
    SurfaceHandle::new(Size::new(340.0, 718.0))
}

fn adapter(lib: &Arc<MockLibrary>) -> TileEngineAdapter {
    TileEngineAdapter::new(lib.clone(), ReadyPolicy::default(), false)
}

#[tokio::test(start_paused = true)]
async fn ensure_ready_resolves_once_library_loads() {
    let lib = MockLibrary::unloaded();
    let a = adapter(&lib);

    let flip = lib.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        flip.loaded.store(true, Ordering::SeqCst);
    });
    a.ensure_ready().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ensure_ready_fails_after_bound() {
    let lib = MockLibrary::unloaded();
    let a = TileEngineAdapter::new(
        lib.clone(),
        ReadyPolicy {
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(2),
        },
        false,
    );
    let started = tokio::time::Instant::now();
    let err = a.ensure_ready().await.unwrap_err();
    assert!(matches!(err, CityPaperError::EngineUnavailable(_)));
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn attach_is_idempotent_and_disables_chrome() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    let s = surface();
    a.attach(&s, tokyo(), 13.0).unwrap();
    a.attach(&s, tokyo(), 13.0).unwrap();

    let log = lib.log();
    assert_eq!(log.created, 1);
    let opts = &log.options[0];
    assert!(!opts.zoom_control);
    assert!(!opts.attribution_control);
    assert!(!opts.animate);
}

#[test]
fn attach_failures_are_typed() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    assert!(matches!(
        a.attach(&SurfaceHandle::new(Size::ZERO), tokyo(), 13.0),
        Err(CityPaperError::AttachFailed(_))
    ));

    a.attach(&surface(), tokyo(), 13.0).unwrap();
    assert!(matches!(
        a.attach(&surface(), tokyo(), 13.0),
        Err(CityPaperError::AttachFailed(_))
    ));

    let unloaded = MockLibrary::unloaded();
    let mut b = adapter(&unloaded);
    assert!(matches!(
        b.attach(&surface(), tokyo(), 13.0),
        Err(CityPaperError::EngineUnavailable(_))
    ));
}

#[test]
fn set_view_before_attach_is_an_attach_error() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    assert!(matches!(
        a.set_view(tokyo(), 13.0),
        Err(CityPaperError::AttachFailed(_))
    ));
}

#[test]
fn set_view_clamps_zoom_and_keeps_center() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    a.attach(&surface(), tokyo(), 13.0).unwrap();

    for (requested, applied) in [(25.0, 18.0), (2.0, 10.0), (f64::NAN, 10.0), (12.5, 12.5)] {
        let loc = Location::new(-33.9249, 18.4241).unwrap();
        a.set_view(loc, requested).unwrap();
        assert_eq!(a.zoom(), Some(applied));
        assert!(a.center().unwrap().approx_eq(loc, 1e-12));
    }

    for (lat, lng) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
        let loc = Location::new(lat, lng).unwrap();
        a.set_view(loc, 13.0).unwrap();
        assert!(a.center().unwrap().approx_eq(loc, 1e-12));
    }
}

#[test]
fn repeated_style_swaps_leave_one_layer() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    a.attach(&surface(), tokyo(), 13.0).unwrap();
    assert_eq!(a.layer_count(), 0);

    for id in StyleId::ALL.into_iter().chain(StyleId::ALL).chain([StyleId::Dark]) {
        a.set_style(&id.spec()).unwrap();
        assert_eq!(a.layer_count(), 1);
    }

    let log = lib.log();
    let (_, layer) = &log.layers[0];
    assert_eq!(layer.url_template, StyleId::Dark.spec().tile_source_template);
    assert_eq!(layer.cross_origin, Some(CrossOrigin::Anonymous));
}

#[test]
fn same_style_twice_does_not_reload_tiles() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    a.attach(&surface(), tokyo(), 13.0).unwrap();
    a.set_style(&StyleId::Silver.spec()).unwrap();
    let first = lib.log().layers[0].0;
    a.set_style(&StyleId::Silver.spec()).unwrap();
    assert_eq!(lib.log().layers[0].0, first);
}

#[test]
fn pick_callback_survives_attach_and_replaces_previous() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);

    let old = Arc::new(AtomicUsize::new(0));
    let o = old.clone();
    a.on_location_picked(Arc::new(move |_| {
        o.fetch_add(1, Ordering::SeqCst);
    }));
    a.attach(&surface(), tokyo(), 13.0).unwrap();
    a.click(Point::new(1.0, 1.0)).unwrap();
    assert_eq!(old.load(Ordering::SeqCst), 1);

    let new = Arc::new(AtomicUsize::new(0));
    let n = new.clone();
    a.on_location_picked(Arc::new(move |_| {
        n.fetch_add(1, Ordering::SeqCst);
    }));
    a.click(Point::new(1.0, 1.0)).unwrap();
    assert_eq!(old.load(Ordering::SeqCst), 1);
    assert_eq!(new.load(Ordering::SeqCst), 1);
}

#[test]
fn resizes_are_forwarded_without_explicit_notify() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    let s = surface();
    a.attach(&s, tokyo(), 13.0).unwrap();

    a.set_view(tokyo(), 13.0).unwrap();
    assert_eq!(lib.log().invalidations, 0);

    s.resize(Size::new(340.0, 765.0));
    a.set_view(tokyo(), 13.0).unwrap();
    assert_eq!(lib.log().invalidations, 1);
    assert_eq!(a.engine_size(), Some(Size::new(340.0, 765.0)));

    a.notify_resized().unwrap();
    assert_eq!(lib.log().invalidations, 2);
}

#[test]
fn library_loss_tears_down_engine() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    a.attach(&surface(), tokyo(), 13.0).unwrap();

    lib.loaded.store(false, Ordering::SeqCst);
    assert!(matches!(
        a.set_view(tokyo(), 13.0),
        Err(CityPaperError::EngineUnavailable(_))
    ));
    assert!(!a.is_attached());
    assert_eq!(lib.log().destroyed, 1);
}

#[test]
fn detached_surface_is_an_attach_error() {
    let lib = MockLibrary::new();
    let mut a = adapter(&lib);
    let s = surface();
    a.attach(&s, tokyo(), 13.0).unwrap();
    s.detach();
    assert!(matches!(
        a.rasterize(3.0),
        Err(CityPaperError::AttachFailed(_))
    ));
}

#[test]
fn drop_destroys_engine_once() {
    let lib = MockLibrary::new();
    {
        let mut a = adapter(&lib);
        a.attach(&surface(), tokyo(), 13.0).unwrap();
        a.detach();
    }
    assert_eq!(lib.log().destroyed, 1);
}
