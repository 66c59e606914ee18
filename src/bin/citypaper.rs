use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use citypaper::{
    AdminNameResolver, AspectRatioId, BatchFile, CapturePipeline, CityPaperConfig, CityPaperError,
    Color,
    ComposeMode, DEFAULT_ZOOM, DirectorySink, Granularity, HttpClient, LabelSlot, Location,
    NominatimGeocoder, PlaceLabel, PresetSearch, RenderSurface, SharedSurface, SlippyLibrary,
    StyleId, SurfaceHandle, ViewportSpec, WallpaperParams, default_place, style_catalog,
};

#[derive(Parser, Debug)]
#[command(name = "citypaper", version, about = "City map wallpapers from XYZ raster tiles")]
struct Cli {
    /// JSON config file. `CITYPAPER_*` environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export one wallpaper as PNG.
    Render(RenderArgs),
    /// Export every place in a batch file, one after another.
    Batch(BatchArgs),
    /// Print the admin name for a coordinate.
    Resolve(ResolveArgs),
    /// List the style catalog.
    Styles,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Start from a built-in place (name or country).
    #[arg(long)]
    preset: Option<String>,

    /// Persisted inputs, e.g. `lat=31.23&lng=121.47&style=retro`. Flags win over it.
    #[arg(long)]
    params: Option<String>,

    /// Latitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Zoom level, clamped to 10..=18.
    #[arg(long)]
    zoom: Option<f64>,

    /// Style id: dark, light, silver or retro.
    #[arg(long)]
    style: Option<StyleId>,

    /// Aspect ratio: 9:19, 9:20 or 9:16.
    #[arg(long)]
    ratio: Option<AspectRatioId>,

    /// Display name. Looked up from the coordinate when missing.
    #[arg(long)]
    name: Option<String>,

    /// Country or region line.
    #[arg(long)]
    country: Option<String>,

    /// Description under the coordinates.
    #[arg(long)]
    description: Option<String>,

    /// Accent color, `#rrggbb`.
    #[arg(long)]
    accent: Option<Color>,

    /// Level for name lookup.
    #[arg(long, default_value = "city")]
    granularity: Granularity,

    /// Leave the label block out.
    #[arg(long)]
    no_labels: bool,

    /// Output directory (defaults to the configured one).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Also write the framed on-screen preview to this path.
    #[arg(long)]
    preview: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Batch JSON file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory (defaults to the configured one).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Write the per-item report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Use the fallback name instead of looking up missing names.
    #[arg(long)]
    no_resolve: bool,
}

#[derive(Parser, Debug)]
struct ResolveArgs {
    /// Latitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,

    /// province, city or district.
    #[arg(long, default_value = "city")]
    granularity: Granularity,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = CityPaperConfig::load(cli.config.as_deref())?;
    match cli.cmd {
        Command::Render(args) => cmd_render(&cfg, args).await,
        Command::Batch(args) => cmd_batch(&cfg, args).await,
        Command::Resolve(args) => cmd_resolve(&cfg, args).await,
        Command::Styles => cmd_styles(),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn make_resolver(cfg: &CityPaperConfig, http: HttpClient) -> anyhow::Result<AdminNameResolver> {
    let geocoder = NominatimGeocoder::new(
        http,
        &cfg.geocode.endpoint,
        cfg.geocode.locale.clone(),
        cfg.geocode.detail,
    )?;
    Ok(AdminNameResolver::with_fallback(
        Arc::new(geocoder),
        cfg.geocode.fallback_name.clone(),
    ))
}

async fn mount_surface(
    cfg: &CityPaperConfig,
    http: HttpClient,
    ratio: AspectRatioId,
) -> anyhow::Result<RenderSurface> {
    let fontdb = citypaper::build_overlay_fontdb(cfg.surface.fonts_dir.as_deref());
    let library = Arc::new(SlippyLibrary::new(
        Arc::new(http),
        Handle::current(),
        Arc::clone(&fontdb),
    ));
    let opts = cfg.surface_opts();
    let handle = SurfaceHandle::new(ratio.logical_size(opts.logical_width));
    let surface = RenderSurface::mount(handle, library, opts, fontdb)
        .await
        .context("tile engine did not come up")?;
    Ok(surface)
}

async fn cmd_render(cfg: &CityPaperConfig, args: RenderArgs) -> anyhow::Result<()> {
    let params = match &args.params {
        Some(q) => WallpaperParams::from_query(q)?,
        None => WallpaperParams::default(),
    };

    let (mut location, mut label) = match &args.preset {
        Some(q) => PresetSearch::default()
            .find(q)?
            .with_context(|| format!("no preset matches '{q}'"))?
            .into_scene(),
        None => {
            let p = default_place();
            (p.location, p.label)
        }
    };

    let explicit = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Some(Location::new(lat, lng)?),
        (None, None) => params.location,
        _ => anyhow::bail!("--lat and --lng must be given together"),
    };
    if let Some(loc) = explicit {
        location = loc;
        label = PlaceLabel {
            display_name: String::new(),
            country_or_region: String::new(),
            description: String::new(),
            accent_color: label.accent_color,
        };
    }
    label = params.label(label);
    if let Some(name) = args.name {
        label.display_name = name;
    }
    if let Some(country) = args.country {
        label.country_or_region = country;
    }
    if let Some(description) = args.description {
        label.description = description;
    }
    if let Some(accent) = args.accent {
        label.accent_color = accent;
    }

    let style = args.style.or(params.style).unwrap_or_default().spec();
    let viewport = ViewportSpec::new(
        args.zoom.or(params.zoom).unwrap_or(DEFAULT_ZOOM),
        args.ratio.or(params.ratio).unwrap_or_default(),
    );

    let http = cfg.http_client()?;
    if label.display_name.trim().is_empty() {
        let slot = LabelSlot::new(label);
        make_resolver(cfg, http.clone())?
            .resolve_into(&slot, location, args.granularity)
            .await;
        label = slot.label();
    }

    let mut surface = mount_surface(cfg, http, viewport.aspect_ratio).await?;
    surface.render(location, &style, viewport, &label, !args.no_labels)?;
    let shared = SharedSurface::new(surface);

    let pipeline = CapturePipeline::new(cfg.capture_opts())?;
    let mut sink = DirectorySink::new(args.out_dir.unwrap_or_else(|| cfg.capture.out_dir.clone()));
    let path = pipeline
        .export_one(&shared, &mut sink)
        .await
        .map_err(export_error)?;
    println!("{}", path.display());

    if let Some(preview) = args.preview {
        let frame = shared
            .lock()
            .await
            .compose(pipeline.opts().pixel_ratio, ComposeMode::Preview)?;
        let png = citypaper::capture::png::encode_png(frame)?;
        std::fs::write(&preview, png)
            .with_context(|| format!("write preview '{}'", preview.display()))?;
        eprintln!("wrote preview {}", preview.display());
    }
    Ok(())
}

/// Capture failures are transient; say so instead of just passing the cause through.
fn export_error(err: CityPaperError) -> anyhow::Error {
    if matches!(err, CityPaperError::CaptureFailed { .. }) {
        anyhow::Error::new(err).context("export failed; run the command again to retry")
    } else {
        err.into()
    }
}

async fn cmd_batch(cfg: &CityPaperConfig, args: BatchArgs) -> anyhow::Result<()> {
    let file = BatchFile::from_path(&args.in_path)?;
    let http = cfg.http_client()?;
    let resolver = if args.no_resolve {
        None
    } else {
        Some(make_resolver(cfg, http.clone())?)
    };
    let (scene, items) = file.prepare(resolver.as_ref()).await?;

    let surface = mount_surface(cfg, http, scene.viewport.aspect_ratio).await?;
    let shared = SharedSurface::new(surface);
    let pipeline = CapturePipeline::new(cfg.capture_opts())?;
    let mut sink = DirectorySink::new(args.out_dir.unwrap_or_else(|| cfg.capture.out_dir.clone()));

    let report = pipeline
        .export_batch(&shared, &scene, &items, &mut sink, |p| {
            eprintln!("[{}/{}] {}", p.index, p.total, p.label);
        })
        .await?;

    if let Some(path) = &args.report {
        let f = std::fs::File::create(path)
            .with_context(|| format!("create report '{}'", path.display()))?;
        serde_json::to_writer_pretty(f, &report).context("write batch report")?;
    }
    eprintln!(
        "batch finished: {} written, {} failed",
        report.written(),
        report.failed()
    );
    if report.written() == 0 {
        anyhow::bail!("no wallpaper was written");
    }
    Ok(())
}

async fn cmd_resolve(cfg: &CityPaperConfig, args: ResolveArgs) -> anyhow::Result<()> {
    let location = Location::new(args.lat, args.lng)?;
    let resolver = make_resolver(cfg, cfg.http_client()?)?;
    println!("{}", resolver.resolve(location, args.granularity).await);
    Ok(())
}

fn cmd_styles() -> anyhow::Result<()> {
    for s in style_catalog() {
        println!(
            "{:<8}{:<16}text {}  background {}",
            s.id.as_str(),
            s.name,
            s.text_color,
            s.background_color
        );
    }
    Ok(())
}
