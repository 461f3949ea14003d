//! Renders `.xyz` point clouds (or a generated demo cloud) to PNG files
//! without opening a window.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use glam::Vec3;
use log::{info, warn};
use rayon::prelude::*;
use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Instant,
};
use walkdir::WalkDir;

use vitrine::{
    AffineTransform, ChainTransform, DrawPreset, LogTransform, PointsVisual, RenderTarget,
    Renderer, Transform,
};

/// Blend preset for the sprites.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Opaque,
    Translucent,
    Additive,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Opaque => "opaque",
            Mode::Translucent => "translucent",
            Mode::Additive => "additive",
        };

        f.write_str(s)
    }
}

impl From<Mode> for DrawPreset {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Opaque => DrawPreset::Opaque,
            Mode::Translucent => DrawPreset::Translucent,
            Mode::Additive => DrawPreset::Additive,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "pts2png", version)]
struct Args {
    /// A single .xyz file, or a directory scanned recursively for them.
    /// Without it, a generated demo cloud is rendered.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory the PNG files are written into.
    #[arg(long, default_value = "snapshots")]
    out: PathBuf,

    #[arg(long, default_value_t = 1024)]
    width: u32,

    #[arg(long, default_value_t = 768)]
    height: u32,

    /// Sprite diameter in pixels.
    #[arg(long, default_value_t = 10.0)]
    point_size: f32,

    /// Sprite color as RRGGBB or RRGGBBAA hex.
    #[arg(long, default_value = "ff8000cc")]
    color: String,

    #[arg(long, value_enum, default_value_t = Mode::Additive)]
    mode: Mode,

    /// Map the y axis through log10 before fitting.
    #[arg(long, default_value_t = false)]
    log_y: bool,

    /// Demo cloud point count (used when --input is omitted).
    #[arg(long, default_value_t = 10_000)]
    count: usize,

    /// Demo cloud seed.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Fractional padding added around the fitted bounds.
    #[arg(long, default_value_t = 0.05)]
    margin: f32,
}

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    // Parse arguments and prepare the output directory.
    let args = Args::parse();
    let color = parse_color(&args.color)?;
    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    // Gather the work list: named files, or the generated demo cloud.
    let t_load = Instant::now();
    let jobs: Vec<(String, Vec<[f32; 3]>)> = match &args.input {
        Some(path) => {
            let files = collect_inputs(path)?;
            if files.is_empty() {
                return Err(anyhow!("no .xyz files under {}", path.display()));
            }
            files
                .par_iter()
                .map(|p| {
                    // TODO: disambiguate clouds that share a file stem
                    // across directories.
                    let stem = p
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "cloud".to_string());
                    read_xyz(p).map(|pts| (stem, pts))
                })
                .collect::<Result<_>>()?
        }
        None => vec![("demo".to_string(), demo_cloud(args.count, args.seed))],
    };
    let total_points: usize = jobs.iter().map(|(_, pts)| pts.len()).sum();
    info!(
        "loaded {} cloud(s), {} points in {:.1?}",
        jobs.len(),
        total_points,
        t_load.elapsed()
    );

    // One renderer, target and visual serve every snapshot; per-cloud state
    // is swapped in through the setters.
    let renderer = pollster::block_on(Renderer::new())?;
    info!("rendering on \"{}\"", renderer.gfx.adapter_name());
    let target = RenderTarget::new(&renderer.gfx.device, args.width, args.height);
    let mut visual = PointsVisual::new();
    visual.set_preset(args.mode.into());
    visual.set_color(color);
    visual.set_point_size(args.point_size);

    for (name, positions) in jobs {
        let t_frame = Instant::now();
        let out_path = args.out.join(format!("{name}.png"));
        let n = positions.len();
        if n == 0 {
            warn!("{name}: no points parsed; writing a blank frame");
        }

        visual.set_transform(fit_transform(&positions, args.log_y, args.margin));
        visual.set_positions(positions);

        renderer.render(&target, &mut [&mut visual])?;
        let rgba = renderer.snapshot(&target)?;
        save_png(&out_path, target.width, target.height, rgba)?;
        info!(
            "{}: {} points -> {} in {:.1?}",
            name,
            n,
            out_path.display(),
            t_frame.elapsed()
        );
    }

    Ok(())
}

/// Parses `RRGGBB` or `RRGGBBAA` (an optional leading `#` is fine).
fn parse_color(s: &str) -> Result<[f32; 4]> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        return Err(anyhow!("expected RRGGBB or RRGGBBAA hex, got {s:?}"));
    }
    let byte = |i: usize| -> Result<f32> {
        let v = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .with_context(|| format!("bad hex digit pair in {s:?}"))?;
        Ok(v as f32 / 255.0)
    };
    Ok([
        byte(0)?,
        byte(1)?,
        byte(2)?,
        if hex.len() == 8 { byte(3)? } else { 1.0 },
    ])
}

/// A single `.xyz` file, or every `.xyz` under a directory, sorted.
fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xyz"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Reads whitespace-separated `x y z` rows; `#` starts a comment line and
/// extra columns (intensity, color) are ignored.
fn read_xyz(path: &Path) -> Result<Vec<[f32; 3]>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut points = Vec::new();
    let mut bad_rows = 0usize;
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let row = line.trim();
        if row.is_empty() || row.starts_with('#') {
            continue;
        }
        let mut it = row.split_whitespace().map(str::parse::<f32>);
        match (it.next(), it.next(), it.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => points.push([x, y, z]),
            _ => {
                bad_rows += 1;
                if bad_rows <= 3 {
                    warn!("{}:{}: unparsable row {:?}", path.display(), lineno + 1, row);
                }
            }
        }
    }
    if bad_rows > 3 {
        warn!("{}: {} unparsable rows in total", path.display(), bad_rows);
    }
    Ok(points)
}

/// A deterministic demo cloud: a soft shell, so the sprites overlap on the
/// rim and the additive accumulation is visible.
fn demo_cloud(count: usize, seed: u64) -> Vec<[f32; 3]> {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(count);
    while points.len() < count {
        let p = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        let len = p.length();
        if len > 1.0 || len == 0.0 {
            continue;
        }
        let dir = p / len;
        points.push((dir * (0.6 + 0.4 * len)).to_array());
    }
    points
}

/// Componentwise bounds over the finite points.
fn bounds(points: &[[f32; 3]]) -> Option<(Vec3, Vec3)> {
    let mut it = points
        .iter()
        .map(|p| Vec3::from_array(*p))
        .filter(|p| p.is_finite());
    let first = it.next()?;
    Some(it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
}

/// Pads the bounds outward; a degenerate axis gets a fixed half-extent so
/// the fit never divides by zero.
fn pad_bounds(lo: Vec3, hi: Vec3, margin: f32) -> (Vec3, Vec3) {
    let mut lo = lo;
    let mut hi = hi;
    for i in 0..3 {
        let extent = hi[i] - lo[i];
        if extent <= f32::EPSILON {
            lo[i] -= 0.5;
            hi[i] += 0.5;
        } else {
            lo[i] -= extent * margin;
            hi[i] += extent * margin;
        }
    }
    (lo, hi)
}

/// Builds the transform that frames the cloud in the clip volume,
/// optionally through log10 on the y axis first.
fn fit_transform(points: &[[f32; 3]], log_y: bool, margin: f32) -> Box<dyn Transform> {
    let log = log_y.then(|| LogTransform::new(Vec3::new(0.0, 10.0, 0.0)));

    // Fit against the coordinates the GPU will actually see.
    let mapped: Vec<[f32; 3]> = match &log {
        Some(log) => points
            .iter()
            .map(|p| log.map(Vec3::from_array(*p)).to_array())
            .collect(),
        None => points.to_vec(),
    };
    let Some((lo, hi)) = bounds(&mapped) else {
        warn!("no finite points to fit; falling back to the identity transform");
        return Box::new(AffineTransform::identity());
    };
    let (lo, hi) = pad_bounds(lo, hi, margin);
    let ortho = AffineTransform::ortho(lo.x, hi.x, lo.y, hi.y, lo.z, hi.z);

    match log {
        Some(log) => Box::new(ChainTransform::new(vec![Box::new(ortho), Box::new(log)])),
        None => Box::new(ortho),
    }
}

fn save_png(path: &Path, width: u32, height: u32, rgba: Vec<u8>) -> Result<()> {
    let img = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| anyhow!("snapshot size does not match {width}x{height}"))?;
    img.save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
