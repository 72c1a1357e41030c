use anyhow::{Context, Result};
use bincode::Options;
use clap::Parser;
use env_logger::Builder;
use haemocytometer_common::{Frame, GridLayout, Rect};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::filter::gaussian_blur_f32;
use imageproc::rect::Rect as PixelRect;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, LevelFilter};
use palette::Srgb;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded frames file (.json, .msgpack, or bincode otherwise)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the PNG frames are written to
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// Width of the output images in pixels
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Height of the output images in pixels (calculated from aspect ratio if not provided)
    #[arg(long)]
    height: Option<u32>,

    /// Background color, a name or #RRGGBB
    #[arg(long, default_value = "white")]
    bg_color: String,

    /// Fill of cells not yet counted
    #[arg(long, default_value = "#0EA5E9")]
    uncounted_color: String,

    /// Fill of counted cells
    #[arg(long, default_value = "#10B981")]
    counted_color: String,

    /// Outline of the selected counting regions
    #[arg(long, default_value = "#7C3AED")]
    highlight_color: String,
}

// Color definitions for named colors (RGBA format)
const COLOR_MAP: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
];

const GRID_LINE: Rgba<u8> = Rgba([100, 116, 139, 255]);
const SUBGRID_LINE: Rgba<u8> = Rgba([203, 213, 225, 255]);
const LIQUID: Rgba<u8> = Rgba([224, 242, 254, 255]);
// Ruled sub-squares per grid cell
const SUBDIVISIONS: u32 = 4;
const HIGHLIGHT_INSET: f32 = 2.0;
const HIGHLIGHT_THICKNESS: u32 = 3;

/// Parse a color name or `#RRGGBB` / `#RGB` to RGBA values
fn parse_color(color_name: &str) -> [u8; 4] {
    for &(name, color) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color_name) {
            return color;
        }
    }
    if color_name.starts_with('#') {
        if let Ok(rgb) = Srgb::<u8>::from_str(color_name) {
            return [rgb.red, rgb.green, rgb.blue, 255];
        }
    }
    // Default to black if color not found
    warn!("Color '{}' not recognized, using black.", color_name);
    [0, 0, 0, 255]
}

/// Colors used to draw every frame.
#[derive(Debug, Clone, Copy)]
struct Palette {
    background: Rgba<u8>,
    uncounted: Rgba<u8>,
    counted: Rgba<u8>,
    highlight: Rgba<u8>,
}

impl Palette {
    fn from_args(args: &Args) -> Self {
        Palette {
            background: Rgba(parse_color(&args.bg_color)),
            uncounted: Rgba(parse_color(&args.uncounted_color)),
            counted: Rgba(parse_color(&args.counted_color)),
            highlight: Rgba(parse_color(&args.highlight_color)),
        }
    }
}

/// Drawing extent of a layout: the grid plus an equal margin on every side.
fn scene_extent(layout: &GridLayout) -> (f32, f32) {
    let b = &layout.bounds;
    (b.origin.x * 2.0 + b.width, b.origin.y * 2.0 + b.height)
}

fn to_pixel_rect(rect: &Rect, scale: f32, inset: f32) -> Option<PixelRect> {
    let w = ((rect.width - 2.0 * inset) * scale).round();
    let h = ((rect.height - 2.0 * inset) * scale).round();
    if w < 1.0 || h < 1.0 {
        return None;
    }
    let x = ((rect.origin.x + inset) * scale).round() as i32;
    let y = ((rect.origin.y + inset) * scale).round() as i32;
    Some(PixelRect::at(x, y).of_size(w as u32, h as u32))
}

fn draw_grid(image: &mut RgbaImage, layout: &GridLayout, scale: f32) {
    let b = &layout.bounds;
    let (x0, y0) = (b.origin.x * scale, b.origin.y * scale);
    let (x1, y1) = (b.max().x * scale, b.max().y * scale);
    let lines = layout.divisions * SUBDIVISIONS;
    let step_x = b.width * scale / lines as f32;
    let step_y = b.height * scale / lines as f32;

    for i in 0..=lines {
        let color = if i % SUBDIVISIONS == 0 { GRID_LINE } else { SUBGRID_LINE };
        let x = x0 + i as f32 * step_x;
        let y = y0 + i as f32 * step_y;
        draw_line_segment_mut(image, (x, y0), (x, y1), color);
        draw_line_segment_mut(image, (x0, y), (x1, y), color);
    }
}

/// Draw one recorded frame
fn draw_frame(frame: &Frame, width: u32, height: u32, palette: &Palette) -> RgbaImage {
    let mut image = ImageBuffer::from_pixel(width, height, palette.background);
    let (world_w, world_h) = scene_extent(&frame.layout);
    let scale = (width as f32 / world_w).min(height as f32 / world_h);
    let layout = &frame.layout;

    if frame.loaded {
        if let Some(liquid) = to_pixel_rect(&layout.bounds, scale, 0.0) {
            draw_filled_rect_mut(&mut image, liquid, LIQUID);
        }
    }
    draw_grid(&mut image, layout, scale);

    // Cells stay hidden until the sample is in the chamber.
    if frame.loaded {
        for cell in &frame.cells {
            let color = if cell.counted { palette.counted } else { palette.uncounted };
            let px = (cell.position.x * scale).round() as i32;
            let py = (cell.position.y * scale).round() as i32;
            let radius = (cell.radius * scale).round().max(1.0) as i32;
            draw_filled_circle_mut(&mut image, (px, py), radius, color);
        }
    }

    // Focus blurs the specimen, not the overlays drawn on top of it.
    let sigma = frame.blur * scale;
    if sigma > 0.0 {
        image = gaussian_blur_f32(&image, sigma);
    }

    for region in &frame.highlighted_regions {
        let rect = layout.region_rect(*region);
        for t in 0..HIGHLIGHT_THICKNESS {
            if let Some(outline) = to_pixel_rect(&rect, scale, HIGHLIGHT_INSET + t as f32 / scale) {
                draw_hollow_rect_mut(&mut image, outline, palette.highlight);
            }
        }
    }

    image
}

/// Reads recorded frames, picking the decoder from the file extension:
/// `.json`, `.msgpack`, and bincode for anything else.
fn read_frames(path: &Path) -> Result<Vec<Frame>> {
    let file = File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let file_len = file.metadata()?.len();
    let reader = BufReader::new(file);
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let frames = match ext.as_deref() {
        Some("json") => serde_json::from_reader(reader).context("Failed to parse JSON frames")?,
        Some("msgpack") => rmp_serde::decode::from_read(reader).context("Failed to parse MessagePack frames")?,
        _ => bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            // A frames file can never decode to more bytes than it holds.
            .with_limit(file_len)
            .deserialize_from(reader)
            .context("Failed to parse bincode frames")?,
    };
    Ok(frames)
}

fn frame_filename(index: usize) -> String {
    format!("frame_{:04}.png", index)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    let _ = Builder::from_default_env().filter(None, LevelFilter::Info).try_init();

    info!("Starting Haemocytometer Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Output directory: {}", args.output.display());

    let frames = read_frames(&args.input)?;
    info!("Found {} frames in the file", frames.len());
    if frames.is_empty() {
        warn!("Input file contains no frames. Exiting.");
        return Ok(());
    }

    // --- Calculate Output Dimensions ---
    let (world_w, world_h) = scene_extent(&frames[0].layout);
    let output_width_px = args.width;
    let output_height_px = args
        .height
        .unwrap_or_else(|| (output_width_px as f32 * world_h / world_w).round() as u32);
    info!("Output image dimensions: {}x{} px", output_width_px, output_height_px);

    let palette = Palette::from_args(&args);
    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {}", args.output.display()))?;

    // Set up progress bar
    let progress_bar = ProgressBar::new(frames.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let failures: usize = frames
        .par_iter()
        .enumerate()
        .map(|(index, frame)| {
            let image = draw_frame(frame, output_width_px, output_height_px, &palette);
            let path = args.output.join(frame_filename(index));
            let failed = match image.save(&path) {
                Ok(()) => 0,
                Err(e) => {
                    error!("Error writing frame {} ('{}') to {}: {}", index, frame.label, path.display(), e);
                    1
                }
            };
            progress_bar.inc(1);
            failed
        })
        .sum();

    progress_bar.finish_with_message(format!("Rendered {} frames", frames.len()));
    if failures > 0 {
        anyhow::bail!("{} of {} frames could not be written.", failures, frames.len());
    }

    let duration = start_time.elapsed();
    info!("Rendered {} frames in {:.2?}", frames.len(), duration);
    info!("Output saved to: {}", args.output.display());
    Ok(())
}
