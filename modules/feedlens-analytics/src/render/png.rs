use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{Palette, Palette99};

use feedlens_common::Result;

use super::{Chart, ChartData, ChartRenderer, Series, TOP_TOPICS};

const FONT: &str = "sans-serif";

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Draws each chart to `<name>.png` with plotters' bitmap backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngRenderer;

impl ChartRenderer for PngRenderer {
    fn render(&self, chart: &Chart, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.png", chart.name));
        draw(chart, &path).with_context(|| format!("Failed to draw {}", chart.name))?;
        Ok(path)
    }
}

fn canvas_size(data: &ChartData) -> (u32, u32) {
    match data {
        ChartData::Emotions { .. } => (1200, 800),
        ChartData::TopicsAndCategories { .. } => (2000, 900),
        ChartData::Heatmap { .. } => (1400, 1000),
        ChartData::TimeSeries { .. } => (1500, 1500),
    }
}

fn draw(chart: &Chart, path: &Path) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, canvas_size(&chart.data)).into_drawing_area();
    root.fill(&WHITE)?;

    match &chart.data {
        ChartData::Emotions { bars } => vertical_bars(&root, chart.title, bars)?,
        ChartData::TopicsAndCategories { topics, categories } => {
            let (left, right) = root.split_horizontally(1100);
            horizontal_bars(&left, &format!("Top {TOP_TOPICS} Topics"), topics)?;
            pie(&right, "Category Distribution", categories)?;
        }
        ChartData::Heatmap {
            rows,
            columns,
            cells,
        } => heatmap(&root, chart.title, rows, columns, cells)?,
        ChartData::TimeSeries {
            volume,
            emotions,
            categories,
        } => {
            let (Some(&(start, _)), Some(&(end, _))) = (volume.first(), volume.last()) else {
                bail!("time series has no days");
            };
            let panels = root.split_evenly((3, 1));
            let volume = [Series {
                name: "posts".to_string(),
                points: volume.clone(),
            }];
            line_panel(&panels[0], "Daily Volume", start, end, &volume, false)?;
            line_panel(&panels[1], "Emotion Trends", start, end, emotions, true)?;
            line_panel(&panels[2], "Category Trends", start, end, categories, true)?;
        }
    }

    root.present()?;
    Ok(())
}

fn palette(index: usize) -> RGBColor {
    let (r, g, b) = Palette99::COLORS[index % Palette99::COLORS.len()];
    RGBColor(r, g, b)
}

fn segment_label(names: &[String], value: &SegmentValue<u32>) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            names.get(*i as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

fn entry_names(entries: &[(String, usize)]) -> Vec<String> {
    entries.iter().map(|(name, _)| name.clone()).collect()
}

fn axis_top(entries: &[(String, usize)]) -> u32 {
    entries.iter().map(|(_, n)| *n as u32).max().unwrap_or(0) + 1
}

fn vertical_bars(area: &Area, title: &str, bars: &[(String, usize)]) -> anyhow::Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 32))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..bars.len() as u32).into_segmented(), 0u32..axis_top(bars))?;

    let names = entry_names(bars);
    let label = |v: &SegmentValue<u32>| segment_label(&names, v);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&label)
        .y_desc("Count")
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.7).filled())
            .margin(10)
            .data(bars.iter().enumerate().map(|(i, (_, n))| (i as u32, *n as u32))),
    )?;
    Ok(())
}

/// Largest entry on top.
fn horizontal_bars(area: &Area, title: &str, entries: &[(String, usize)]) -> anyhow::Result<()> {
    let bars: Vec<(String, usize)> = entries.iter().rev().cloned().collect();
    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(320)
        .build_cartesian_2d(0u32..axis_top(&bars), (0u32..bars.len() as u32).into_segmented())?;

    let names = entry_names(&bars);
    let label = |v: &SegmentValue<u32>| segment_label(&names, v);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(bars.len())
        .y_label_formatter(&label)
        .x_desc("Count")
        .draw()?;

    chart.draw_series(
        Histogram::horizontal(&chart)
            .style(GREEN.mix(0.7).filled())
            .margin(6)
            .data(bars.iter().enumerate().map(|(i, (_, n))| (i as u32, *n as u32))),
    )?;
    Ok(())
}

fn pie(area: &Area, title: &str, slices: &[(String, usize)]) -> anyhow::Result<()> {
    let area = area.titled(title, (FONT, 28))?;
    let (width, height) = area.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;

    let sizes: Vec<f64> = slices.iter().map(|(_, n)| *n as f64).collect();
    let colors: Vec<RGBColor> = (0..slices.len()).map(palette).collect();
    let labels: Vec<&str> = slices.iter().map(|(label, _)| label.as_str()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style((FONT, 18).into_font().color(&BLACK));
    pie.percentages((FONT, 16).into_font().color(&WHITE));
    area.draw(&pie)?;
    Ok(())
}

fn heat(count: usize, max: usize) -> RGBColor {
    let t = count as f64 / max.max(1) as f64;
    RGBColor(255, (235.0 - 190.0 * t) as u8, (160.0 - 160.0 * t) as u8)
}

fn heatmap(
    area: &Area,
    title: &str,
    rows: &[String],
    columns: &[String],
    cells: &[Vec<usize>],
) -> anyhow::Result<()> {
    let max = cells.iter().flatten().copied().max().unwrap_or(0);
    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 32))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(200)
        .build_cartesian_2d(
            (0u32..columns.len() as u32).into_segmented(),
            (0u32..rows.len() as u32).into_segmented(),
        )?;

    let column_label = |v: &SegmentValue<u32>| segment_label(columns, v);
    let row_label = |v: &SegmentValue<u32>| segment_label(rows, v);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(columns.len())
        .y_labels(rows.len())
        .x_label_formatter(&column_label)
        .y_label_formatter(&row_label)
        .draw()?;

    let indexed = || {
        cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .map(move |(x, &count)| (x as u32, y as u32, count))
        })
    };

    chart.draw_series(indexed().map(|(x, y, count)| {
        Rectangle::new(
            [
                (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
            ],
            heat(count, max).filled(),
        )
    }))?;

    let centered = TextStyle::from((FONT, 20).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series(indexed().map(|(x, y, count)| {
        Text::new(
            count.to_string(),
            (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
            centered.clone(),
        )
    }))?;
    Ok(())
}

fn line_panel(
    area: &Area,
    title: &str,
    start: NaiveDate,
    end: NaiveDate,
    lines: &[Series],
    legend: bool,
) -> anyhow::Result<()> {
    let span = (end - start).num_days().max(1) as i32;
    let top = lines
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, n)| *n as u32))
        .max()
        .unwrap_or(0)
        + 1;

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 26))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0i32..span, 0u32..top)?;

    let date_label = |offset: &i32| {
        (start + chrono::Duration::days(i64::from(*offset)))
            .format("%m-%d")
            .to_string()
    };
    chart
        .configure_mesh()
        .x_label_formatter(&date_label)
        .y_desc("Count")
        .draw()?;

    for (index, series) in lines.iter().enumerate() {
        let color = palette(index);
        let points = series
            .points
            .iter()
            .map(|(date, n)| ((*date - start).num_days() as i32, *n as u32));
        let drawn = chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?;
        if legend {
            drawn
                .label(series.name.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }
    }

    if legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }
    Ok(())
}
