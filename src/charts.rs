//! Bar charts of derived customer metrics using Plotters.
//!
//! All charts share one look: black background, white text and a gray
//! value grid.

use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{MetricsError, Result};
use crate::summary::{
    count_by_category, mean_by_category, mean_by_group_and_hue, top_groups_by_mean, GroupedStat,
    TERM_ORDER, TYPE_ORDER,
};
use crate::table::CustomerTable;

pub const STEELBLUE: RGBColor = RGBColor(70, 130, 180);

/// Category label to bar colour
pub type ColorMap<'a> = [(&'a str, RGBColor)];

/// Lightest for short-term through darkest for long-term
pub const TERM_PALETTE: [(&str, RGBColor); 3] = [
    ("short-term", RGBColor(0x82, 0xc4, 0xd5)),
    ("medium-term", RGBColor(0x41, 0xaf, 0xf2)),
    ("long-term", RGBColor(0x1d, 0x65, 0x7c)),
];

/// Colour of `category` in `palette`, steelblue when it has none
pub fn palette_color(palette: &ColorMap<'_>, category: &str) -> RGBColor {
    palette
        .iter()
        .find(|(name, _)| *name == category)
        .map_or(STEELBLUE, |(_, color)| *color)
}

const GRID: RGBColor = RGBColor(128, 128, 128);
const FONT: &str = "sans-serif";

type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn chart_error(err: Box<dyn std::error::Error>) -> MetricsError {
    MetricsError::Chart(err.to_string())
}

/// Mean-per-category bar chart description
#[derive(Debug, Clone)]
pub struct BarChartSpec<'a> {
    pub category_column: &'a str,
    pub value_column: &'a str,
    pub order: &'a [&'a str],
    /// Categories missing from the palette are drawn steelblue
    pub palette: &'a ColorMap<'a>,
    pub title: Option<&'a str>,
    /// Show the value axis as percentages
    pub percent_axis: bool,
}

impl<'a> BarChartSpec<'a> {
    pub fn new(category_column: &'a str, value_column: &'a str, order: &'a [&'a str]) -> Self {
        Self {
            category_column,
            value_column,
            order,
            palette: &[],
            title: None,
            percent_axis: false,
        }
    }

    pub fn palette(mut self, palette: &'a ColorMap<'a>) -> Self {
        self.palette = palette;
        self
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn percent_axis(mut self, percent_axis: bool) -> Self {
        self.percent_axis = percent_axis;
        self
    }
}

/// "avg_tip_percentage" -> "Avg Tip Percentage"
pub fn axis_title(column: &str) -> String {
    column
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn value_ceiling(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(0.0, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn percent_label(v: &f64) -> String {
    format!("{:.0}%", v * 100.0)
}

fn plain_label(v: &f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

struct Bars<'a> {
    labels: Vec<String>,
    values: Vec<f64>,
    colors: Vec<RGBColor>,
    title: Option<&'a str>,
    y_desc: String,
    percent_axis: bool,
}

fn draw_vertical_bars(bars: &Bars<'_>, output_path: &Path) -> DrawResult<()> {
    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&BLACK)?;

    let n = bars.labels.len().max(1) as u32;
    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80);
    if let Some(title) = bars.title {
        builder.caption(title, (FONT, 30).into_font().color(&WHITE));
    }
    let mut chart =
        builder.build_cartesian_2d((0u32..n).into_segmented(), 0f64..value_ceiling(&bars.values))?;

    let x_label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => bars.labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };
    let y_label: &dyn Fn(&f64) -> String = if bars.percent_axis {
        &percent_label
    } else {
        &plain_label
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(GRID.mix(0.6))
        .light_line_style(TRANSPARENT)
        .axis_style(WHITE)
        .x_labels(bars.labels.len())
        .x_label_formatter(&x_label)
        .y_label_formatter(y_label)
        .y_desc(bars.y_desc.as_str())
        .label_style((FONT, 18).into_font().color(&WHITE))
        .axis_desc_style((FONT, 18).into_font().color(&WHITE))
        .draw()?;

    chart.draw_series(bars.values.iter().enumerate().map(|(i, &v)| {
        let i = i as u32;
        let color = bars.colors[i as usize];
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
            color.filled(),
        );
        bar.set_margin(0, 0, 15, 15);
        bar
    }))?;

    root.present()?;
    Ok(())
}

/// Mean of `spec.value_column` per category, rows missing either column
/// dropped. Categories with no rows are drawn as empty slots.
pub fn render_bar_chart(
    table: &CustomerTable,
    spec: &BarChartSpec<'_>,
    output_path: impl AsRef<Path>,
) -> Result<()> {
    let output_path = output_path.as_ref();
    let stats = mean_by_category(
        table,
        spec.category_column,
        spec.value_column,
        Some(spec.order),
    )?;

    let bars = Bars {
        labels: stats.iter().map(|s| s.category.clone()).collect(),
        values: stats.iter().map(|s| s.mean.unwrap_or(0.0)).collect(),
        colors: stats
            .iter()
            .map(|s| palette_color(spec.palette, &s.category))
            .collect(),
        title: spec.title,
        y_desc: axis_title(spec.value_column),
        percent_axis: spec.percent_axis,
    };
    draw_vertical_bars(&bars, output_path).map_err(chart_error)?;
    info!("Bar chart saved to: {}", output_path.display());
    Ok(())
}

/// Number of customers per category of `category_column`
pub fn render_count_chart(
    table: &CustomerTable,
    category_column: &str,
    order: &[&str],
    title: Option<&str>,
    output_path: impl AsRef<Path>,
) -> Result<()> {
    let output_path = output_path.as_ref();
    let counts = count_by_category(table, category_column, Some(order))?;

    let bars = Bars {
        labels: counts.iter().map(|c| c.category.clone()).collect(),
        values: counts.iter().map(|c| c.count as f64).collect(),
        colors: vec![STEELBLUE; counts.len()],
        title,
        y_desc: "Count".to_string(),
        percent_axis: false,
    };
    draw_vertical_bars(&bars, output_path).map_err(chart_error)?;
    info!("Count chart saved to: {}", output_path.display());
    Ok(())
}

fn draw_grouped_hbars(
    groups: &[String],
    stats: &[GroupedStat],
    hue_palette: &ColorMap<'_>,
    output_path: &Path,
) -> DrawResult<()> {
    let root = BitMapBackend::new(output_path, (1000, 1000)).into_drawing_area();
    root.fill(&BLACK)?;

    let n = groups.len().max(1);
    let values: Vec<f64> = stats.iter().map(|s| s.mean).collect();
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(220)
        .build_cartesian_2d(0f64..value_ceiling(&values), -0.5f64..(n as f64 - 0.5))?;

    // First group at the top.
    let row_of = |group_index: usize| (n - 1 - group_index) as f64;
    let y_label = |v: &f64| {
        let nearest = v.round();
        if (v - nearest).abs() > 1e-6 || nearest < 0.0 {
            return String::new();
        }
        let row = nearest as usize;
        if row >= n {
            return String::new();
        }
        groups.get(n - 1 - row).cloned().unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_y_mesh()
        .bold_line_style(GRID.mix(0.6))
        .light_line_style(TRANSPARENT)
        .axis_style(WHITE)
        .y_labels(n)
        .y_label_formatter(&y_label)
        .x_label_formatter(&percent_label)
        .label_style((FONT, 18).into_font().color(&WHITE))
        .draw()?;

    let band = 0.8 / hue_palette.len().max(1) as f64;
    for (h, &(hue, color)) in hue_palette.iter().enumerate() {
        let bars = groups.iter().enumerate().filter_map(|(g, group)| {
            stats
                .iter()
                .find(|s| &s.group == group && s.hue == hue)
                .map(|s| {
                    let top = row_of(g) + 0.4 - band * h as f64;
                    Rectangle::new([(0.0, top - band), (s.mean, top)], color.filled())
                })
        });
        chart.draw_series(bars)?;
    }

    root.present()?;
    Ok(())
}

/// Horizontal bars of `value_column` means per `group_column`, split by
/// `hue_column`, limited to the `top_n` groups with the highest mean.
/// Hues are drawn in palette order; hues outside the palette are left out.
pub fn render_grouped_hbar_chart(
    table: &CustomerTable,
    group_column: &str,
    hue_column: &str,
    value_column: &str,
    hue_palette: &ColorMap<'_>,
    top_n: usize,
    output_path: impl AsRef<Path>,
) -> Result<()> {
    let output_path = output_path.as_ref();
    let stats = mean_by_group_and_hue(table, group_column, hue_column, value_column)?;
    let groups = top_groups_by_mean(&stats, top_n);
    let stats: Vec<GroupedStat> = stats
        .into_iter()
        .filter(|s| groups.contains(&s.group))
        .collect();

    draw_grouped_hbars(&groups, &stats, hue_palette, output_path)
        .map_err(chart_error)?;
    info!("Grouped bar chart saved to: {}", output_path.display());
    Ok(())
}

/// Write the standard chart set into `output_dir`, returning the files
/// written. The category spend chart needs `favorite_item_category_name`
/// and is skipped when the table lacks it.
pub fn render_standard_charts(
    table: &CustomerTable,
    output_dir: impl AsRef<Path>,
    top_categories: usize,
) -> Result<Vec<PathBuf>> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let path = dir.join("average_tip_by_customer_term.png");
    let spec = BarChartSpec::new("customer_term", "avg_tip_percentage", &TERM_ORDER)
        .palette(&TERM_PALETTE)
        .percent_axis(true);
    render_bar_chart(table, &spec, &path)?;
    written.push(path);

    let path = dir.join("average_tip_by_customer_type.png");
    let spec =
        BarChartSpec::new("customer_type", "avg_tip_percentage", &TYPE_ORDER).percent_axis(true);
    render_bar_chart(table, &spec, &path)?;
    written.push(path);

    let path = dir.join("customer_term_count.png");
    render_count_chart(
        table,
        "customer_term",
        &TERM_ORDER,
        Some("Counts by Customer Term"),
        &path,
    )?;
    written.push(path);

    if table.has_column("favorite_item_category_name") {
        let path = dir.join("favorite_category_spend_ratio.png");
        render_grouped_hbar_chart(
            table,
            "favorite_item_category_name",
            "customer_term",
            "favorite_category_spend_ratio",
            &TERM_PALETTE,
            top_categories,
            &path,
        )?;
        written.push(path);
    } else {
        warn!("No favorite_item_category_name column, skipping category spend chart");
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn derived_table() -> CustomerTable {
        let text = "\
customer_term,customer_type,avg_tip_percentage,favorite_item_category_name,favorite_category_spend_ratio
short-term,repeat,0.10,Coffee,0.5
medium-term,one-time,0.20,Coffee,0.3
long-term,repeat,0.15,Tea,0.9
,die-hard,0.40,Tea,0.7
long-term,regular,0.30,Bakery,0.1
";
        CustomerTable::from_reader(text.as_bytes(), b',').unwrap()
    }

    #[test]
    fn test_axis_title() {
        assert_eq!(axis_title("avg_tip_percentage"), "Avg Tip Percentage");
        assert_eq!(axis_title("count"), "Count");
    }

    #[test]
    fn test_palette_is_keyed_by_category() {
        // order and palette listed differently still pair up by name
        let reversed = [TERM_PALETTE[2], TERM_PALETTE[0]];
        assert_eq!(palette_color(&reversed, "long-term"), TERM_PALETTE[2].1);
        assert_eq!(palette_color(&reversed, "short-term"), TERM_PALETTE[0].1);
        assert_eq!(palette_color(&reversed, "medium-term"), STEELBLUE);
        assert_eq!(palette_color(&[], "die-hard"), STEELBLUE);
    }

    #[test]
    fn test_value_ceiling() {
        assert_eq!(value_ceiling(&[]), 1.0);
        assert_eq!(value_ceiling(&[0.0, 0.0]), 1.0);
        assert!((value_ceiling(&[0.5, 2.0]) - 2.2).abs() < 1e-9);
    }

    #[test]
    fn test_render_bar_chart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tips.png");
        let spec = BarChartSpec::new("customer_term", "avg_tip_percentage", &TERM_ORDER)
            .palette(&TERM_PALETTE)
            .percent_axis(true);
        render_bar_chart(&derived_table(), &spec, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_render_standard_charts() {
        let dir = tempdir().unwrap();
        let written = render_standard_charts(&derived_table(), dir.path(), 10).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = tempdir().unwrap();
        let spec = BarChartSpec::new("customer_term", "no_such_column", &TERM_ORDER);
        let result = render_bar_chart(&derived_table(), &spec, dir.path().join("x.png"));
        assert!(matches!(result, Err(MetricsError::MissingColumn(_))));
    }
}
