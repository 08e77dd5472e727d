use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use plotters::prelude::*;

use crate::adspot::AuctionMethod;
use crate::experiment::{run_simulations, ExperimentConfig, ExperimentStats};
use crate::fairness::NO_WINNER;
use crate::logger::{sanitize_filename, LogEvent, Logger};
use crate::logln;
use crate::valuers::ValuationTargetingSum;

/// Fraction of a group's width taken up by bars
const GROUP_FILL: f64 = 0.8;

/// Horizontal extent of the bar for `bidder_index` inside group `group_index`
/// Group i spans [i, i + 1); its bars sit side by side, centered in the span
pub fn bar_span(group_index: usize, bidder_index: usize, bidder_count: usize) -> (f64, f64) {
    let width = GROUP_FILL / bidder_count.max(1) as f64;
    let start = group_index as f64 + (1.0 - GROUP_FILL) / 2.0 + bidder_index as f64 * width;
    (start, start + width)
}

/// Grouped bar chart of win share per bidder and group
/// Written to `<out_dir>/share_by_group_<method>.png`, the path is returned
pub fn plot_share_by_group(stats: &ExperimentStats, out_dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(sanitize_filename(&format!("share_by_group_{}.png", stats.method)));

    let allocation = &stats.allocation;
    let groups: Vec<&String> = allocation.shares.keys().collect();
    let bidders: Vec<String> = allocation.bidder_names()
        .into_iter()
        .filter(|name| name != NO_WINNER)
        .collect();
    if groups.is_empty() || bidders.is_empty() {
        return Err(format!("Nothing to plot for method {}", stats.method).into());
    }

    draw_share_by_group(stats, &groups, &bidders, &path)?;
    Ok(path)
}

/// Render the chart to `path`
fn draw_share_by_group(stats: &ExperimentStats, groups: &[&String], bidders: &[String], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let allocation = &stats.allocation;
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Share by bidder and group ({})", stats.method), ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(20)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..groups.len() as f64, -0.08f64..1f64)?;

    chart.configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_: &f64| String::new())
        .y_desc("Share of wins")
        .draw()?;

    for (bidder_index, bidder) in bidders.iter().enumerate() {
        let color = Palette99::pick(bidder_index);
        chart.draw_series(groups.iter().enumerate().map(|(group_index, group)| {
            let (x0, x1) = bar_span(group_index, bidder_index, bidders.len());
            let share = allocation.share(group, bidder);
            Rectangle::new([(x0, 0.0), (x1, share)], color.filled())
        }))?
        .label(bidder.as_str())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], Palette99::pick(bidder_index).filled()));
    }

    chart.draw_series(groups.iter().enumerate().map(|(group_index, group)| {
        Text::new(group.to_string(), (group_index as f64 + 0.45, -0.05), ("sans-serif", 18).into_font())
    }))?;

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Run the experiment with its default configuration and chart every method into `out_dir`
pub fn generate_all_charts(out_dir: &Path, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let results: BTreeMap<AuctionMethod, ExperimentStats> = run_simulations(&ExperimentConfig::default(), &ValuationTargetingSum, logger)?;
    for stats in results.values() {
        let path = plot_share_by_group(stats, out_dir)?;
        logln!(logger, LogEvent::Validation, "Saved plot to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::GroupAllocationStats;
    use crate::records::ImpressionLog;

    #[test]
    fn test_plot_without_winners_reports_error_and_writes_nothing() {
        let stats = ExperimentStats {
            method: AuctionMethod::Gsp,
            n_impressions: 0,
            allocation: GroupAllocationStats::default(),
            log: ImpressionLog::new(),
        };
        let out_dir = std::env::temp_dir().join("adfair_empty_chart");
        let err = plot_share_by_group(&stats, &out_dir).unwrap_err().to_string();
        assert!(err.contains("Nothing to plot for method gsp"));
        assert!(!out_dir.join("share_by_group_gsp.png").exists());
    }

    #[test]
    fn test_bar_spans_stay_inside_group_and_do_not_overlap() {
        let bidders = 3;
        for group in 0..2 {
            let mut previous_end = group as f64;
            for bidder in 0..bidders {
                let (start, end) = bar_span(group, bidder, bidders);
                assert!(start >= previous_end - 1e-12);
                assert!(end > start);
                assert!(end <= group as f64 + 1.0);
                previous_end = end;
            }
        }
        let (start, end) = bar_span(0, 0, 1);
        assert!((start - 0.1).abs() < 1e-12);
        assert!((end - 0.9).abs() < 1e-12);
    }
}
