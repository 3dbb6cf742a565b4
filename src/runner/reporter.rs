use std::fs;
use std::path::Path;

use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table};

use crate::Result;
use crate::config::LoadConfig;
use crate::runner::schedule::RampSchedule;
use crate::runner::types::{RunSummary, TrendSummary};
use crate::utils::{format_duration, format_latency, format_rate};

/// 控制台汇总输出与 JSON 导出
pub struct RunReporter {
    color: bool,
}

impl RunReporter {
    pub fn new(color: bool) -> Self {
        if !color {
            colored::control::set_override(false);
        }
        Self { color }
    }

    fn cell(&self, text: impl ToString, color: Color) -> Cell {
        let cell = Cell::new(text.to_string());
        if self.color { cell.fg(color) } else { cell }
    }

    /// 打印阶段计划（不发请求）
    pub fn print_plan(&self, schedule: &RampSchedule) {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Stage", "Start", "End", "Duration", "VUs"]);

        for (idx, seg) in schedule.segments().iter().enumerate() {
            let vus = if seg.from == seg.to {
                format!("hold {}", seg.to)
            } else {
                format!("{} -> {}", seg.from, seg.to)
            };
            table.add_row(vec![
                Cell::new(idx + 1),
                Cell::new(format_duration(seg.start)),
                Cell::new(format_duration(seg.end)),
                Cell::new(format_duration(seg.duration())),
                self.cell(vus, Color::Cyan),
            ]);
        }

        println!("{}", table);
        println!(
            "  {}: {}, {}: {}",
            "Total duration".bold(),
            format_duration(schedule.total_duration()),
            "Max VUs".bold(),
            schedule.max_vus()
        );
    }

    /// 打印运行开始信息
    pub fn print_header(&self, config: &LoadConfig, schedule: &RampSchedule) {
        println!();
        println!("  {}: {}", "Target".bold(), config.base_url.cyan());
        println!(
            "  {}: {} stage(s), {} total, up to {} VUs",
            "Profile".bold(),
            schedule.segments().len(),
            format_duration(schedule.total_duration()),
            schedule.max_vus()
        );
        println!(
            "  {}: graceful ramp-down {}, graceful stop {}",
            "Drain".bold(),
            format_duration(config.graceful_ramp_down),
            format_duration(config.graceful_stop)
        );
        println!();
    }

    /// 打印运行汇总
    pub fn print_summary(&self, summary: &RunSummary) {
        println!("\n{}", "━".repeat(60));
        println!("{}  {}", "Summary".bold(), summary.run_id.dimmed());
        println!("{}", "━".repeat(60));

        self.print_checks(summary);
        self.print_requests(summary);

        println!(
            "  {}: {} ({:.2}/s)",
            "HTTP requests".bold(),
            summary.http_reqs,
            summary.http_reqs_rate()
        );
        let errors = summary.transport_errors.to_string();
        println!(
            "  {}: {}",
            "Transport errors".bold(),
            if summary.transport_errors == 0 {
                errors.green()
            } else {
                errors.red()
            }
        );
        if summary.interrupted_iterations > 0 {
            println!(
                "  {}: {} complete, {} interrupted",
                "Iterations".bold(),
                summary.iterations,
                summary.interrupted_iterations.to_string().yellow()
            );
        } else {
            println!("  {}: {} complete", "Iterations".bold(), summary.iterations);
        }
        println!(
            "  {}: {}",
            "Iteration duration".bold(),
            trend_line(&summary.iteration_duration)
        );
        println!("  {}: {}", "Peak VUs".bold(), summary.vus_peak);
        println!("  {}: {:.3}s", "Duration".bold(), summary.duration_secs);
        println!();
    }

    fn print_checks(&self, summary: &RunSummary) {
        if summary.checks.is_empty() {
            println!("  {}", "No checks recorded".dimmed());
            return;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Check", "Passes", "Fails", "Rate"]);

        for check in &summary.checks {
            let (mark, color) = if check.fails == 0 {
                ("✓", Color::Green)
            } else {
                ("✗", Color::Red)
            };
            table.add_row(vec![
                self.cell(format!("{} {}", mark, check.name), color),
                Cell::new(check.passes).set_alignment(CellAlignment::Right),
                self.cell(check.fails, if check.fails == 0 { Color::Reset } else { Color::Red })
                    .set_alignment(CellAlignment::Right),
                Cell::new(format_rate(check.rate())).set_alignment(CellAlignment::Right),
            ]);
        }

        println!("{}", table);
        let total = summary.checks_passed() + summary.checks_failed();
        let rate = if total == 0 {
            0.0
        } else {
            summary.checks_passed() as f64 / total as f64
        };
        println!(
            "  {}: {} passed, {} failed ({})",
            "Checks".bold(),
            summary.checks_passed().to_string().green(),
            summary.checks_failed().to_string().red(),
            format_rate(rate)
        );
    }

    fn print_requests(&self, summary: &RunSummary) {
        if summary.requests.is_empty() {
            return;
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            "Request", "Count", "Errors", "Avg", "Med", "p90", "p95", "Max",
        ]);

        for request in &summary.requests {
            let d = &request.duration;
            table.add_row(vec![
                Cell::new(&request.name).add_attribute(Attribute::Bold),
                Cell::new(d.count).set_alignment(CellAlignment::Right),
                self.cell(
                    request.transport_errors,
                    if request.transport_errors == 0 { Color::Reset } else { Color::Red },
                )
                .set_alignment(CellAlignment::Right),
                Cell::new(latency_or_dash(d, d.avg)),
                Cell::new(latency_or_dash(d, d.med)),
                Cell::new(latency_or_dash(d, d.p90)),
                Cell::new(latency_or_dash(d, d.p95)),
                Cell::new(latency_or_dash(d, d.max)),
            ]);
        }

        println!("{}", table);
        println!(
            "  {}: {}",
            "Request duration".bold(),
            trend_line(&summary.http_req_duration)
        );
    }

    /// 以 JSON 导出汇总
    pub fn export_json(&self, summary: &RunSummary, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new(true)
    }
}

fn latency_or_dash(trend: &TrendSummary, value: f64) -> String {
    if trend.count == 0 {
        "-".to_string()
    } else {
        format_latency(value)
    }
}

fn trend_line(trend: &TrendSummary) -> String {
    if trend.count == 0 {
        return "-".to_string();
    }
    format!(
        "avg={} min={} med={} max={} p(90)={} p(95)={}",
        format_latency(trend.avg),
        format_latency(trend.min),
        format_latency(trend.med),
        format_latency(trend.max),
        format_latency(trend.p90),
        format_latency(trend.p95)
    )
}
