//! Per-tier count summary

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use serde::Serialize;

use crate::pipeline::record::{Record, Tier};

/// Counts per quality tier, always covering the full tier set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierSummary {
    pub valid: usize,
    pub warning: usize,
    pub anomaly: usize,
}

/// One summary row for serialized reports.
#[derive(Debug, Clone, Serialize)]
pub struct TierCount {
    pub status: String,
    pub count: usize,
}

impl TierSummary {
    /// Count tiers across a record table. Records that never reached the
    /// rule stage are not counted (there are none after a pipeline run).
    pub fn from_records(records: &[Record]) -> Self {
        let mut summary = TierSummary::default();
        for rec in records {
            match rec.status {
                Some(Tier::Valid) => summary.valid += 1,
                Some(Tier::Warning) => summary.warning += 1,
                Some(Tier::Anomaly) => summary.anomaly += 1,
                None => {}
            }
        }
        summary
    }

    pub fn count(&self, tier: Tier) -> usize {
        match tier {
            Tier::Valid => self.valid,
            Tier::Warning => self.warning,
            Tier::Anomaly => self.anomaly,
        }
    }

    pub fn total(&self) -> usize {
        self.valid + self.warning + self.anomaly
    }

    /// Fixed-order rows (Valid, Warning, Anomaly), zero-filled.
    pub fn rows(&self) -> Vec<TierCount> {
        Tier::ALL
            .iter()
            .map(|&tier| TierCount {
                status: tier.to_string(),
                count: self.count(tier),
            })
            .collect()
    }

    /// Anomaly share in percent, rounded to 2 decimals; 0 for an empty table.
    pub fn percent_anomaly(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let pct = self.anomaly as f64 * 100.0 / total as f64;
        (pct * 100.0).round() / 100.0
    }

    /// Render the summary table to the terminal.
    pub fn display(&self, duplicates_flagged: usize, outliers_demoted: usize) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("QUALITY SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
        ]);

        for row in self.rows() {
            let color = match row.status.as_str() {
                "Valid" => Color::Green,
                "Warning" => Color::Yellow,
                _ => Color::Red,
            };
            table.add_row(vec![
                Cell::new(&row.status).fg(color),
                Cell::new(row.count),
            ]);
        }

        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(self.total()).add_attribute(Attribute::Bold),
        ]);

        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        println!();
        println!(
            "      Anomalies: {}",
            style(format!("{:.2}%", self.percent_anomaly())).red().bold()
        );
        println!(
            "      Duplicates within 1h: {}",
            style(duplicates_flagged).yellow()
        );
        println!(
            "      Demoted by outlier model: {}",
            style(outliers_demoted).yellow()
        );
    }
}
