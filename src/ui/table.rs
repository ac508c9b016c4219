use tabled::{Table, Tabled, settings::Style};

use crate::facade::{TierUsage, Usage};
use crate::ui::human_bytes;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "Tier")]
    tier: &'static str,
    #[tabled(rename = "Items")]
    items: usize,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Available")]
    available: String,
}

impl UsageRow {
    fn new(tier: &'static str, usage: &TierUsage) -> Self {
        Self {
            tier,
            items: usage.item_count,
            used: human_bytes(usage.used_bytes),
            available: human_bytes(usage.available_bytes),
        }
    }
}

pub fn usage_table(usage: &Usage) -> String {
    let rows = [
        UsageRow::new("durable", &usage.durable),
        UsageRow::new("session", &usage.ephemeral),
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}
