//! Output formatting

use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Print a single value; tables fall back to pretty JSON
    pub fn print<T: Serialize>(&self, data: &T) {
        match self {
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(data).unwrap_or_default());
            }
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
        }
    }

    /// Print a list, as rows when the format is a table
    pub fn print_rows<T: Serialize + Tabled>(&self, rows: &[T]) {
        match self {
            OutputFormat::Table => println!("{}", Table::new(rows)),
            _ => self.print(&rows),
        }
    }
}
