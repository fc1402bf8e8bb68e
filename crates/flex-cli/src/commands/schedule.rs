use std::io::{self, Write};

use anyhow::Result;
use flex_cli::OutputFormat;
use flex_compete::{format_timestamp, FinancialYear};
use tabwriter::TabWriter;

pub fn handle(financial_year: &str, format: OutputFormat) -> Result<()> {
    let year: FinancialYear = financial_year.parse()?;
    let schedule = year.schedule();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&schedule)?),
        OutputFormat::Table => {
            let mut writer = TabWriter::new(io::stdout());
            writeln!(
                writer,
                "MONTH\tQUALIFICATION OPEN\tQUALIFICATION CLOSED\tBIDDING OPEN\tBIDDING CLOSED"
            )?;
            for row in &schedule {
                writeln!(
                    writer,
                    "{} {}\t{}\t{}\t{}\t{}",
                    row.month,
                    row.service_month.format("%Y"),
                    format_timestamp(row.dates.qualification_open),
                    format_timestamp(row.dates.qualification_closed),
                    format_timestamp(row.dates.bidding_open),
                    format_timestamp(row.dates.bidding_closed),
                )?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
