use chrono::Local;
use crate::service::protocol::AttendanceRecord;

const HEADERS: [&str; 8] = ["ID", "User", "Date", "Type", "Time", "Confidence", "Liveness", "Manual"];

fn row(record: &AttendanceRecord) -> [String; 8] {
    [
        record.id.to_string(),
        record.user_id.to_string(),
        record.date.to_string(),
        record.kind.clone(),
        record.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string(),
        format!("{:.1}%", record.confidence_fraction() * 100.0),
        record.liveness_score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
        if record.manual_override { "yes" } else { "no" }.to_string(),
    ]
}

pub fn render_records(records: &[AttendanceRecord]) -> String {
    if records.is_empty() {
        return "No attendance records found\n".to_string();
    }

    let rows: Vec<[String; 8]> = records.iter().map(row).collect();
    let mut widths = HEADERS.map(str::len);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells.iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-");

    let mut out = String::new();
    out.push_str(line(HEADERS.map(String::from).as_slice()).trim_end());
    out.push('\n');
    out.push_str(&separator);
    out.push('\n');
    for cells in &rows {
        out.push_str(line(cells.as_slice()).trim_end());
        out.push('\n');
    }
    out
}
