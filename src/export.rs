use chrono::NaiveDate;

use crate::projection::{Column, Row};

pub const EXPORT_FILENAME: &str = "vzajemne-hodnoceni.csv";
pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_COMMENT: &str = "Žádná poznámka";

const BOM: char = '\u{feff}';
const DELIMITER: &str = ";";

pub fn format_date(date: NaiveDate) -> String {
    date.format("%-d. %-m. %Y").to_string()
}

fn optional_date(date: Option<NaiveDate>) -> String {
    date.map(format_date)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Display text of one cell.
pub fn cell(row: &Row, column: Column, max_score: i32) -> String {
    match column {
        Column::Sender => row.sender.clone(),
        Column::Link => row.link.clone(),
        Column::Reviewer => row
            .reviewer
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        Column::Status => row.status.label().to_string(),
        Column::Score => match row.score {
            Some(score) if row.is_review() => format!("{} / {}", score, max_score),
            _ => NOT_AVAILABLE.to_string(),
        },
        Column::Comment => {
            if row.comment.trim().is_empty() {
                NO_COMMENT.to_string()
            } else {
                row.comment.clone()
            }
        }
        Column::SubmissionDate => format_date(row.submission_date),
        Column::PickupDate => optional_date(row.pickup_date),
        Column::CorrectionDate => optional_date(row.correction_date),
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn record<I: IntoIterator<Item = String>>(fields: I) -> String {
    let mut line = fields
        .into_iter()
        .map(|f| quote(&f))
        .collect::<Vec<_>>()
        .join(DELIMITER);
    line.push_str("\r\n");
    line
}

/// Semicolon-separated export of `rows` with a header, prefixed by a BOM so
/// spreadsheet tools pick up UTF-8.
pub fn to_csv(rows: &[Row], max_score: i32) -> String {
    let columns = Column::all();

    let mut out = String::new();
    out.push(BOM);
    out.push_str(&record(columns.iter().map(|c| c.label().to_string())));
    for row in rows {
        out.push_str(&record(columns.iter().map(|c| cell(row, *c, max_score))));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::RowStatus;

    fn row(review: bool) -> Row {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        Row {
            submission_id: "s1".into(),
            review_id: review.then(|| "r1".to_string()),
            sender: "ana@skola.cz".into(),
            link: "https://example.com/\"a\"".into(),
            reviewer: review.then(|| "jan@skola.cz".to_string()),
            status: if review {
                RowStatus::Finished
            } else {
                RowStatus::Unassigned
            },
            score: review.then_some(85),
            comment: String::new(),
            submission_date: date,
            pickup_date: review.then_some(date),
            correction_date: None,
        }
    }

    #[test]
    fn review_row_shows_score_out_of_max() {
        let csv = to_csv(&[row(true)], 100);
        let line = csv.lines().nth(1).unwrap();

        assert!(line.contains("\"85 / 100\""));
        assert!(line.contains("\"Dokončeno\""));
        assert!(line.contains("\"Žádná poznámka\""));
        assert!(line.contains("\"5. 3. 2024\""));
    }

    #[test]
    fn placeholder_row_has_no_score() {
        let csv = to_csv(&[row(false)], 100);
        let fields: Vec<&str> = csv.lines().nth(1).unwrap().split(';').collect();

        assert_eq!(fields.len(), 9);
        assert_eq!(fields[2], "\"N/A\"");
        assert_eq!(fields[3], "\"Nepřiřazeno\"");
        assert_eq!(fields[4], "\"N/A\"");
        assert_eq!(fields[7], "\"N/A\"");
    }

    #[test]
    fn output_starts_with_bom_and_header() {
        let csv = to_csv(&[], 10);

        assert!(csv.starts_with('\u{feff}'));
        assert!(csv.contains("\"Odesílatel\";\"Odkaz\";\"Hodnotitel\""));
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let csv = to_csv(&[row(true)], 100);

        assert!(csv.contains("\"https://example.com/\"\"a\"\"\""));
    }
}
