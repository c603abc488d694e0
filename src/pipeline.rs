// Subject resolution: identifier in, redirect URL out.
//
// A single subject goes through lookup-or-registration, then access code
// retrieval, then URL construction. Each remote step must yield exactly
// one record. A batch runs that sequence once per CSV row and stops at the
// first failing row.

use crate::api::{ApiClient, Transport};
use crate::config::StudySettings;
use crate::error::CamcogError;
use std::io::Read;

/// One input row of a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    /// 1-based line number in the input.
    pub line: usize,
    pub subject_id: String,
    /// Passed through to the output line; never sent to the remote service.
    pub email: String,
}

/// Resolve one subject to its redirect URL.
pub fn resolve_subject<T: Transport>(
    api: &ApiClient<T>,
    study: &StudySettings,
    subject_id: &str,
) -> Result<String, CamcogError> {
    let query = study.query(subject_id);
    let subject = api
        .find_or_create_subject(&query)?
        .into_single()
        .map_err(|found| CamcogError::SubjectCardinality {
            subject_id: subject_id.to_string(),
            found,
        })?;
    tracing::debug!(subject = %subject_id, internal_id = %subject.id, "resolved subject");

    let login = api
        .issue_access_code(&subject.id)?
        .into_single()
        .map_err(|found| CamcogError::AccessCodeCardinality {
            subject: subject.id.clone(),
            found,
        })?;

    Ok(api.build_redirect_url(&subject.id, &login.access_code))
}

/// Read every row of a headerless CSV batch: subject identifier in the
/// first column, email in the second (empty when the file has one column).
/// The whole input is read before anything is sent to the remote service.
pub fn read_batch<R: Read>(reader: R) -> Result<Vec<BatchRow>, CamcogError> {
    let mut csv = csv::ReaderBuilder::new().has_headers(false).from_reader(reader);
    let mut rows = Vec::new();
    for (index, record) in csv.records().enumerate() {
        let record = record?;
        let line = record.position().map_or(index + 1, |p| p.line() as usize);
        let subject_id = record.get(0).unwrap_or_default().trim().to_string();
        if subject_id.is_empty() {
            return Err(CamcogError::InvalidRow {
                line,
                reason: "empty subject identifier".into(),
            });
        }
        rows.push(BatchRow {
            line,
            subject_id,
            email: record.get(1).unwrap_or_default().trim().to_string(),
        });
    }
    Ok(rows)
}

/// Output line for a resolved row: `<identifier>,<email>,<url>`.
pub fn batch_line(row: &BatchRow, url: &str) -> String {
    format!("{},{},{}", row.subject_id, row.email, url)
}

/// Resolve rows in order, handing each URL to `emit` as soon as it is
/// known. The first failure stops the batch; later rows are not attempted.
/// Returns the number of rows emitted.
pub fn process_batch<T, F>(
    api: &ApiClient<T>,
    study: &StudySettings,
    rows: &[BatchRow],
    mut emit: F,
) -> Result<usize, CamcogError>
where
    T: Transport,
    F: FnMut(&BatchRow, &str) -> std::io::Result<()>,
{
    for (done, row) in rows.iter().enumerate() {
        let url = resolve_subject(api, study, &row.subject_id).map_err(|source| {
            tracing::warn!(line = row.line, subject = %row.subject_id, processed = done, "batch stopped");
            CamcogError::Row {
                line: row.line,
                subject_id: row.subject_id.clone(),
                source: Box::new(source),
            }
        })?;
        emit(row, &url)?;
    }
    tracing::info!(rows = rows.len(), "batch complete");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_identifier_and_email_columns() {
        let rows = read_batch("S1,one@example.org\nS2,two@example.org\n".as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                BatchRow { line: 1, subject_id: "S1".into(), email: "one@example.org".into() },
                BatchRow { line: 2, subject_id: "S2".into(), email: "two@example.org".into() },
            ]
        );
    }

    #[test]
    fn single_column_file_has_empty_emails() {
        let rows = read_batch("S1\nS2\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.email.is_empty()));
    }

    #[test]
    fn ragged_rows_fail_before_processing() {
        let result = read_batch("S1,a@example.org\nS2\n".as_bytes());
        assert!(matches!(result, Err(CamcogError::BatchInput(_))));
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let result = read_batch("S1,a@example.org\n ,b@example.org\n".as_bytes());
        assert!(matches!(result, Err(CamcogError::InvalidRow { line: 2, .. })));
    }

    #[test]
    fn batch_line_echoes_email() {
        let row = BatchRow { line: 1, subject_id: "S1".into(), email: "a@example.org".into() };
        assert_eq!(batch_line(&row, "https://x/?a=1"), "S1,a@example.org,https://x/?a=1");
    }
}
