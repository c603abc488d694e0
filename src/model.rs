// Data shapes exchanged with the remote service. Only a handful of fields
// are interpreted here; the rest are carried so that a decoded record can
// be logged or inspected. Fields the remote schema leaves untyped are kept
// as `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Initial status given to every subject registered by this tool.
pub const NEW_SUBJECT_STATUS: &str = "NEW";

/// Envelope returned by every list-style endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub records: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub success: bool,
}

impl<T> QueryResult<T> {
    /// Returns the only record, or `Err(n)` with the number of records
    /// when there are zero or several. Never picks the first of many.
    pub fn into_single(self) -> Result<T, usize> {
        let found = self.records.len();
        if found != 1 {
            return Err(found);
        }
        self.records.into_iter().next().ok_or(found)
    }
}

/// A subject as stored by the remote service. `id` is the internal
/// identifier, not the caller's subject identifier (see `subject_ids`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub group_def: Option<String>,
    #[serde(default)]
    pub organisation: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub study: Option<String>,
    #[serde(default)]
    pub study_def: Option<String>,
    #[serde(default)]
    pub subject_ids: Option<Vec<String>>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub client_id: Value,
    #[serde(default)]
    pub locale: Value,
    #[serde(default)]
    pub replaced_by: Value,
    #[serde(default)]
    pub screening_status: Value,
    #[serde(default)]
    pub replicas: Value,
    #[serde(default)]
    pub subject_items: Value,
}

/// Login information for a subject; `subject` is the internal identifier
/// of the owning subject.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeRecord {
    pub access_code: String,
    pub subject: String,
    #[serde(default)]
    pub access_code_creation_date: Option<i64>,
    #[serde(default)]
    pub access_code_creator_id: Value,
    #[serde(default)]
    pub access_code_creator_type: Value,
    #[serde(default)]
    pub client_id: Value,
    #[serde(default)]
    pub last_subject_link_email_sent: Value,
    #[serde(default)]
    pub organisation: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub study: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
}

/// Body of the subject registration call. The remote API takes a batch of
/// identifiers; this tool always sends exactly one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    pub subject_ids: Vec<String>,
    pub group_def: String,
    pub site: String,
    pub study: String,
    pub study_def: String,
    pub organisation: String,
    pub status: String,
}

/// Parameters for one subject lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectQuery {
    pub group_def: String,
    pub organisation: String,
    pub study_id: String,
    pub site: String,
    pub study_def: String,
    pub subject_id: String,
}

impl SubjectQuery {
    pub fn create_request(&self) -> CreateSubjectRequest {
        CreateSubjectRequest {
            subject_ids: vec![self.subject_id.clone()],
            group_def: self.group_def.clone(),
            site: self.site.clone(),
            study: self.study_id.clone(),
            study_def: self.study_def.clone(),
            organisation: self.organisation.clone(),
            status: NEW_SUBJECT_STATUS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> SubjectQuery {
        SubjectQuery {
            group_def: "G1".into(),
            organisation: "ORG".into(),
            study_id: "ST1".into(),
            site: "SITE".into(),
            study_def: "SD1".into(),
            subject_id: "S1".into(),
        }
    }

    #[test]
    fn create_request_wraps_single_identifier() {
        let body = serde_json::to_value(query().create_request()).unwrap();
        assert_eq!(
            body,
            json!({
                "subjectIds": ["S1"],
                "groupDef": "G1",
                "site": "SITE",
                "study": "ST1",
                "studyDef": "SD1",
                "organisation": "ORG",
                "status": "NEW"
            })
        );
    }

    #[test]
    fn subject_record_keeps_opaque_fields() {
        let raw = json!({
            "records": [{
                "id": "uuid-1",
                "status": "NEW",
                "subjectIds": ["S1"],
                "clientId": null,
                "locale": {"language": "en"},
                "screeningStatus": 3,
                "version": 2
            }],
            "total": 1,
            "success": true
        });
        let result: QueryResult<SubjectRecord> = serde_json::from_value(raw).unwrap();
        assert_eq!(result.total, 1);
        assert!(result.success);
        let record = &result.records[0];
        assert_eq!(record.id, "uuid-1");
        assert_eq!(record.subject_ids, Some(vec!["S1".to_string()]));
        assert_eq!(record.locale, json!({"language": "en"}));
        assert_eq!(record.screening_status, json!(3));
        assert!(record.client_id.is_null());
    }

    #[test]
    fn into_single_distinguishes_absent_and_ambiguous() {
        let empty: QueryResult<u8> = QueryResult { records: vec![], total: 0, success: true };
        assert_eq!(empty.into_single(), Err(0));

        let many = QueryResult { records: vec![1u8, 2], total: 2, success: true };
        assert_eq!(many.into_single(), Err(2));

        let one = QueryResult { records: vec![7u8], total: 1, success: true };
        assert_eq!(one.into_single(), Ok(7));
    }

    #[test]
    fn null_in_unread_fields_still_decodes() {
        let subjects: QueryResult<SubjectRecord> = serde_json::from_str(
            r#"{"records":[{"id":"uuid-1","site":null,"version":null,"subjectIds":null,
                "status":null,"groupDef":null,"studyDef":null,"replicas":null}],
                "total":1,"success":true}"#,
        )
        .unwrap();
        let subject = subjects.into_single().unwrap();
        assert_eq!(subject.id, "uuid-1");
        assert_eq!(subject.site, None);
        assert_eq!(subject.subject_ids, None);

        let codes: QueryResult<AccessCodeRecord> = serde_json::from_str(
            r#"{"records":[{"accessCode":"ABC123","subject":"uuid-1","organisation":null,
                "version":null,"id":null,"accessCodeCreationDate":null}],"total":1}"#,
        )
        .unwrap();
        let code = codes.into_single().unwrap();
        assert_eq!(code.access_code, "ABC123");
        assert_eq!(code.organisation, None);
        assert_eq!(code.version, None);
    }

    #[test]
    fn access_code_record_requires_code() {
        let raw = json!({"records": [{"subject": "uuid-1"}], "total": 1});
        let decoded: Result<QueryResult<AccessCodeRecord>, _> = serde_json::from_value(raw);
        assert!(decoded.is_err());
    }
}
