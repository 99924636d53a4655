use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::employers::repo_types::{
    CompanyType, DocumentType, Employer, EmployerWithUser, VerificationStatus,
};
use crate::pagination::PageRequest;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
    pub verification_status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationQuery {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRequest {
    pub aadhaar_number: String,
    pub pan_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSubmissionRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub aadhaar_number: Option<String>,
    pub pan_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub company_name: String,
    pub company_type: CompanyType,
    pub company_description: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub aadhaar_number: Option<String>,
    pub pan_number: Option<String>,
    pub aadhaar_document_url: Option<String>,
    pub pan_document_url: Option<String>,
    pub is_verified: bool,
    pub verification_status: VerificationStatus,
    pub verification_notes: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<EmployerWithUser> for EmployerResponse {
    fn from(row: EmployerWithUser) -> Self {
        let e = row.employer;
        Self {
            id: e.id,
            user_id: e.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            company_name: e.company_name,
            company_type: e.company_type,
            company_description: e.company_description,
            website: e.website,
            address: e.address,
            city: e.city,
            state: e.state,
            pincode: e.pincode,
            aadhaar_number: e.aadhaar_number,
            pan_number: e.pan_number,
            aadhaar_document_url: e.aadhaar_document_url,
            pan_document_url: e.pan_document_url,
            is_verified: e.is_verified,
            verification_status: e.verification_status,
            verification_notes: e.verification_notes,
            verified_at: e.verified_at,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequestResponse {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub employer_name: String,
    pub email: String,
    pub company_name: String,
    pub aadhaar_number: Option<String>,
    pub pan_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    pub status: VerificationStatus,
    pub documents: DocumentLinks,
}

impl From<EmployerWithUser> for VerificationRequestResponse {
    fn from(row: EmployerWithUser) -> Self {
        let e = row.employer;
        Self {
            id: e.id,
            employer_id: e.id,
            employer_name: row.user_name,
            email: row.user_email,
            company_name: e.company_name,
            aadhaar_number: e.aadhaar_number,
            pan_number: e.pan_number,
            submitted_at: e.created_at,
            status: e.verification_status,
            documents: DocumentLinks {
                aadhaar_url: e.aadhaar_document_url,
                pan_url: e.pan_document_url,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerListResponse {
    pub employers: Vec<EmployerResponse>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub size: i64,
}

impl EmployerListResponse {
    pub fn new(rows: Vec<EmployerWithUser>, req: PageRequest, total: i64) -> Self {
        Self {
            employers: rows.into_iter().map(EmployerResponse::from).collect(),
            total_elements: total,
            total_pages: req.total_pages(total),
            current_page: req.page,
            size: req.size,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequestList {
    pub requests: Vec<VerificationRequestResponse>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub size: i64,
}

impl VerificationRequestList {
    pub fn new(rows: Vec<EmployerWithUser>, req: PageRequest, total: i64) -> Self {
        Self {
            requests: rows.into_iter().map(VerificationRequestResponse::from).collect(),
            total_elements: total,
            total_pages: req.total_pages(total),
            current_page: req.page,
            size: req.size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PendingCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSubmittedResponse {
    pub message: String,
    pub employer_id: Uuid,
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer_email: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub submitted_at: Option<OffsetDateTime>,
}

impl KycSubmittedResponse {
    pub fn for_employer(employer: &Employer, message: &str) -> Self {
        Self {
            message: message.into(),
            employer_id: employer.id,
            status: employer.verification_status,
            employer_email: None,
            submitted_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUploadResponse {
    pub message: String,
    pub file_name: String,
    pub document_url: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_links_skip_missing_urls() {
        let links = DocumentLinks {
            aadhaar_url: Some("/api/employers/documents/a.pdf".into()),
            pan_url: None,
        };
        let v = serde_json::to_value(&links).unwrap();
        assert_eq!(v["aadhaarUrl"], "/api/employers/documents/a.pdf");
        assert!(v.get("panUrl").is_none());
    }

    #[test]
    fn list_response_uses_current_page() {
        let req = PageRequest::new(Some(2), Some(10));
        let list = EmployerListResponse::new(Vec::new(), req, 25);
        let v = serde_json::to_value(&list).unwrap();
        assert_eq!(v["currentPage"], 2);
        assert_eq!(v["totalPages"], 3);
        assert_eq!(v["totalElements"], 25);
        assert!(v["employers"].as_array().unwrap().is_empty());
    }
}
