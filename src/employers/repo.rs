use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::employers::repo_types::{
    DocumentType, Employer, EmployerWithUser, VerificationStatus,
};
use crate::pagination::{like_pattern, PageRequest, SortDir, LIKE_ESCAPE};

macro_rules! employer_columns {
    () => {
        "e.id, e.user_id, e.company_name, e.company_type, e.company_description, e.website, \
         e.address, e.city, e.state, e.pincode, e.aadhaar_number, e.pan_number, \
         e.aadhaar_document_url, e.pan_document_url, e.verification_status, e.is_verified, \
         e.verified_at, e.verification_notes, e.created_at, e.updated_at"
    };
}

macro_rules! select_with_user {
    () => {
        concat!(
            "SELECT ",
            employer_columns!(),
            ", u.name AS user_name, u.email AS user_email \
             FROM employers e JOIN users u ON u.id = e.user_id"
        )
    };
}

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "e.created_at"),
    ("companyName", "e.company_name"),
    ("verificationStatus", "e.verification_status"),
];
pub const DEFAULT_SORT: &str = "e.created_at";

#[derive(Debug, Default, Clone)]
pub struct EmployerFilter {
    pub verification_status: Option<VerificationStatus>,
    pub search: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &EmployerFilter) {
    if let Some(status) = f.verification_status {
        qb.push(" AND e.verification_status = ").push_bind(status);
    }
    if let Some(search) = &f.search {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(e.company_name) LIKE ")
            .push_bind(pattern.clone())
            .push(LIKE_ESCAPE)
            .push(" OR LOWER(u.name) LIKE ")
            .push_bind(pattern.clone())
            .push(LIKE_ESCAPE)
            .push(" OR LOWER(u.email) LIKE ")
            .push_bind(pattern)
            .push(LIKE_ESCAPE)
            .push(")");
    }
}

const VERIFICATION_REQUEST_FILTER: &str = " AND (e.verification_status = 'pending' \
     OR (e.aadhaar_number IS NOT NULL AND e.pan_number IS NOT NULL))";

impl Employer {
    /// Placeholder profile created alongside an employer account.
    pub async fn create_shell_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        company_name: &str,
    ) -> anyhow::Result<Employer> {
        let employer = sqlx::query_as::<_, Employer>(concat!(
            "INSERT INTO employers AS e (user_id, company_name, company_type, verification_status, \
             is_verified, verification_notes) \
             VALUES ($1, $2, 'hr', 'pending', FALSE, 'Auto-created during registration') \
             RETURNING ",
            employer_columns!()
        ))
        .bind(user_id)
        .bind(company_name)
        .fetch_one(&mut **tx)
        .await?;
        Ok(employer)
    }

    pub async fn find_with_user(db: &PgPool, id: Uuid) -> anyhow::Result<Option<EmployerWithUser>> {
        let row = sqlx::query_as::<_, EmployerWithUser>(concat!(
            select_with_user!(),
            " WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Employer>> {
        let row = sqlx::query_as::<_, Employer>(concat!(
            "SELECT ",
            employer_columns!(),
            " FROM employers e WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn find_by_user_id(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Employer>> {
        let row = sqlx::query_as::<_, Employer>(concat!(
            "SELECT ",
            employer_columns!(),
            " FROM employers e WHERE e.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Row-locks the employer for the rest of the transaction.
    pub async fn lock_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> anyhow::Result<Option<Employer>> {
        let row = sqlx::query_as::<_, Employer>(concat!(
            "SELECT ",
            employer_columns!(),
            " FROM employers e WHERE e.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    pub async fn save_verification_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: VerificationStatus,
        is_verified: bool,
        verified_at: Option<OffsetDateTime>,
        notes: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE employers
               SET verification_status = $2,
                   is_verified = $3,
                   verified_at = $4,
                   verification_notes = $5,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(is_verified)
        .bind(verified_at)
        .bind(notes)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list(
        db: &PgPool,
        filter: &EmployerFilter,
        page: PageRequest,
        sort: (&'static str, SortDir),
    ) -> anyhow::Result<(Vec<EmployerWithUser>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(concat!(select_with_user!(), " WHERE TRUE"));
        push_filters(&mut qb, filter);
        qb.push(format!(" ORDER BY {} {}", sort.0, sort.1.as_sql()))
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<EmployerWithUser>().fetch_all(db).await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM employers e JOIN users u ON u.id = e.user_id WHERE TRUE",
        );
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;
        Ok((rows, total))
    }

    /// Pending employers plus anyone who has filed both KYC numbers.
    pub async fn list_verification_requests(
        db: &PgPool,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<EmployerWithUser>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(concat!(select_with_user!(), " WHERE TRUE"));
        qb.push(VERIFICATION_REQUEST_FILTER)
            .push(" ORDER BY e.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<EmployerWithUser>().fetch_all(db).await?;
        let total = Self::count_verification_requests(db).await?;
        Ok((rows, total))
    }

    pub async fn count_verification_requests(db: &PgPool) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM employers e WHERE TRUE");
        qb.push(VERIFICATION_REQUEST_FILTER);
        let total = qb.build_query_scalar::<i64>().fetch_one(db).await?;
        Ok(total)
    }

    /// Records KYC numbers and puts the employer back into review. Approved
    /// employers are left alone and yield `None`.
    pub async fn submit_kyc(
        db: &PgPool,
        id: Uuid,
        aadhaar_number: &str,
        pan_number: &str,
    ) -> anyhow::Result<Option<Employer>> {
        let row = sqlx::query_as::<_, Employer>(concat!(
            "UPDATE employers e \
                SET aadhaar_number = $2, pan_number = $3, verification_status = 'pending', \
                    is_verified = FALSE, updated_at = now() \
              WHERE e.id = $1 AND e.verification_status <> 'approved' \
              RETURNING ",
            employer_columns!()
        ))
        .bind(id)
        .bind(aadhaar_number)
        .bind(pan_number)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// KYC filed before login: fills in the user's employer profile, creating it
    /// if absent. An existing profile is only touched while it is pending with no
    /// KYC on file; otherwise `None`.
    pub async fn upsert_kyc_for_user(
        db: &PgPool,
        user_id: Uuid,
        company_name: Option<&str>,
        fallback_company_name: &str,
        aadhaar_number: &str,
        pan_number: &str,
        notes: &str,
    ) -> anyhow::Result<Option<Employer>> {
        let row = sqlx::query_as::<_, Employer>(concat!(
            "INSERT INTO employers AS e (user_id, company_name, company_type, aadhaar_number, \
             pan_number, verification_status, is_verified, verification_notes) \
             VALUES ($1, COALESCE($2, $3), 'hr', $4, $5, 'pending', FALSE, $6) \
             ON CONFLICT (user_id) DO UPDATE \
                SET company_name = COALESCE($2, e.company_name), \
                    aadhaar_number = EXCLUDED.aadhaar_number, \
                    pan_number = EXCLUDED.pan_number, \
                    verification_notes = EXCLUDED.verification_notes, \
                    updated_at = now() \
              WHERE e.verification_status = 'pending' \
                AND e.aadhaar_number IS NULL \
                AND e.pan_number IS NULL \
             RETURNING ",
            employer_columns!()
        ))
        .bind(user_id)
        .bind(company_name)
        .bind(fallback_company_name)
        .bind(aadhaar_number)
        .bind(pan_number)
        .bind(notes)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn set_document_url(
        db: &PgPool,
        id: Uuid,
        doc: DocumentType,
        url: &str,
    ) -> anyhow::Result<bool> {
        let sql = match doc {
            DocumentType::Aadhaar => {
                "UPDATE employers SET aadhaar_document_url = $2, updated_at = now() WHERE id = $1"
            }
            DocumentType::Pan => {
                "UPDATE employers SET pan_document_url = $2, updated_at = now() WHERE id = $1"
            }
        };
        let res = sqlx::query(sql).bind(id).bind(url).execute(db).await?;
        Ok(res.rows_affected() == 1)
    }

    /// Owning user of the employer a KYC document URL belongs to.
    pub async fn owner_of_document(db: &PgPool, url: &str) -> anyhow::Result<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id
              FROM employers
             WHERE aadhaar_document_url = $1 OR pan_document_url = $1
             LIMIT 1
            "#,
        )
        .bind(url)
        .fetch_optional(db)
        .await?;
        Ok(owner)
    }
}
