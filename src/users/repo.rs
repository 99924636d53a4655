use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::auth::repo::user_columns;
use crate::auth::{User, UserRole};
use crate::pagination::{like_pattern, PageRequest, SortDir, LIKE_ESCAPE};

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("name", "name"),
    ("email", "email"),
    ("role", "role"),
];
pub const DEFAULT_SORT: &str = "created_at";

#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &UserFilter) {
    if let Some(role) = f.role {
        qb.push(" AND role = ").push_bind(role);
    }
    if let Some(active) = f.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(search) = &f.search {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(LIKE_ESCAPE)
            .push(" OR LOWER(email) LIKE ")
            .push_bind(pattern)
            .push(LIKE_ESCAPE)
            .push(")");
    }
}

impl User {
    pub async fn list(
        db: &PgPool,
        filter: &UserFilter,
        page: PageRequest,
        sort: (&'static str, SortDir),
    ) -> anyhow::Result<(Vec<User>, i64)> {
        let mut qb =
            QueryBuilder::<Postgres>::new(concat!("SELECT ", user_columns!(), " FROM users WHERE TRUE"));
        push_filters(&mut qb, filter);
        qb.push(format!(" ORDER BY {} {}", sort.0, sort.1.as_sql()))
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<User>().fetch_all(db).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;
        Ok((rows, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::register_as;
    use crate::state::AppState;

    #[sqlx::test(migrations = "./migrations")]
    async fn search_matches_wildcards_literally(pool: PgPool) {
        let state = AppState::with_pool(pool);
        register_as(&state, "Anita_B", "anita.b@example.com", "CANDIDATE").await;
        register_as(&state, "AnitaxB", "anita.x@example.com", "CANDIDATE").await;

        let filter = UserFilter {
            search: Some("a_B".into()),
            ..Default::default()
        };
        let (rows, total) = User::list(
            &state.db,
            &filter,
            PageRequest::new(None, None),
            (DEFAULT_SORT, SortDir::Desc),
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].name, "Anita_B");
    }
}
