//! Postgres 泛型仓储实现

use crate::error::StorageError;
use crate::postgres::rows::PgEntity;
use crate::query::{FieldValue, Filter, Page, Predicate, Sort, SortOrder, Update, UpdateOp};
use crate::traits::{DELETED_COLUMN, EntityField, Repository, TENANT_COLUMN};
use crate::validation::{ensure_owned, ensure_readable, ensure_scoped};
use domain::TenantContext;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::marker::PhantomData;

/// 当前时刻（Unix 毫秒）的 SQL 表达式，`Touch` 使用数据库时钟
const NOW_MS_SQL: &str = "(extract(epoch from clock_timestamp()) * 1000)::bigint";

pub struct PgRepository<E: PgEntity> {
    pub pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: PgEntity> Clone for PgRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<E: PgEntity> PgRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url, max_connections).await?;
        Ok(Self::new(pool))
    }
}

fn select_list<E: PgEntity>() -> String {
    E::COLUMNS.join(", ")
}

/// 绑定单个字段值；NULL 以字面量写入，避免无类型参数
fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Null => {
            qb.push("null");
        }
        FieldValue::Bool(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Int(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Float(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Text(v) => {
            qb.push_bind(v.clone());
        }
    }
}

/// 追加 `where ...`：租户谓词、软删除排除与字段谓词以 AND 组合
fn push_where<E: PgEntity>(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter<E>) {
    qb.push(" where true");
    push_conditions(qb, filter);
}

fn push_conditions<E: PgEntity>(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter<E>) {
    if let Some(tenant_id) = filter.tenant_id() {
        qb.push(format!(" and {} = ", TENANT_COLUMN));
        qb.push_bind(tenant_id.to_string());
    }
    if !filter.includes_deleted() {
        qb.push(format!(" and {} = false", DELETED_COLUMN));
    }
    for predicate in filter.predicates() {
        match predicate {
            Predicate::Eq(field, FieldValue::Null) => {
                qb.push(format!(" and {} is null", field.column()));
            }
            Predicate::Eq(field, value) => {
                qb.push(format!(" and {} = ", field.column()));
                push_value(qb, value);
            }
            Predicate::In(field, values) => {
                let values: Vec<&FieldValue> = values.iter().filter(|v| !v.is_null()).collect();
                if values.is_empty() {
                    qb.push(" and false");
                    continue;
                }
                qb.push(format!(" and {} in (", field.column()));
                for (index, value) in values.into_iter().enumerate() {
                    if index > 0 {
                        qb.push(", ");
                    }
                    push_value(qb, value);
                }
                qb.push(")");
            }
            Predicate::Exists(field, true) => {
                qb.push(format!(" and {} is not null", field.column()));
            }
            Predicate::Exists(field, false) => {
                qb.push(format!(" and {} is null", field.column()));
            }
            Predicate::Like(field, pattern) => {
                qb.push(format!(" and {} like ", field.column()));
                qb.push_bind(pattern.clone());
            }
        }
    }
}

fn push_order<E: PgEntity>(qb: &mut QueryBuilder<'_, Postgres>, sort: &Sort<E>) {
    qb.push(" order by ");
    for (field, order) in sort.keys() {
        let direction = match order {
            SortOrder::Asc => "asc nulls first",
            SortOrder::Desc => "desc nulls last",
        };
        qb.push(format!("{} {}, ", field.column(), direction));
    }
    qb.push(format!("{} asc", E::ID_FIELD.column()));
}

#[async_trait::async_trait]
impl<E: PgEntity> Repository<E> for PgRepository<E> {
    async fn insert(&self, ctx: &TenantContext, entity: E) -> Result<E, StorageError> {
        ensure_owned(ctx, &entity)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "insert into {} ({}) values (",
            E::TABLE,
            select_list::<E>()
        ));
        for (index, value) in entity.values().iter().enumerate() {
            if index > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(format!(") returning {}", select_list::<E>()));
        let row = qb.build().fetch_one(&self.pool).await?;
        E::from_row(&row)
    }

    async fn find(
        &self,
        filter: &Filter<E>,
        sort: &Sort<E>,
        limit: Option<u32>,
    ) -> Result<Vec<E>, StorageError> {
        ensure_readable(filter)?;
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("select {} from {}", select_list::<E>(), E::TABLE));
        push_where(&mut qb, filter);
        push_order(&mut qb, sort);
        if let Some(limit) = limit {
            qb.push(" limit ");
            qb.push_bind(i64::from(limit));
        }
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(E::from_row).collect()
    }

    async fn find_paged(
        &self,
        filter: &Filter<E>,
        sort: &Sort<E>,
        page: Page,
    ) -> Result<(Vec<E>, u64), StorageError> {
        let total = self.count(filter).await?;
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("select {} from {}", select_list::<E>(), E::TABLE));
        push_where(&mut qb, filter);
        push_order(&mut qb, sort);
        qb.push(" limit ");
        qb.push_bind(i64::from(page.size));
        qb.push(" offset ");
        qb.push_bind(page.offset() as i64);
        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(E::from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter<E>,
        update: &Update<E>,
    ) -> Result<Option<E>, StorageError> {
        ensure_scoped(filter)?;
        let id = E::ID_FIELD.column();
        let mut qb = QueryBuilder::<Postgres>::new(format!("update {} set ", E::TABLE));
        for (index, op) in update.ops().iter().enumerate() {
            if index > 0 {
                qb.push(", ");
            }
            match op {
                UpdateOp::Set(field, value) => {
                    qb.push(format!("{} = ", field.column()));
                    push_value(&mut qb, value);
                }
                UpdateOp::Inc(field, delta) => {
                    let column = field.column();
                    qb.push(format!("{} = coalesce({}, 0) + ", column, column));
                    qb.push_bind(*delta);
                }
                UpdateOp::Touch(field) => {
                    qb.push(format!("{} = {}", field.column(), NOW_MS_SQL));
                }
            }
        }
        // 子查询加行锁选出一条；外层重复过滤条件，锁等待后由数据库重新校验
        qb.push(format!(" where {} = (select {} from {}", id, id, E::TABLE));
        push_where(&mut qb, filter);
        qb.push(format!(" order by {} asc limit 1 for update)", id));
        push_conditions(&mut qb, filter);
        qb.push(format!(" returning {}", select_list::<E>()));
        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(E::from_row).transpose()
    }

    async fn count(&self, filter: &Filter<E>) -> Result<u64, StorageError> {
        ensure_readable(filter)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("select count(*) from {}", E::TABLE));
        push_where(&mut qb, filter);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }
}
