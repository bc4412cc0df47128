//! Generic Query / Pagination Engine
//!
//! 列表接口共用的过滤 + 计数 + 分页执行器。`Filter` 是可组合的布尔
//! 谓词树，渲染为参数化 WHERE 子句；`list` 先 COUNT 再取页。
//!
//! Count 与取页是同一连接池上的两条语句：并发写入下页边界可能比
//! count 反映更新的快照。这是接受的最终一致窗口，不是 bug。

use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite, SqlitePool};

use super::repository::RepoResult;

/// Bindable SQL scalar
#[derive(Debug, Clone)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

/// Composable filter predicate
///
/// 字段名由各 repository 以 `&'static str` 提供（列名白名单），
/// 动态输入只会出现在绑定值里。
#[derive(Debug, Clone)]
pub enum Filter {
    /// 恒真（无过滤条件）
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Eq(&'static str, SqlValue),
    /// 大小写不敏感子串匹配 (LIKE '%..%')
    Contains(&'static str, String),
    Ge(&'static str, SqlValue),
    Le(&'static str, SqlValue),
    Lt(&'static str, SqlValue),
}

impl Filter {
    /// 合并子条件为 AND；忽略 `All`，空集退化为 `All`
    pub fn and(filters: Vec<Filter>) -> Filter {
        let mut filters: Vec<Filter> = filters
            .into_iter()
            .filter(|f| !matches!(f, Filter::All))
            .collect();
        match filters.len() {
            0 => Filter::All,
            1 => filters.remove(0),
            _ => Filter::And(filters),
        }
    }

    /// 渲染为 WHERE 片段 + 绑定值
    pub fn to_where(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::new();
        let mut binds = Vec::new();
        self.render(&mut sql, &mut binds);
        (sql, binds)
    }

    fn render(&self, sql: &mut String, binds: &mut Vec<SqlValue>) {
        match self {
            Filter::All => sql.push_str("1 = 1"),
            Filter::And(fs) | Filter::Or(fs) => {
                let sep = if matches!(self, Filter::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                sql.push('(');
                for (i, f) in fs.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(sep);
                    }
                    f.render(sql, binds);
                }
                sql.push(')');
            }
            Filter::Eq(field, v) => {
                sql.push_str(field);
                sql.push_str(" = ?");
                binds.push(v.clone());
            }
            Filter::Contains(field, needle) => {
                sql.push_str(field);
                sql.push_str(" LIKE ? ESCAPE '\\'");
                binds.push(SqlValue::Text(format!("%{}%", escape_like(needle))));
            }
            Filter::Ge(field, v) => {
                sql.push_str(field);
                sql.push_str(" >= ?");
                binds.push(v.clone());
            }
            Filter::Le(field, v) => {
                sql.push_str(field);
                sql.push_str(" <= ?");
                binds.push(v.clone());
            }
            Filter::Lt(field, v) => {
                sql.push_str(field);
                sql.push_str(" < ?");
                binds.push(v.clone());
            }
        }
    }
}

/// LIKE 模式元字符转义，保证子串匹配语义
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Ordering direction
#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering key: column + direction
pub type OrderKey = (&'static str, Direction);

fn order_clause(order: &[OrderKey]) -> String {
    let mut parts: Vec<String> = order
        .iter()
        .map(|(field, dir)| {
            let dir = match dir {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            format!("{field} {dir}")
        })
        .collect();
    // 稳定分页：总是以 id 收尾打破平局
    parts.push("id ASC".to_string());
    parts.join(", ")
}

type SqliteQueryAs<'q, T> = sqlx::query::QueryAs<'q, Sqlite, T, SqliteArguments<'q>>;
type SqliteQueryScalar<'q, T> = sqlx::query::QueryScalar<'q, Sqlite, T, SqliteArguments<'q>>;

fn bind_as<'q, T>(q: SqliteQueryAs<'q, T>, v: &SqlValue) -> SqliteQueryAs<'q, T> {
    match v {
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Text(s) => q.bind(s.clone()),
        SqlValue::Bool(b) => q.bind(*b),
    }
}

fn bind_scalar<'q, T>(q: SqliteQueryScalar<'q, T>, v: &SqlValue) -> SqliteQueryScalar<'q, T> {
    match v {
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Text(s) => q.bind(s.clone()),
        SqlValue::Bool(b) => q.bind(*b),
    }
}

/// 满足过滤条件的总行数（与分页无关）
pub async fn count(pool: &SqlitePool, table: &str, filter: &Filter) -> RepoResult<i64> {
    let (where_sql, binds) = filter.to_where();
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {where_sql}");
    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    for b in &binds {
        q = bind_scalar(q, b);
    }
    Ok(q.fetch_one(pool).await?)
}

/// 通用分页查询：`(total, items)`
///
/// - `total` 为满足条件的总数，与 page/page_size 无关
/// - 页码从 1 起；越界页返回空列表，不报错
pub async fn list<T>(
    pool: &SqlitePool,
    table: &str,
    filter: &Filter,
    order: &[OrderKey],
    page: i64,
    page_size: i64,
) -> RepoResult<(i64, Vec<T>)>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let page = page.max(1);
    let page_size = page_size.max(1);

    let total = count(pool, table, filter).await?;

    let (where_sql, binds) = filter.to_where();
    let sql = format!(
        "SELECT * FROM {table} WHERE {where_sql} ORDER BY {} LIMIT ? OFFSET ?",
        order_clause(order)
    );
    let mut q = sqlx::query_as::<_, T>(&sql);
    for b in &binds {
        q = bind_as(q, b);
    }
    let items = q
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(pool)
        .await?;

    Ok((total, items))
}
