use sqlweave::{
    Column, Cte, Dialect, Field, Output, PolicyTable, Predicate, Query, SqlError, SqlResult,
    SqlWriter, Table, UpdateQuery, Value, WireValue, and, expr,
};

fn actor(alias: &str) -> Table {
    Table::named("actor").alias(alias)
}

fn cte() -> Cte {
    Cte::new(
        "cte",
        Vec::<String>::new(),
        Dialect::Sqlite.queryf("SELECT 1", Vec::<Value>::new()),
    )
}

fn text(s: &str) -> WireValue {
    WireValue::Text(s.to_string())
}

#[track_caller]
fn assert_renders(query: &UpdateQuery, sql: &str, args: Vec<WireValue>) {
    let rendered = query.build().unwrap();
    assert_eq!(rendered.sql, sql);
    assert_eq!(rendered.args, args);
}

fn names(fields: &[Field]) -> Vec<&str> {
    fields.iter().map(Field::name).collect()
}

#[derive(Debug)]
struct Faulty;

impl SqlWriter for Faulty {
    fn write_sql(&self, _out: &mut Output) -> SqlResult<()> {
        Err(SqlError::render("faulty sql"))
    }
}

#[derive(Debug)]
struct PolicyStub {
    policy: Option<Predicate>,
    fail: bool,
}

impl SqlWriter for PolicyStub {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        out.push_str("policy_table_stub");
        Ok(())
    }
}

impl PolicyTable for PolicyStub {
    fn policy(&self, _dialect: Dialect) -> SqlResult<Option<Predicate>> {
        if self.fail {
            return Err(SqlError::render("faulty sql"));
        }
        Ok(self.policy.clone())
    }
}

fn policy(fail: bool) -> Table {
    Table::policy(PolicyStub {
        policy: Some(and([expr("1 = 1").into(), expr("2 = 2").into()])),
        fail,
    })
}

fn f(n: &str) -> Field {
    Field::from(expr(n))
}

fn three_columns(col: &mut Column) -> SqlResult<()> {
    col.set(&f("f1"), 1)?;
    col.set(&f("f2"), 2)?;
    col.set(&f("f3"), 3)
}

fn tbl() -> Table {
    Table::expr(expr("tbl"))
}

// ==================== SQLite / Postgres ====================

#[test]
fn test_returning_fields_are_fetchable() {
    for dialect in [Dialect::Sqlite, Dialect::Postgres] {
        let a = actor("a");
        let q = dialect
            .update(a.clone())
            .returning([a.string("first_name")])
            .set_dialect(Dialect::from_name("lorem ipsum"));
        assert_eq!(q.dialect(), Dialect::Generic);

        let q = q.set_dialect(dialect);
        assert_eq!(names(q.fetchable_fields()), ["first_name"]);

        let (q, ok) = q.set_fetchable_fields(vec![a.string("last_name")]);
        assert!(!ok, "field should not have been set");

        let (q, ok) = q.clear_returning().set_fetchable_fields(vec![a.string("last_name")]);
        assert!(ok, "field should have been set");
        assert_eq!(names(q.fetchable_fields()), ["last_name"]);
    }
}

#[test]
fn test_set_with_cte_and_returning() {
    for dialect in [Dialect::Sqlite, Dialect::Postgres] {
        let a = actor("a");
        let q = dialect
            .with([cte()])
            .update(a.clone())
            .set([
                a.string("first_name").set("bob"),
                a.string("last_name").set("the builder"),
            ])
            .where_([a.number("actor_id").eq(1), a.time("last_update").is_not_null()])
            .returning([a.number("actor_id")]);
        assert_renders(
            &q,
            "WITH cte AS (SELECT 1) UPDATE actor AS a SET first_name = $1, last_name = $2 \
             WHERE a.actor_id = $3 AND a.last_update IS NOT NULL RETURNING a.actor_id",
            vec![text("bob"), text("the builder"), WireValue::Int(1)],
        );
    }
}

#[test]
fn test_set_fn() {
    let a = actor("a");
    let (first, last) = (a.string("first_name"), a.string("last_name"));
    let q = Dialect::Postgres
        .with([cte()])
        .update(a.clone())
        .set_fn(move |col| {
            col.set_string(&first, "bob")?;
            col.set_string(&last, "the builder")
        })
        .where_([a.number("actor_id").eq(1)]);
    assert_renders(
        &q,
        "WITH cte AS (SELECT 1) UPDATE actor AS a SET first_name = $1, last_name = $2 \
         WHERE a.actor_id = $3",
        vec![text("bob"), text("the builder"), WireValue::Int(1)],
    );
}

#[test]
fn test_set_fn_matches_static_set() {
    for dialect in Dialect::ALL {
        let a = actor("a");
        let (first, last) = (a.string("first_name"), a.string("last_name"));
        let predicates = [a.number("actor_id").eq(1), a.time("last_update").is_not_null()];

        let fixed = dialect
            .update(a.clone())
            .set([first.set("bob"), last.set("the builder")])
            .where_(predicates.clone())
            .build()
            .unwrap();
        let mapped = dialect
            .update(a.clone())
            .set_fn(move |col| {
                col.set_string(&first, "bob")?;
                col.set_string(&last, "the builder")
            })
            .where_(predicates)
            .build()
            .unwrap();

        assert_eq!(mapped.sql, fixed.sql, "{dialect}");
        assert_eq!(mapped.args, fixed.args, "{dialect}");
        assert_eq!(
            mapped.args,
            [text("bob"), text("the builder"), WireValue::Int(1)],
            "{dialect}"
        );
    }
}

#[test]
fn test_update_with_join() {
    let a = actor("a");
    let id = a.number("actor_id");
    let q = Dialect::Postgres
        .update(a.clone())
        .set([
            a.string("first_name").set("bob"),
            a.string("last_name").set("the builder"),
        ])
        .from(a.clone())
        .join(a.clone(), id.eq(&id))
        .left_join(a.clone(), id.eq(&id))
        .full_join(a.clone(), id.eq(&id))
        .cross_join(a.clone())
        .custom_join(",", a.clone())
        .join_using(a.clone(), [a.string("first_name"), a.string("last_name")])
        .where_([id.eq(1)]);
    assert_renders(
        &q,
        "UPDATE actor AS a SET first_name = $1, last_name = $2 \
         FROM actor AS a \
         JOIN actor AS a ON a.actor_id = a.actor_id \
         LEFT JOIN actor AS a ON a.actor_id = a.actor_id \
         FULL JOIN actor AS a ON a.actor_id = a.actor_id \
         CROSS JOIN actor AS a \
         , actor AS a \
         JOIN actor AS a USING (first_name, last_name) \
         WHERE a.actor_id = $3",
        vec![text("bob"), text("the builder"), WireValue::Int(1)],
    );
}

// ==================== MySQL ====================

#[test]
fn test_mysql_has_no_fetchable_fields() {
    let a = actor("a");
    let q = Dialect::MySql.update(a.clone());
    assert!(q.fetchable_fields().is_empty());
    let (q, ok) = q.set_fetchable_fields(vec![a.string("last_name")]);
    assert!(!ok);
    assert!(q.fetchable_fields().is_empty());
}

#[test]
fn test_mysql_qualifies_set_columns() {
    let a = actor("a");
    let q = Dialect::MySql
        .with([cte()])
        .update(a.clone())
        .set([
            a.string("first_name").set("bob"),
            a.string("last_name").set("the builder"),
        ])
        .where_([a.number("actor_id").eq(1)]);
    assert_renders(
        &q,
        "WITH cte AS (SELECT 1) UPDATE actor AS a SET a.first_name = ?, a.last_name = ? \
         WHERE a.actor_id = ?",
        vec![text("bob"), text("the builder"), WireValue::Int(1)],
    );
}

#[test]
fn test_mysql_joins_order_by_limit() {
    let a = actor("a");
    let id = a.number("actor_id");
    let q = Dialect::MySql
        .update(a.clone())
        .join(a.clone(), id.eq(&id))
        .left_join(a.clone(), id.eq(&id))
        .full_join(a.clone(), id.eq(&id))
        .cross_join(a.clone())
        .custom_join(",", a.clone())
        .join_using(a.clone(), [a.string("first_name"), a.string("last_name")])
        .set([
            a.string("first_name").set("bob"),
            a.string("last_name").set("the builder"),
        ])
        .where_([id.eq(1)])
        .order_by([id.clone()])
        .limit(5);
    assert_renders(
        &q,
        "UPDATE actor AS a \
         JOIN actor AS a ON a.actor_id = a.actor_id \
         LEFT JOIN actor AS a ON a.actor_id = a.actor_id \
         FULL JOIN actor AS a ON a.actor_id = a.actor_id \
         CROSS JOIN actor AS a \
         , actor AS a \
         JOIN actor AS a USING (first_name, last_name) \
         SET a.first_name = ?, a.last_name = ? \
         WHERE a.actor_id = ? \
         ORDER BY a.actor_id \
         LIMIT ?",
        vec![text("bob"), text("the builder"), WireValue::Int(1), WireValue::Int(5)],
    );
}

// ==================== SQL Server ====================

#[test]
fn test_sqlserver_set() {
    let a = Table::named("actor");
    let q = Dialect::SqlServer
        .with([cte()])
        .update(a.clone())
        .set([
            a.string("first_name").set("bob"),
            a.string("last_name").set("the builder"),
        ])
        .where_([a.number("actor_id").eq(1)]);
    assert!(q.fetchable_fields().is_empty());
    assert_renders(
        &q,
        "WITH cte AS (SELECT 1) UPDATE actor SET first_name = @p1, last_name = @p2 \
         WHERE actor.actor_id = @p3",
        vec![text("bob"), text("the builder"), WireValue::Int(1)],
    );
}

#[test]
fn test_sqlserver_from_and_joins() {
    let a = Table::named("actor");
    let id = a.number("actor_id");
    let q = Dialect::SqlServer
        .update(a.clone())
        .set([
            a.string("first_name").set("bob"),
            a.string("last_name").set("the builder"),
        ])
        .from(a.clone())
        .join(a.clone(), id.eq(&id))
        .left_join(a.clone(), id.eq(&id))
        .full_join(a.clone(), id.eq(&id))
        .cross_join(a.clone())
        .custom_join(",", a.clone())
        .where_([id.eq(1)]);
    assert_renders(
        &q,
        "UPDATE actor SET first_name = @p1, last_name = @p2 \
         FROM actor \
         JOIN actor ON actor.actor_id = actor.actor_id \
         LEFT JOIN actor ON actor.actor_id = actor.actor_id \
         FULL JOIN actor ON actor.actor_id = actor.actor_id \
         CROSS JOIN actor \
         , actor \
         WHERE actor.actor_id = @p3",
        vec![text("bob"), text("the builder"), WireValue::Int(1)],
    );
}

// ==================== Policies and failures ====================

#[test]
fn test_policy_predicate_comes_first() {
    let q = Dialect::Generic
        .update(policy(false))
        .set_fn(three_columns)
        .where_([expr("3 = 3").into()]);
    assert_renders(
        &q,
        "UPDATE policy_table_stub SET f1 = ?, f2 = ?, f3 = ? WHERE (1 = 1 AND 2 = 2) AND 3 = 3",
        vec![WireValue::Int(1), WireValue::Int(2), WireValue::Int(3)],
    );
}

#[test]
fn test_static_assignments_win_over_mapper() {
    let q = Dialect::Generic
        .update(tbl())
        .set([f("f9").set(9)])
        .set_fn(three_columns);
    assert_renders(&q, "UPDATE tbl SET f9 = ?", vec![WireValue::Int(9)]);
}

#[test]
fn test_invalid_statements() {
    let cases: Vec<(&str, UpdateQuery, fn(&SqlError) -> bool)> = vec![
        (
            "missing table",
            UpdateQuery::new(Dialect::Generic).set_fn(three_columns),
            SqlError::is_invalid_statement,
        ),
        (
            "no assignments",
            Dialect::Generic.update(tbl()),
            SqlError::is_invalid_statement,
        ),
        (
            "mapper sets nothing",
            Dialect::Generic.update(tbl()).set_fn(|_| Ok(())),
            SqlError::is_invalid_statement,
        ),
        (
            "mysql has no UPDATE ... FROM",
            Dialect::MySql.update(tbl()).from(tbl()).set_fn(three_columns),
            SqlError::is_unsupported,
        ),
        (
            "join without from",
            Dialect::Postgres
                .update(tbl())
                .join(tbl(), expr("1 = 1"))
                .set_fn(three_columns),
            SqlError::is_unsupported,
        ),
        (
            "postgres has no ORDER BY on UPDATE",
            Dialect::Postgres
                .update(tbl())
                .set_fn(three_columns)
                .order_by([f("f1")]),
            SqlError::is_unsupported,
        ),
        (
            "postgres has no LIMIT on UPDATE",
            Dialect::Postgres.update(tbl()).set_fn(three_columns).limit(5),
            SqlError::is_unsupported,
        ),
        (
            "mysql has no RETURNING",
            Dialect::MySql
                .update(tbl())
                .set_fn(three_columns)
                .returning([f("f1"), f("f2"), f("f3")]),
            SqlError::is_unsupported,
        ),
    ];
    for (description, query, is_expected) in cases {
        let err = query.build().unwrap_err();
        assert!(is_expected(&err), "{description}: unexpected {err:?}");
    }
}

#[test]
fn test_errors_propagate_from_every_clause() {
    let faulty = || Value::sql(Faulty);
    let cases: Vec<(&str, UpdateQuery)> = vec![
        (
            "column mapper",
            Dialect::Generic
                .update(tbl())
                .set_fn(|_| Err(SqlError::render("faulty sql"))),
        ),
        (
            "update table policy",
            Dialect::Generic.update(policy(true)).set_fn(three_columns),
        ),
        (
            "from table policy",
            Dialect::Generic
                .update(tbl())
                .from(policy(true))
                .set_fn(three_columns),
        ),
        (
            "join table policy",
            Dialect::Generic
                .update(tbl())
                .from(tbl())
                .join(policy(true), expr("1 = 1"))
                .set_fn(three_columns),
        ),
        (
            "cte",
            Dialect::Generic
                .with([Cte::new(
                    "cte",
                    Vec::<String>::new(),
                    Dialect::Generic.queryf("SELECT {}", [faulty()]),
                )])
                .update(tbl())
                .set_fn(three_columns),
        ),
        (
            "update table",
            Dialect::Generic
                .update(Table::derived(Faulty, "t"))
                .set_fn(three_columns),
        ),
        (
            "assignment",
            Dialect::Postgres.update(tbl()).set([f("f1").set(faulty())]),
        ),
        (
            "mysql assignment",
            Dialect::MySql.update(tbl()).set([f("f1").set(faulty())]),
        ),
        (
            "from table",
            Dialect::Postgres
                .update(tbl())
                .from(Table::derived(Faulty, "t"))
                .set_fn(three_columns),
        ),
        (
            "join table",
            Dialect::Postgres
                .update(tbl())
                .from(tbl())
                .join(Table::derived(Faulty, "t"), expr("1 = 1"))
                .set_fn(three_columns),
        ),
        (
            "where group",
            Dialect::Generic
                .update(tbl())
                .set_fn(three_columns)
                .where_([and([Predicate::from(sqlweave::exprf("{}", [faulty()]))])]),
        ),
        (
            "order by",
            Dialect::MySql
                .update(tbl())
                .set_fn(three_columns)
                .order_by([Field::from(sqlweave::exprf("{}", [faulty()]))]),
        ),
        (
            "limit",
            Dialect::MySql
                .update(tbl())
                .set_fn(three_columns)
                .order_by([f("f1")])
                .limit(faulty()),
        ),
        (
            "returning",
            Dialect::Postgres
                .update(tbl())
                .set_fn(three_columns)
                .returning([Field::from(sqlweave::exprf("{}", [faulty()]))]),
        ),
    ];
    for (description, query) in cases {
        let err = query.build().unwrap_err();
        assert!(err.is_render(), "{description}: unexpected {err:?}");
        let message = err.to_string();
        assert!(message.contains("UPDATE: "), "{description}: {message}");
        assert!(message.contains("faulty sql"), "{description}: {message}");
    }
}
