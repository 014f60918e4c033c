mod common;

use common::{FakeDb, text};
use sqlweave::{
    Column, Dialect, Field, Repository, Row, SqlResult, Table, TableMapper, WireValue,
};

struct FilmTable {
    table: Table,
    film_id: Field,
    title: Field,
    rental_rate: Field,
}

impl FilmTable {
    fn new() -> Self {
        let table = Table::named("film");
        Self {
            film_id: table.number("film_id"),
            title: table.string("title"),
            rental_rate: table.number("rental_rate"),
            table,
        }
    }
}

#[derive(Debug, PartialEq)]
struct Film {
    id: i64,
    title: String,
    rental_rate: f64,
}

struct NewFilm {
    title: &'static str,
    rental_rate: f64,
}

impl TableMapper for FilmTable {
    type Model = Film;
    type Input = NewFilm;

    fn table(&self) -> Table {
        self.table.clone()
    }

    fn map_columns(&self, column: &mut Column, input: &NewFilm) -> SqlResult<()> {
        column.set_string(&self.title, input.title)?;
        column.set_f64(&self.rental_rate, input.rental_rate)
    }

    fn map_row(&self, row: &mut Row) -> SqlResult<Film> {
        Ok(Film {
            id: row.int64(&self.film_id)?,
            title: row.string(&self.title)?,
            rental_rate: row.float64(&self.rental_rate)?,
        })
    }
}

fn repo(dialect: Dialect) -> Repository<FilmTable> {
    Repository::new(dialect, FilmTable::new())
}

#[tokio::test]
async fn test_insert_many() {
    let db = FakeDb::default();
    let films = repo(Dialect::Postgres);
    films
        .insert(
            &db,
            vec![
                NewFilm { title: "ACADEMY DINOSAUR", rental_rate: 0.99 },
                NewFilm { title: "ACE GOLDFINGER", rental_rate: 4.99 },
            ],
        )
        .await
        .unwrap();
    let stmt = &db.statements()[0];
    assert_eq!(
        stmt.sql,
        "INSERT INTO film (title, rental_rate) VALUES ($1, $2), ($3, $4)"
    );
    assert_eq!(
        stmt.args,
        [
            text("ACADEMY DINOSAUR"),
            WireValue::Float(0.99),
            text("ACE GOLDFINGER"),
            WireValue::Float(4.99),
        ]
    );
}

#[tokio::test]
async fn test_update_by_predicate() {
    let db = FakeDb::default();
    let films = repo(Dialect::MySql);
    let predicate = films.mapper().film_id.eq(1);
    films
        .update(&db, predicate, NewFilm { title: "ALIEN CENTER", rental_rate: 2.99 })
        .await
        .unwrap();
    assert_eq!(
        db.last_sql(),
        "UPDATE film SET film.title = ?, film.rental_rate = ? WHERE film.film_id = ?"
    );
}

#[tokio::test]
async fn test_delete_by_predicate() {
    let db = FakeDb::default();
    let films = repo(Dialect::SqlServer);
    let predicate = films.mapper().rental_rate.lt(1);
    films.delete(&db, predicate).await.unwrap();
    assert_eq!(db.last_sql(), "DELETE FROM film WHERE film.rental_rate < @p1");
}

#[tokio::test]
async fn test_one_and_all() {
    let db = FakeDb::with_rows(
        ["film_id", "title", "rental_rate"],
        vec![
            vec![WireValue::Int(1), text("ACADEMY DINOSAUR"), WireValue::Float(0.99)],
            vec![WireValue::Int(2), text("ACE GOLDFINGER"), text("4.99")],
        ],
    );
    let films = repo(Dialect::Sqlite);

    let one = films.one(&db, films.mapper().film_id.eq(1)).await.unwrap();
    assert_eq!(one.title, "ACADEMY DINOSAUR");
    assert_eq!(
        db.last_sql(),
        "SELECT film.film_id, film.title, film.rental_rate FROM film WHERE film.film_id = $1 LIMIT $2"
    );

    let all = films
        .all(&db, films.mapper().rental_rate.gt(0))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].rental_rate, 4.99);
    assert_eq!(
        db.last_sql(),
        "SELECT film.film_id, film.title, film.rental_rate FROM film WHERE film.rental_rate > $1"
    );
}
