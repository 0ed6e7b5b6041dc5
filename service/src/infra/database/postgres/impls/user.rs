//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `users` table selected for a [`User`].
const COLUMNS: &str = "\
    id, email, \
    first_name, last_name, \
    role, password_hash, avatar, \
    created_at, updated_at";

/// Decodes a [`User`] out of the provided [`Row`].
fn decode(row: &Row) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role: row.get("role"),
        password_hash: row.get("password_hash"),
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<User>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE id = $1::UUID \
             LIMIT 1",
        );
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(decode))
    }
}

impl<C> Database<Select<By<Option<User>, user::Email>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE email = $1::VARCHAR \
             LIMIT 1",
        );
        self.query_opt(&sql, &[&email])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(decode))
    }
}

impl<C> Database<Insert<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            email,
            first_name,
            last_name,
            role,
            password_hash,
            avatar,
            created_at,
            updated_at,
        } = user;

        // No upsert: a duplicate `email` must surface the
        // `users_email_key` unique violation.
        const SQL: &str = "\
            INSERT INTO users (\
                id, email, \
                first_name, last_name, \
                role, password_hash, avatar, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, \
                $3::VARCHAR, $4::VARCHAR, \
                $5::INT2, $6::VARCHAR, $7::VARCHAR, \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &email,
                &first_name,
                &last_name,
                &role,
                &password_hash,
                &avatar,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            email,
            first_name,
            last_name,
            role,
            password_hash,
            avatar,
            created_at: _,
            updated_at,
        } = user;

        const SQL: &str = "\
            UPDATE users \
            SET email = $2::VARCHAR, \
                first_name = $3::VARCHAR, \
                last_name = $4::VARCHAR, \
                role = $5::INT2, \
                password_hash = $6::VARCHAR, \
                avatar = $7::VARCHAR, \
                updated_at = $8::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &id,
                &email,
                &first_name,
                &last_name,
                &role,
                &password_hash,
                &avatar,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Delete<By<User, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM users \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id]).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Lock<By<User, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO users_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::user::list::Page, read::user::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::user::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::user::list::Page, read::user::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::user::list::Selector { arguments } = by.into_inner();

        // One row past the page detects whether more rows exist.
        let limit = i64::try_from(arguments.limit()).unwrap_or(i64::MAX) + 1;
        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             ORDER BY created_at, id \
             LIMIT $1::INT8 OFFSET $2::INT8",
        );
        let rows = self
            .query(&sql, &[&limit, &offset])
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        Ok(read::user::list::Page::new(
            &arguments,
            rows.iter().take(arguments.limit()).map(decode),
            has_more,
        ))
    }
}

impl<C> Database<Select<By<read::user::list::TotalCount, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::user::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<read::user::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM users";
        self.query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}
