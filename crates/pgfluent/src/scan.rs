//! Result materialization.
//!
//! A [`Destination`] declares its [`Shape`] up front; the shape drives both the
//! projection the compiler emits and how many rows are consumed:
//!
//! | destination                 | shape                         | rows read  |
//! |-----------------------------|-------------------------------|------------|
//! | `Scalar(&mut T)`            | `Scalar`                      | first only |
//! | `(&mut A, &mut B, ..)`      | `Columns(n)`                  | first only |
//! | `Record(&mut M)`            | `Record`                      | first only |
//! | `Records(&mut Vec<M>)`      | `Sequence(Element::Record)`   | all        |
//! | `Scalars(&mut Vec<T>)`      | `Sequence(Element::Scalar)`   | all        |
//!
//! Single-row destinations report [`OrmError::NotFound`] on an empty result
//! and are left untouched. Sequence destinations are appended to, never
//! cleared.

use crate::driver::RowCursor;
use crate::error::{OrmError, OrmResult};
use crate::model::{Model, TableDesc};
use crate::row::DbRow;
use tokio_postgres::types::FromSql;

/// Element type of a sequence destination.
#[derive(Debug, Clone, Copy)]
pub enum Element {
    Scalar,
    Record(&'static TableDesc),
    /// Boxed records: recognized so it can be rejected.
    Boxed,
}

/// What a destination expects to receive.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Scalar,
    Columns(usize),
    Record(&'static TableDesc),
    Sequence(Element),
}

impl Shape {
    /// Reject shapes that can never be filled.
    pub fn validate(&self) -> OrmResult<()> {
        match self {
            Shape::Columns(0) => Err(OrmError::usage("scan needs at least one destination")),
            Shape::Sequence(Element::Boxed) => Err(OrmError::usage(
                "sequences of boxed records are not supported; use Records(&mut Vec<M>)",
            )),
            _ => Ok(()),
        }
    }

    /// Whether only the first row is consumed.
    pub fn is_single_row(&self) -> bool {
        !matches!(self, Shape::Sequence(_))
    }

    /// The model whose columns make up the projection, if any.
    pub fn record(&self) -> Option<&'static TableDesc> {
        match self {
            Shape::Record(desc) | Shape::Sequence(Element::Record(desc)) => Some(desc),
            _ => None,
        }
    }
}

/// Somewhere to put result rows.
pub trait Destination: Send {
    fn shape(&self) -> Shape;

    /// Take one row. Must leave `self` unchanged when decoding fails.
    fn accept<R: DbRow>(&mut self, row: &R) -> OrmResult<()>;
}

/// One value from the first column of the first row.
#[derive(Debug)]
pub struct Scalar<'a, T>(pub &'a mut T);

/// One record from the first row.
#[derive(Debug)]
pub struct Record<'a, M>(pub &'a mut M);

/// Every row, appended as records.
#[derive(Debug)]
pub struct Records<'a, M>(pub &'a mut Vec<M>);

/// The first column of every row, appended.
#[derive(Debug)]
pub struct Scalars<'a, T>(pub &'a mut Vec<T>);

/// Boxed records. Always rejected by [`Db::scan`](crate::Db::scan).
#[derive(Debug)]
pub struct BoxedRecords<'a, M>(pub &'a mut Vec<Box<M>>);

impl<T> Destination for Scalar<'_, T>
where
    T: for<'r> FromSql<'r> + Send,
{
    fn shape(&self) -> Shape {
        Shape::Scalar
    }

    fn accept<R: DbRow>(&mut self, row: &R) -> OrmResult<()> {
        *self.0 = row.get_at(0)?;
        Ok(())
    }
}

impl<M> Destination for Record<'_, M>
where
    M: Model + Clone,
{
    fn shape(&self) -> Shape {
        Shape::Record(M::describe())
    }

    fn accept<R: DbRow>(&mut self, row: &R) -> OrmResult<()> {
        let mut staged = self.0.clone();
        let mut index = 0;
        staged.read_row(row, &mut index)?;
        *self.0 = staged;
        Ok(())
    }
}

impl<M> Destination for Records<'_, M>
where
    M: Model + Default,
{
    fn shape(&self) -> Shape {
        Shape::Sequence(Element::Record(M::describe()))
    }

    fn accept<R: DbRow>(&mut self, row: &R) -> OrmResult<()> {
        let mut record = M::default();
        let mut index = 0;
        record.read_row(row, &mut index)?;
        self.0.push(record);
        Ok(())
    }
}

impl<T> Destination for Scalars<'_, T>
where
    T: for<'r> FromSql<'r> + Send,
{
    fn shape(&self) -> Shape {
        Shape::Sequence(Element::Scalar)
    }

    fn accept<R: DbRow>(&mut self, row: &R) -> OrmResult<()> {
        self.0.push(row.get_at(0)?);
        Ok(())
    }
}

impl<M> Destination for BoxedRecords<'_, M>
where
    M: Model,
{
    fn shape(&self) -> Shape {
        Shape::Sequence(Element::Boxed)
    }

    fn accept<R: DbRow>(&mut self, _row: &R) -> OrmResult<()> {
        Err(OrmError::usage(
            "sequences of boxed records are not supported; use Records(&mut Vec<M>)",
        ))
    }
}

impl Destination for () {
    fn shape(&self) -> Shape {
        Shape::Columns(0)
    }

    fn accept<R: DbRow>(&mut self, _row: &R) -> OrmResult<()> {
        Err(OrmError::usage("scan needs at least one destination"))
    }
}

macro_rules! impl_tuple_destination {
    ($n:expr; $($T:ident $idx:tt),+) => {
        impl<$($T),+> Destination for ($(&mut $T,)+)
        where
            $($T: for<'r> FromSql<'r> + Send,)+
        {
            fn shape(&self) -> Shape {
                Shape::Columns($n)
            }

            fn accept<R: DbRow>(&mut self, row: &R) -> OrmResult<()> {
                let decoded = ($(row.get_at::<$T>($idx)?,)+);
                $(*self.$idx = decoded.$idx;)+
                Ok(())
            }
        }
    };
}

impl_tuple_destination!(1; A 0);
impl_tuple_destination!(2; A 0, B 1);
impl_tuple_destination!(3; A 0, B 1, C 2);
impl_tuple_destination!(4; A 0, B 1, C 2, D 3);
impl_tuple_destination!(5; A 0, B 1, C 2, D 3, E 4);
impl_tuple_destination!(6; A 0, B 1, C 2, D 3, E 4, F 5);
impl_tuple_destination!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_tuple_destination!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

/// Drain `cursor` into `dest` according to its shape.
///
/// Returns the number of rows consumed. The cursor is dropped (and its
/// result set released) before returning, on success and on error.
pub async fn materialize<Cur, D>(mut cursor: Cur, dest: &mut D) -> OrmResult<usize>
where
    Cur: RowCursor,
    D: Destination,
{
    let shape = dest.shape();
    shape.validate()?;

    if shape.is_single_row() {
        return match cursor.next_row().await? {
            Some(row) => {
                dest.accept(&row)?;
                Ok(1)
            }
            None => Err(OrmError::not_found("query returned no rows")),
        };
    }

    let mut n = 0;
    while let Some(row) = cursor.next_row().await? {
        dest.accept(&row)?;
        n += 1;
    }
    Ok(n)
}
