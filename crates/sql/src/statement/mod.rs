//! SELECT/INSERT/UPDATE/DELETE builders bound to a [`Session`].

mod delete;
mod insert;
mod raw;
mod select;
mod update;

pub use delete::Deleter;
pub use insert::{Inserter, UpsertBuilder};
pub use raw::{raw_query, RawQuerier};
pub use select::{SelectStatement, Selector};
pub(crate) use select::select_clauses;
pub use update::Updater;

use crate::accessor::{populate, Target};
use crate::entity::Entity;
use crate::session::{Core, Rows};
use crate::Result;

/// Stores the first row of `rows` into a fresh `T`.
pub(crate) fn decode_one<T: Entity>(core: &Core, mut rows: Rows) -> Result<T> {
    let accessor = core.accessor().accessor::<T>(core.model::<T>()?)?;
    let mut entity = T::default();
    populate(accessor.as_ref(), &mut rows, Target::One(&mut entity))?;
    Ok(entity)
}

pub(crate) fn decode_all<T: Entity>(core: &Core, mut rows: Rows) -> Result<Vec<T>> {
    let accessor = core.accessor().accessor::<T>(core.model::<T>()?)?;
    let mut out = Vec::new();
    populate(accessor.as_ref(), &mut rows, Target::Many(&mut out))?;
    Ok(out)
}
