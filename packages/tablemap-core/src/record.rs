//! Entity instances and their per-type property access.
//!
//! Every persisted type implements [`Record`] (object-safe, used by the
//! engine through `dyn Record`) and [`TableObject`] (static side used at
//! registration and for typed fetches).

use std::any::Any;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::map::EntityDefinition;
use crate::types::Value;

/// Names of the implicit properties every entity carries.
pub mod keys {
    pub const ID: &str = "id";
    pub const CREATED_TIME: &str = "createdTime";
    pub const MODIFIED_TIME: &str = "modifiedTime";
}

/// Bookkeeping state the engine maintains on every instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMeta {
    /// Row identifier, 0 until the first save
    pub id: i64,
    /// Set on first save
    pub created_time: Option<DateTime<Utc>>,
    /// Set on every save
    pub modified_time: Option<DateTime<Utc>>,
    /// Advisory flag managed by the caller
    pub dirty: bool,
}

impl RecordMeta {
    pub fn is_new(&self) -> bool {
        self.id == 0
    }
}

/// `Any` conversions for records, implemented for every sized type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Name-based property access for one persisted instance.
///
/// `value` returns `None` when the property is not readable on this type
/// and `Some(Value::Null)` when it is readable but unset. Object and
/// object-array properties go through the `related*` methods instead.
pub trait Record: AsAny + Send + fmt::Debug + 'static {
    /// Primary table of this instance's entity type.
    fn table_name(&self) -> &'static str;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Reads a scalar, scalar-array or binary property.
    fn value(&self, property: &str) -> Option<Value>;

    /// Writes a scalar, scalar-array or binary property.
    ///
    /// Returns false when the property is unknown or the value does not
    /// convert.
    fn set_value(&mut self, property: &str, value: Value) -> bool;

    /// Referenced instances of an object or object-array property.
    fn related(&self, _property: &str) -> Option<Vec<&dyn Record>> {
        None
    }

    fn related_mut(&mut self, _property: &str) -> Option<Vec<&mut dyn Record>> {
        None
    }

    /// Replaces the referenced instances of an object or object-array property.
    fn set_related(&mut self, _property: &str, _records: Vec<Box<dyn Record>>) -> bool {
        false
    }

    /// Runs before every save.
    fn pre_save(&mut self) {}

    /// Runs after every save.
    fn post_save(&mut self) {}
}

impl dyn Record {
    pub fn id(&self) -> i64 {
        self.meta().id
    }

    pub fn is_dirty(&self) -> bool {
        self.meta().dirty
    }

    pub fn make_dirty(&mut self, dirty: bool) {
        self.meta_mut().dirty = dirty;
    }

    /// Typed view of this record.
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        AsAny::as_any(self).downcast_ref::<T>()
    }
}

/// Static description of a persisted type.
pub trait TableObject: Record + Default + Sized {
    /// Primary table name.
    const TABLE: &'static str;

    /// Property declarations beyond the implicit id and timestamps.
    fn definition() -> EntityDefinition;
}

/// Converts a boxed record into `T`, if it is one.
pub fn downcast_record<T: Record>(record: Box<dyn Record>) -> Option<T> {
    AsAny::into_any(record).downcast::<T>().ok().map(|b| *b)
}

/// Boxed default instance, used as the per-type factory.
pub(crate) fn make_default<T: TableObject>() -> Box<dyn Record> {
    Box::new(T::default())
}

/// Factory signature stored in the registry.
pub(crate) type RecordFactory = fn() -> Box<dyn Record>;

/// Collects `records` into the shape expected by `Record::related`.
pub fn related_refs<'a, T: Record>(records: impl IntoIterator<Item = &'a T>) -> Vec<&'a dyn Record> {
    records.into_iter().map(|r| r as &dyn Record).collect()
}

/// Mutable counterpart of [`related_refs`].
pub fn related_muts<'a, T: Record>(
    records: impl IntoIterator<Item = &'a mut T>,
) -> Vec<&'a mut dyn Record> {
    records.into_iter().map(|r| r as &mut dyn Record).collect()
}

/// Downcasts every record to `T`, failing if any is another type.
pub fn collect_related<T: Record>(records: Vec<Box<dyn Record>>) -> Option<Vec<T>> {
    records.into_iter().map(downcast_record::<T>).collect()
}
