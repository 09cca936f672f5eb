use std::fmt;

use crate::record::TableObject;

/// Physical column type names used in generated DDL.
pub mod type_names {
    pub const BOOL: &str = "Boolean";
    pub const INT: &str = "Integer";
    pub const FLOAT: &str = "Real";
    pub const TEXT: &str = "Text";
    pub const BLOB: &str = "BLOB";
}

/// Reference to a registered entity type by table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub table: &'static str,
}

impl EntityRef {
    pub const fn new(table: &'static str) -> Self {
        Self { table }
    }

    pub fn of<T: TableObject>() -> Self {
        Self { table: T::TABLE }
    }
}

/// Persistable value shape of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Bool,
    Int,
    Float,
    String,
    Date,
    Binary,
    BoolArray,
    IntArray,
    FloatArray,
    StringArray,
    DateArray,
    /// Single reference to another entity, stored as its row id
    Object(EntityRef),
    /// Ordered references to other entities, stored as row ids
    ObjectArray(EntityRef),
}

impl StorageKind {
    /// Single object reference to `T`.
    pub fn object<T: TableObject>() -> Self {
        StorageKind::Object(EntityRef::of::<T>())
    }

    /// Array of object references to `T`.
    pub fn object_array<T: TableObject>() -> Self {
        StorageKind::ObjectArray(EntityRef::of::<T>())
    }

    /// Column type for an inline column on the primary table.
    ///
    /// Empty for every kind that lives in a join table.
    pub fn column_type(&self) -> &'static str {
        match self {
            StorageKind::Bool => type_names::BOOL,
            StorageKind::Int => type_names::INT,
            // dates are epoch offsets
            StorageKind::Float | StorageKind::Date => type_names::FLOAT,
            StorageKind::String => type_names::TEXT,
            _ => "",
        }
    }

    /// Column type of the element column in this kind's join table.
    pub fn join_element_type(&self) -> &'static str {
        match self {
            StorageKind::BoolArray => StorageKind::Bool.column_type(),
            StorageKind::IntArray => StorageKind::Int.column_type(),
            StorageKind::FloatArray | StorageKind::DateArray => StorageKind::Float.column_type(),
            StorageKind::StringArray => StorageKind::String.column_type(),
            StorageKind::Binary => type_names::BLOB,
            StorageKind::Object(_) | StorageKind::ObjectArray(_) => type_names::INT,
            scalar => scalar.column_type(),
        }
    }

    /// True for arrays, binary values and object references.
    pub fn requires_join_table(&self) -> bool {
        !matches!(
            self,
            StorageKind::Bool
                | StorageKind::Int
                | StorageKind::Float
                | StorageKind::String
                | StorageKind::Date
        )
    }

    /// True when a property of this kind holds many values.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            StorageKind::BoolArray
                | StorageKind::IntArray
                | StorageKind::FloatArray
                | StorageKind::StringArray
                | StorageKind::DateArray
                | StorageKind::ObjectArray(_)
        )
    }

    /// Referenced entity type for object kinds.
    pub fn entity_ref(&self) -> Option<EntityRef> {
        match self {
            StorageKind::Object(r) | StorageKind::ObjectArray(r) => Some(*r),
            _ => None,
        }
    }

    /// Scalar kind of a single stored element.
    ///
    /// Object kinds map to `Int` since references are stored as row ids.
    pub fn element_kind(&self) -> StorageKind {
        match self {
            StorageKind::BoolArray => StorageKind::Bool,
            StorageKind::IntArray => StorageKind::Int,
            StorageKind::FloatArray => StorageKind::Float,
            StorageKind::StringArray => StorageKind::String,
            StorageKind::DateArray => StorageKind::Date,
            StorageKind::Object(_) | StorageKind::ObjectArray(_) => StorageKind::Int,
            other => other.clone(),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Bool => write!(f, "bool"),
            StorageKind::Int => write!(f, "int"),
            StorageKind::Float => write!(f, "float"),
            StorageKind::String => write!(f, "string"),
            StorageKind::Date => write!(f, "date"),
            StorageKind::Binary => write!(f, "binary"),
            StorageKind::BoolArray => write!(f, "boolArray"),
            StorageKind::IntArray => write!(f, "intArray"),
            StorageKind::FloatArray => write!(f, "floatArray"),
            StorageKind::StringArray => write!(f, "stringArray"),
            StorageKind::DateArray => write!(f, "dateArray"),
            StorageKind::Object(r) => write!(f, "object({})", r.table),
            StorageKind::ObjectArray(r) => write!(f, "objectArray({})", r.table),
        }
    }
}
