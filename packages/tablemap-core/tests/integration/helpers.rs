//! Entity types and setup shared by the integration tests.

use chrono::{DateTime, Utc};
use tablemap_core::record::{collect_related, related_muts, related_refs};
use tablemap_core::types::assign;
use tablemap_core::{
    EntityDefinition, Manager, Record, RecordMeta, StorageKind, TableObject, Value,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// In-memory manager with every test type registered.
pub fn manager() -> Manager {
    init_tracing();
    let manager = Manager::in_memory().unwrap();
    manager.register::<Widget>().unwrap();
    manager.register::<Company>().unwrap();
    manager.register::<Person>().unwrap();
    manager.register::<Project>().unwrap();
    manager.register::<Reading>().unwrap();
    manager
}

pub fn widget(name: &str, tags: &[&str]) -> Widget {
    Widget {
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Widget {
    pub meta: RecordMeta,
    pub name: String,
    pub tags: Vec<String>,
}

impl Record for Widget {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn value(&self, property: &str) -> Option<Value> {
        match property {
            "name" => Some(self.name.clone().into()),
            "tags" => Some(self.tags.clone().into()),
            _ => None,
        }
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        match property {
            "name" => assign(&mut self.name, value),
            "tags" => assign(&mut self.tags, value),
            _ => false,
        }
    }
}

impl TableObject for Widget {
    const TABLE: &'static str = "Widget";

    fn definition() -> EntityDefinition {
        EntityDefinition::new()
            .property("name", StorageKind::String)
            .property("tags", StorageKind::StringArray)
    }
}

/// Later revision of [`Widget`] stored in the same table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WidgetV2 {
    pub meta: RecordMeta,
    pub name: String,
    pub tags: Vec<String>,
    pub priority: i64,
}

impl Record for WidgetV2 {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn value(&self, property: &str) -> Option<Value> {
        match property {
            "name" => Some(self.name.clone().into()),
            "tags" => Some(self.tags.clone().into()),
            "priority" => Some(self.priority.into()),
            _ => None,
        }
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        match property {
            "name" => assign(&mut self.name, value),
            "tags" => assign(&mut self.tags, value),
            "priority" => assign(&mut self.priority, value),
            _ => false,
        }
    }
}

impl TableObject for WidgetV2 {
    const TABLE: &'static str = "Widget";

    fn definition() -> EntityDefinition {
        EntityDefinition::new()
            .property("priority", StorageKind::Int)
            .include(Widget::definition())
    }
}

/// Trims its name before every save and counts completed saves.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Company {
    pub meta: RecordMeta,
    pub name: String,
    pub pre_saves: u32,
    pub post_saves: u32,
}

impl Company {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl Record for Company {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn value(&self, property: &str) -> Option<Value> {
        (property == "name").then(|| self.name.clone().into())
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        property == "name" && assign(&mut self.name, value)
    }

    fn pre_save(&mut self) {
        self.name = self.name.trim().to_string();
        self.pre_saves += 1;
    }

    fn post_save(&mut self) {
        self.post_saves += 1;
    }
}

impl TableObject for Company {
    const TABLE: &'static str = "Company";

    fn definition() -> EntityDefinition {
        EntityDefinition::new().property("name", StorageKind::String)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub meta: RecordMeta,
    pub name: String,
    pub age: i64,
    pub employer: Option<Company>,
    pub mentor: Option<Box<Person>>,
}

impl Person {
    pub fn named(name: &str, age: i64) -> Self {
        Self {
            name: name.to_string(),
            age,
            ..Default::default()
        }
    }
}

impl Record for Person {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn value(&self, property: &str) -> Option<Value> {
        match property {
            "name" => Some(self.name.clone().into()),
            "age" => Some(self.age.into()),
            _ => None,
        }
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        match property {
            "name" => assign(&mut self.name, value),
            "age" => assign(&mut self.age, value),
            _ => false,
        }
    }

    fn related(&self, property: &str) -> Option<Vec<&dyn Record>> {
        match property {
            "employer" => Some(related_refs(self.employer.iter())),
            "mentor" => Some(related_refs(self.mentor.as_deref())),
            _ => None,
        }
    }

    fn related_mut(&mut self, property: &str) -> Option<Vec<&mut dyn Record>> {
        match property {
            "employer" => Some(related_muts(self.employer.iter_mut())),
            "mentor" => Some(related_muts(self.mentor.as_deref_mut())),
            _ => None,
        }
    }

    fn set_related(&mut self, property: &str, records: Vec<Box<dyn Record>>) -> bool {
        match property {
            "employer" => match collect_related::<Company>(records) {
                Some(found) => {
                    self.employer = found.into_iter().next();
                    true
                }
                None => false,
            },
            "mentor" => match collect_related::<Person>(records) {
                Some(found) => {
                    self.mentor = found.into_iter().next().map(Box::new);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

impl TableObject for Person {
    const TABLE: &'static str = "Person";

    fn definition() -> EntityDefinition {
        EntityDefinition::new()
            .property("name", StorageKind::String)
            .property("age", StorageKind::Int)
            .property("employer", StorageKind::object::<Company>())
            .property("mentor", StorageKind::object::<Person>())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Project {
    pub meta: RecordMeta,
    pub title: String,
    pub members: Vec<Person>,
}

impl Record for Project {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn value(&self, property: &str) -> Option<Value> {
        (property == "title").then(|| self.title.clone().into())
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        property == "title" && assign(&mut self.title, value)
    }

    fn related(&self, property: &str) -> Option<Vec<&dyn Record>> {
        (property == "members").then(|| related_refs(&self.members))
    }

    fn related_mut(&mut self, property: &str) -> Option<Vec<&mut dyn Record>> {
        (property == "members").then(|| related_muts(&mut self.members))
    }

    fn set_related(&mut self, property: &str, records: Vec<Box<dyn Record>>) -> bool {
        if property != "members" {
            return false;
        }
        match collect_related::<Person>(records) {
            Some(members) => {
                self.members = members;
                true
            }
            None => false,
        }
    }
}

impl TableObject for Project {
    const TABLE: &'static str = "Project";

    fn definition() -> EntityDefinition {
        EntityDefinition::new()
            .property("title", StorageKind::String)
            .property("members", StorageKind::object_array::<Person>())
    }
}

/// Covers every scalar, array and binary kind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reading {
    pub meta: RecordMeta,
    pub label: String,
    pub active: bool,
    pub ratio: f64,
    pub taken_at: Option<DateTime<Utc>>,
    pub payload: Vec<u8>,
    pub samples: Vec<f64>,
    pub counts: Vec<i64>,
    pub flags: Vec<bool>,
    pub stamps: Vec<DateTime<Utc>>,
}

impl Record for Reading {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn value(&self, property: &str) -> Option<Value> {
        match property {
            "label" => Some(self.label.clone().into()),
            "active" => Some(self.active.into()),
            "ratio" => Some(self.ratio.into()),
            "takenAt" => Some(self.taken_at.into()),
            "payload" => Some(Value::Binary(self.payload.clone())),
            "samples" => Some(self.samples.clone().into()),
            "counts" => Some(self.counts.clone().into()),
            "flags" => Some(self.flags.clone().into()),
            "stamps" => Some(self.stamps.clone().into()),
            _ => None,
        }
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        match property {
            "label" => assign(&mut self.label, value),
            "active" => assign(&mut self.active, value),
            "ratio" => assign(&mut self.ratio, value),
            "takenAt" => assign(&mut self.taken_at, value),
            "payload" => assign(&mut self.payload, value),
            "samples" => assign(&mut self.samples, value),
            "counts" => assign(&mut self.counts, value),
            "flags" => assign(&mut self.flags, value),
            "stamps" => assign(&mut self.stamps, value),
            _ => false,
        }
    }
}

impl TableObject for Reading {
    const TABLE: &'static str = "Reading";

    fn definition() -> EntityDefinition {
        EntityDefinition::new()
            .property("label", StorageKind::String)
            .property("active", StorageKind::Bool)
            .property("ratio", StorageKind::Float)
            .property_with_column("takenAt", StorageKind::Date, "taken_at")
            .property("payload", StorageKind::Binary)
            .property("samples", StorageKind::FloatArray)
            .property("counts", StorageKind::IntArray)
            .property("flags", StorageKind::BoolArray)
            .property("stamps", StorageKind::DateArray)
    }
}
