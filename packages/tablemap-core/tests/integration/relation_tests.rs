//! Object and object-array properties.

use tablemap_core::{Manager, ManagerConfig, OrmError, TableObject};

use super::helpers::{init_tracing, manager, Company, Person, Project};

#[test]
fn test_unsaved_references_saved_first() {
    let manager = manager();
    let mut alice = Person::named("Alice", 34);
    alice.employer = Some(Company::named("Acme"));

    manager.save(&mut alice).unwrap();

    let employer = alice.employer.as_ref().unwrap();
    assert!(employer.meta.id > 0);
    assert_eq!(employer.post_saves, 1);
    assert_eq!(manager.count_for_table(Company::TABLE).unwrap(), 1);

    let fetched: Person = manager.fetch_by_id(alice.meta.id).unwrap().unwrap();
    assert_eq!(fetched.name, "Alice");
    assert_eq!(fetched.employer.unwrap().name, "Acme");
    assert!(fetched.mentor.is_none());
}

#[test]
fn test_saved_references_are_not_resaved() {
    let manager = manager();
    let mut acme = Company::named("Acme");
    manager.save(&mut acme).unwrap();

    let mut bob = Person::named("Bob", 40);
    bob.employer = Some(acme.clone());
    manager.save(&mut bob).unwrap();

    assert_eq!(bob.employer.as_ref().unwrap().post_saves, 1);
    assert_eq!(manager.count_for_table(Company::TABLE).unwrap(), 1);
}

#[test]
fn test_object_array_preserves_order() {
    let manager = manager();
    let mut project = Project {
        title: "Launch".to_string(),
        members: vec![
            Person::named("Zed", 20),
            Person::named("Amy", 30),
            Person::named("Kim", 25),
        ],
        ..Default::default()
    };
    manager.save(&mut project).unwrap();
    assert!(project.members.iter().all(|m| m.meta.id > 0));

    let fetched: Project = manager.fetch_by_id(project.meta.id).unwrap().unwrap();
    let names: Vec<&str> = fetched.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Zed", "Amy", "Kim"]);
}

#[test]
fn test_updating_references_replaces_join_rows() {
    let manager = manager();
    let mut project = Project {
        title: "Launch".to_string(),
        members: vec![Person::named("Zed", 20), Person::named("Amy", 30)],
        ..Default::default()
    };
    manager.save(&mut project).unwrap();

    project.members.remove(0);
    project.members.push(Person::named("Lee", 50));
    manager.save(&mut project).unwrap();

    let fetched: Project = manager.fetch_by_id(project.meta.id).unwrap().unwrap();
    let names: Vec<&str> = fetched.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Amy", "Lee"]);
    assert_eq!(manager.count_for_table("Project_members").unwrap(), 2);
    // people are not deleted with the reference
    assert_eq!(manager.count_for_table(Person::TABLE).unwrap(), 3);
}

#[test]
fn test_cyclic_references_terminate() {
    let manager = manager();
    let mut ann = Person::named("Ann", 50);
    ann.mentor = Some(Box::new(Person::named("Ben", 60)));
    manager.save(&mut ann).unwrap();
    let ben_id = ann.mentor.as_ref().unwrap().meta.id;

    // close the loop: Ben's mentor is Ann
    manager
        .execute_sql(&format!(
            "INSERT INTO Person_mentor (Person_ID, mentor) VALUES ({}, {})",
            ben_id, ann.meta.id
        ))
        .unwrap();

    let fetched: Person = manager.fetch_by_id(ann.meta.id).unwrap().unwrap();
    let mentor = fetched.mentor.unwrap();
    assert_eq!(mentor.name, "Ben");
    assert!(mentor.mentor.is_none());

    let everyone = manager.all_instances::<Person>().unwrap();
    assert_eq!(everyone.len(), 2);
}

#[test]
fn test_relation_depth_limit_on_read() {
    init_tracing();
    let config = ManagerConfig {
        max_relation_depth: 1,
        ..ManagerConfig::in_memory()
    };
    let manager = Manager::open(config).unwrap();
    manager.register::<Company>().unwrap();
    manager.register::<Person>().unwrap();

    // each save stays within the write limit; the stored chain is two deep
    let mut eve = Person::named("Eve", 50);
    manager.save(&mut eve).unwrap();
    let mut dora = Person::named("Dora", 40);
    dora.mentor = Some(Box::new(eve));
    manager.save(&mut dora).unwrap();
    let mut carl = Person::named("Carl", 30);
    carl.mentor = Some(Box::new(dora));
    manager.save(&mut carl).unwrap();
    assert_eq!(manager.count_for_table(Person::TABLE).unwrap(), 3);

    let fetched: Person = manager.fetch_by_id(carl.meta.id).unwrap().unwrap();
    let mentor = fetched.mentor.unwrap();
    assert_eq!(mentor.name, "Dora");
    // one level is followed, the next is left unset
    assert!(mentor.mentor.is_none());
}

#[test]
fn test_relation_depth_limit_on_write() {
    init_tracing();
    let config = ManagerConfig {
        max_relation_depth: 1,
        ..ManagerConfig::in_memory()
    };
    let manager = Manager::open(config).unwrap();
    manager.register::<Company>().unwrap();
    manager.register::<Person>().unwrap();

    let mut top = Person::named("Top", 1);
    let mut middle = Person::named("Middle", 2);
    middle.mentor = Some(Box::new(Person::named("Bottom", 3)));
    top.mentor = Some(Box::new(middle));

    let result = manager.save(&mut top);
    assert!(matches!(result, Err(OrmError::DepthLimit { limit: 1, .. })));
    assert_eq!(top.meta.id, 0);
    assert_eq!(manager.count_for_table(Person::TABLE).unwrap(), 0);
}

#[test]
fn test_failed_nested_save_leaves_nothing_behind() {
    init_tracing();
    let config = ManagerConfig {
        max_relation_depth: 1,
        ..ManagerConfig::in_memory()
    };
    let manager = Manager::open(config).unwrap();
    manager.register::<Company>().unwrap();
    manager.register::<Person>().unwrap();

    let mut top = Person::named("Top", 1);
    top.employer = Some(Company::named("Acme"));
    let mut middle = Person::named("Middle", 2);
    middle.mentor = Some(Box::new(Person::named("Bottom", 3)));
    top.mentor = Some(Box::new(middle));

    assert!(manager.save(&mut top).is_err());
    assert_eq!(manager.count_for_table(Company::TABLE).unwrap(), 0);
    assert_eq!(manager.count_for_table(Person::TABLE).unwrap(), 0);
    assert_eq!(manager.count_for_table("Person_employer").unwrap(), 0);
    let employer = top.employer.as_ref().unwrap();
    assert_eq!(employer.meta.id, 0);
    assert!(employer.meta.created_time.is_none());
}

#[test]
fn test_parent_failure_rolls_back_saved_members() {
    let manager = manager();
    manager
        .execute_sql("CREATE UNIQUE INDEX Project_unique_title ON Project (title)")
        .unwrap();
    let mut first = Project {
        title: "Launch".to_string(),
        members: vec![Person::named("Zed", 20)],
        ..Default::default()
    };
    manager.save(&mut first).unwrap();

    let mut clash = Project {
        title: "Launch".to_string(),
        members: vec![Person::named("Amy", 30), Person::named("Kim", 25)],
        ..Default::default()
    };
    assert!(manager.save(&mut clash).is_err());

    assert_eq!(manager.count_for_table(Project::TABLE).unwrap(), 1);
    assert_eq!(manager.count_for_table(Person::TABLE).unwrap(), 1);
    assert_eq!(manager.count_for_table("Project_members").unwrap(), 1);
    assert_eq!(clash.meta.id, 0);
    assert!(clash.members.iter().all(|m| m.meta.id == 0 && m.meta.modified_time.is_none()));

    // the restored instances save cleanly once the clash is resolved
    clash.title = "Relaunch".to_string();
    manager.save(&mut clash).unwrap();
    assert_eq!(manager.count_for_table(Person::TABLE).unwrap(), 3);
}
