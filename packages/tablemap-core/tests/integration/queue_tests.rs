//! Operations submitted to the manager's serial queue.

use std::sync::mpsc;

use ntest::timeout;
use tablemap_core::QueryOptions;

use super::helpers::{manager, widget, Widget};

#[test]
#[timeout(5000)]
fn test_queued_save_then_fetch_in_order() {
    let manager = manager();
    let (saved_tx, saved_rx) = mpsc::channel();
    let (fetched_tx, fetched_rx) = mpsc::channel();

    manager
        .save_queued(widget("queued", &["q"]), move |result| {
            saved_tx.send(result).unwrap();
        })
        .unwrap();
    manager
        .fetch_queued::<Widget, _>(QueryOptions::new(), false, move |result| {
            fetched_tx.send(result).unwrap();
        })
        .unwrap();

    let saved = saved_rx.recv().unwrap().unwrap();
    assert!(saved.meta.id > 0);
    let fetched = fetched_rx.recv().unwrap().unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].tags, vec!["q"]);
    assert_eq!(fetched[0].meta.id, saved.meta.id);
}

#[test]
#[timeout(5000)]
fn test_queued_reads_and_deletes() {
    let manager = manager();
    let mut widgets = vec![widget("a", &[]), widget("b", &[]), widget("c", &[])];
    manager.save_all(&mut widgets).unwrap();
    let target = widgets[1].meta.id;

    let (tx, rx) = mpsc::channel();
    let by_id = tx.clone();
    manager
        .fetch_by_id_queued::<Widget, _>(target, move |result| {
            by_id.send(result.unwrap().map(|w| w.name)).unwrap();
        })
        .unwrap();
    assert_eq!(rx.recv().unwrap(), Some("b".to_string()));

    let (done_tx, done_rx) = mpsc::channel();
    manager
        .delete_many_queued(widgets[..2].to_vec(), move |result| {
            done_tx.send(result.is_ok()).unwrap();
        })
        .unwrap();
    assert!(done_rx.recv().unwrap());

    let (ids_tx, ids_rx) = mpsc::channel();
    manager
        .all_ids_queued::<Widget, _>(move |result| ids_tx.send(result.unwrap()).unwrap())
        .unwrap();
    assert_eq!(ids_rx.recv().unwrap(), vec![widgets[2].meta.id]);

    let (all_tx, all_rx) = mpsc::channel();
    manager
        .all_instances_queued::<Widget, _>(move |result| all_tx.send(result.unwrap()).unwrap())
        .unwrap();
    assert_eq!(all_rx.recv().unwrap()[0].name, "c");
}

#[test]
#[timeout(5000)]
fn test_queued_batch_save_and_flush() {
    let manager = manager();
    let (tx, rx) = mpsc::channel();
    manager
        .save_all_queued(vec![widget("x", &["1"]), widget("y", &["2"])], move |result| {
            tx.send(result.unwrap()).unwrap();
        })
        .unwrap();
    manager.flush_queue().unwrap();

    let saved = rx.try_recv().unwrap();
    assert!(saved.iter().all(|w| w.meta.id > 0));
    assert_eq!(manager.all_instances::<Widget>().unwrap().len(), 2);
}
