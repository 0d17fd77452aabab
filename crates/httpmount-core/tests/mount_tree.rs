//! Integration tests: mount tree attach, lookup and the read dispatcher.

mod common;

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::range_server::{self, RangeServerOptions};
use httpmount_core::fs::{ReadDispatcher, FILE_INO, ROOT_INO};
use httpmount_core::{MountError, MountTree, NodeKind, ReadError, RemoteFileOptions};

fn attached(url: &str, name: Option<&str>) -> MountTree {
    let mut tree = MountTree::new(url, name.map(str::to_string), RemoteFileOptions::default());
    tree.attach().expect("attach");
    tree
}

#[test]
fn attach_exposes_one_file_named_after_the_url() {
    let server = range_server::start(range_server::body(12_345));
    let tree = attached(&server.url, None);

    let node = tree.lookup(ROOT_INO, "file.iso").expect("child");
    assert_eq!(node.ino, FILE_INO);
    assert_eq!(node.file.size(), 12_345);
    assert!(tree.lookup(ROOT_INO, "other.iso").is_none());
    assert!(tree.lookup(FILE_INO, "file.iso").is_none());

    let attrs = tree.attributes(FILE_INO).unwrap();
    assert_eq!(attrs.size_bytes, 12_345);
    assert_eq!(tree.attributes(ROOT_INO).unwrap().kind, NodeKind::Directory);
    assert!(tree.attributes(99).is_none());

    let names: Vec<_> = tree
        .entries(ROOT_INO)
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, [".", "..", "file.iso"]);
    assert!(tree.entries(FILE_INO).is_none());
}

#[test]
fn name_override_wins() {
    let server = range_server::start(range_server::body(100));
    let tree = attached(&server.url, Some("test.iso"));
    assert!(tree.lookup(ROOT_INO, "test.iso").is_some());
    assert!(tree.lookup(ROOT_INO, "file.iso").is_none());
}

#[test]
fn second_attach_is_rejected() {
    let server = range_server::start(range_server::body(100));
    let mut tree = attached(&server.url, None);
    assert!(matches!(tree.attach(), Err(MountError::AlreadyAttached)));
    assert!(tree.is_attached());
}

#[test]
fn failed_probe_leaves_no_child() {
    let opts = RangeServerOptions {
        accept_ranges: None,
        ..Default::default()
    };
    let server = range_server::start_with_options(range_server::body(100), opts);
    let mut tree = MountTree::new(server.url.clone(), None, RemoteFileOptions::default());

    let err = tree.attach().unwrap_err();
    assert!(matches!(err, MountError::Probe(_)), "{:?}", err);
    assert!(!tree.is_attached());
    assert!(tree.lookup(ROOT_INO, "file.iso").is_none());
    assert_eq!(tree.entries(ROOT_INO).unwrap().len(), 2);
}

#[test]
fn dispatcher_serves_concurrent_reads() {
    let body = range_server::body(500_000);
    let server = range_server::start(body.clone());
    let tree = attached(&server.url, None);
    let file = Arc::clone(&tree.child().unwrap().file);
    let mut dispatcher = ReadDispatcher::new(file, 4);

    let (tx, rx) = mpsc::channel();
    for i in 0..10u64 {
        let tx = tx.clone();
        let offset = i * 50_000;
        dispatcher.dispatch(i, offset, 50_000, move |result| {
            tx.send((offset, result)).unwrap();
        });
    }
    drop(tx);

    let mut done = 0;
    for (offset, result) in rx.iter() {
        let data = result.unwrap();
        assert_eq!(data, &body[offset as usize..offset as usize + 50_000]);
        done += 1;
    }
    assert_eq!(done, 10);
    assert_eq!(dispatcher.in_flight(), 0);
    dispatcher.shutdown();
}

#[test]
fn shutdown_cancels_slow_reads() {
    let opts = RangeServerOptions {
        range_delay: Duration::from_secs(5),
        ..Default::default()
    };
    let server = range_server::start_with_options(range_server::body(10_000), opts);
    let tree = attached(&server.url, None);
    let file = Arc::clone(&tree.child().unwrap().file);
    let mut dispatcher = ReadDispatcher::new(file, 1);

    let (tx, rx) = mpsc::channel();
    for id in 0..3u64 {
        let tx = tx.clone();
        dispatcher.dispatch(id, 0, 100, move |result| {
            tx.send(result).unwrap();
        });
    }
    std::thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    dispatcher.shutdown();
    assert!(started.elapsed() < Duration::from_secs(4));

    let results: Vec<_> = rx.try_iter().collect();
    assert_eq!(results.len(), 3);
    for result in results {
        assert!(matches!(result, Err(ReadError::Cancelled)), "{:?}", result);
    }
}

#[test]
fn dispatch_after_shutdown_is_cancelled() {
    let server = range_server::start(range_server::body(100));
    let tree = attached(&server.url, None);
    let mut dispatcher = ReadDispatcher::new(Arc::clone(&tree.child().unwrap().file), 2);
    dispatcher.shutdown();

    let (tx, rx) = mpsc::channel();
    dispatcher.dispatch(1, 0, 10, move |result| tx.send(result).unwrap());
    let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(result.unwrap_err().errno(), libc::EINTR);
}
