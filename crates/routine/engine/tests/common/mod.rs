//! Shared helpers for the scheduler integration tests

#![allow(dead_code)]

use routine_engine::{from_fn, Resumable, Waitable};
use std::cell::RefCell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// Frame that logs `name:n` on its n-th resume and yields the n-th entry of
/// `waits`, completing on the resume after the last one.
pub fn scripted(log: &Log, name: &'static str, waits: Vec<Waitable>) -> impl Resumable {
    let log = Rc::clone(log);
    let mut waits = waits.into_iter();
    let mut resumes = 0;
    from_fn(move || {
        resumes += 1;
        log.borrow_mut().push(format!("{}:{}", name, resumes));
        Ok(waits.next())
    })
}

/// Frame that yields a tick forever, logging `name` each time it runs
pub fn ticker(log: &Log, name: &'static str) -> impl Resumable {
    let log = Rc::clone(log);
    from_fn(move || {
        log.borrow_mut().push(name.to_string());
        Ok(Some(Waitable::Tick))
    })
}
